//! SQLite schema bootstrap.
//!
//! Money columns are TEXT (exact decimal strings), never REAL or NUMERIC, so
//! SQLite's type affinity cannot round them.

use sqlx::SqlitePool;

pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS budgets (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL,
        name        TEXT NOT NULL,
        amount      TEXT NOT NULL,
        currency    TEXT NOT NULL,
        category    TEXT NULL,
        start_date  TEXT NOT NULL,
        end_date    TEXT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        deleted_at  TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS debts (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL,
        lender      TEXT NOT NULL,
        purpose     TEXT NULL,
        amount      TEXT NOT NULL,
        currency    TEXT NOT NULL,
        rate        TEXT NOT NULL,
        due_date    TEXT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        deleted_at  TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS goals (
        id                TEXT PRIMARY KEY,
        user_id           TEXT NOT NULL,
        name              TEXT NOT NULL,
        description       TEXT NULL,
        target_amount     TEXT NULL,
        target_currency   TEXT NULL,
        current_amount    TEXT NULL,
        current_currency  TEXT NULL,
        deadline          TEXT NULL,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL,
        deleted_at        TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id           TEXT PRIMARY KEY,
        user_id      TEXT NOT NULL,
        name         TEXT NOT NULL,
        description  TEXT NULL,
        amount       TEXT NOT NULL,
        currency     TEXT NOT NULL,
        kind         TEXT NOT NULL,
        category     TEXT NULL,
        occurred_at  TEXT NOT NULL,
        recurring    INTEGER NOT NULL,
        created_at   TEXT NOT NULL,
        updated_at   TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS debt_payments (
        id           TEXT PRIMARY KEY,
        user_id      TEXT NOT NULL,
        name         TEXT NOT NULL,
        description  TEXT NULL,
        amount       TEXT NOT NULL,
        currency     TEXT NOT NULL,
        paid_at      TEXT NOT NULL,
        created_at   TEXT NOT NULL,
        updated_at   TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS budget_transactions (
        root_id   TEXT NOT NULL REFERENCES budgets(id),
        child_id  TEXT NOT NULL REFERENCES transactions(id),
        user_id   TEXT NOT NULL,
        PRIMARY KEY (root_id, child_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS goal_transactions (
        root_id   TEXT NOT NULL REFERENCES goals(id),
        child_id  TEXT NOT NULL REFERENCES transactions(id),
        user_id   TEXT NOT NULL,
        PRIMARY KEY (root_id, child_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS debt_debt_payments (
        root_id   TEXT NOT NULL REFERENCES debts(id),
        child_id  TEXT NOT NULL REFERENCES debt_payments(id),
        user_id   TEXT NOT NULL,
        PRIMARY KEY (root_id, child_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_budgets_user ON budgets (user_id, deleted_at)",
    "CREATE INDEX IF NOT EXISTS idx_debts_user ON debts (user_id, deleted_at)",
    "CREATE INDEX IF NOT EXISTS idx_goals_user ON goals (user_id, deleted_at)",
    "CREATE INDEX IF NOT EXISTS idx_budget_transactions_child ON budget_transactions (child_id)",
    "CREATE INDEX IF NOT EXISTS idx_goal_transactions_child ON goal_transactions (child_id)",
    "CREATE INDEX IF NOT EXISTS idx_debt_debt_payments_child ON debt_debt_payments (child_id)",
];

/// Create every table and index if missing. Idempotent.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(statements = STATEMENTS.len(), "schema ready");
    Ok(())
}
