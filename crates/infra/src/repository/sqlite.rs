//! SQLite-backed aggregate repository.
//!
//! Every write plan runs inside one sqlx transaction. If any statement fails
//! the transaction is dropped without commit, so SQLite rolls back and the
//! stored state is exactly what it was before the call.
//!
//! ## Error Mapping
//!
//! sqlx errors are returned unmodified as `RepositoryError::Storage`. Two
//! statements that silently match nothing are reported as
//! `RepositoryError::Constraint` instead, so both backends agree: an `UPDATE`
//! of a missing child row, and a link insert whose owner is not the root's.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row as _, Sqlite, SqliteConnection, SqlitePool};
use tracing::instrument;

use fintrack_core::AggregateRoot;

use super::RowCounts;
use super::mapper::{
    AggregateMapper, Criterion, DELETED_AT, LINK_CHILD_ID, LINK_ROOT_ID, LINK_USER_ID, TableSpec,
};
use super::plan::{WriteOp, WritePlan};
use super::row::{Column, ColumnKind, Row, SqlValue};
use super::r#trait::{
    AggregateId, AggregateRepository, FindOptions, RepoResult, RepositoryError, SortDirection,
};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Repository for one aggregate family over a shared `SqlitePool`.
///
/// The pool is injected; several repositories can share it (budgets and goals
/// share the `transactions` table).
#[derive(Debug, Clone)]
pub struct SqliteAggregateRepository<M> {
    pool: SqlitePool,
    mapper: M,
}

impl<M: AggregateMapper> SqliteAggregateRepository<M> {
    pub fn new(pool: SqlitePool, mapper: M) -> Self {
        Self { pool, mapper }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    fn spec(&self) -> &TableSpec {
        self.mapper.spec()
    }

    /// Run a plan in one transaction.
    pub async fn execute(&self, plan: WritePlan) -> RepoResult<()> {
        if plan.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for op in plan.into_ops() {
            apply_op(&mut *tx, op).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Stored row counts, soft-deleted roots included. The child count covers
    /// the whole child table, which may be shared with another family.
    pub async fn row_counts(&self) -> RepoResult<RowCounts> {
        let spec = self.spec();
        Ok(RowCounts {
            roots: count_rows(&self.pool, spec.root_table).await?,
            children: count_rows(&self.pool, spec.child_table).await?,
            links: count_rows(&self.pool, spec.link_table).await?,
        })
    }

    async fn child_rows(&self, root_id: &str) -> RepoResult<Vec<Row>> {
        let spec = self.spec();
        let select = spec
            .child_columns
            .iter()
            .map(|c| format!("c.{}", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {select} FROM {child} c JOIN {link} l ON l.{LINK_CHILD_ID} = c.id \
             WHERE l.{LINK_ROOT_ID} = ? ORDER BY l.rowid",
            child = spec.child_table,
            link = spec.link_table,
        );
        let rows = sqlx::query(&sql)
            .bind(root_id.to_owned())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| read_row(row, spec.child_columns))
            .collect()
    }

    async fn load_all(&self, roots: Vec<Row>) -> RepoResult<Vec<M::Aggregate>> {
        let mut aggregates = Vec::with_capacity(roots.len());
        for root in roots {
            let children = self.child_rows(root.id()?).await?;
            aggregates.push(self.mapper.load(&root, &children)?);
        }
        Ok(aggregates)
    }

    async fn matching(
        &self,
        criteria: &[Criterion],
        options: &FindOptions,
    ) -> RepoResult<Vec<M::Aggregate>> {
        let spec = self.spec();
        let (column, direction) = match &options.sort {
            Some(sort) => {
                spec.ensure_sortable(&sort.column)?;
                (sort.column.as_str(), sort.direction)
            }
            None => ("created_at", SortDirection::Asc),
        };

        let mut sql = format!(
            "SELECT {} FROM {} WHERE {DELETED_AT} IS NULL",
            column_list(spec.root_columns),
            spec.root_table
        );
        for c in criteria {
            if c.value.is_null() {
                sql.push_str(&format!(" AND {} IS NULL", c.column));
            } else {
                sql.push_str(&format!(" AND {} = ?", c.column));
            }
        }
        sql.push_str(&format!(
            " ORDER BY {column} {}, id ASC LIMIT ? OFFSET ?",
            direction.as_sql()
        ));

        let mut query = sqlx::query(&sql);
        for c in criteria.iter().filter(|c| !c.value.is_null()) {
            query = bind_value(query, &c.value);
        }
        let limit = options.limit.map_or(-1, i64::from);
        let rows = query
            .bind(limit)
            .bind(i64::from(options.offset))
            .fetch_all(&self.pool)
            .await?;

        let roots = rows
            .iter()
            .map(|row| read_row(row, spec.root_columns))
            .collect::<RepoResult<Vec<_>>>()?;
        self.load_all(roots).await
    }
}

#[async_trait]
impl<M: AggregateMapper> AggregateRepository for SqliteAggregateRepository<M> {
    type Aggregate = M::Aggregate;
    type Filter = M::Filter;

    #[instrument(skip(self, id), fields(table = self.spec().root_table, id = %id), err)]
    async fn find_by_id(
        &self,
        id: &AggregateId<Self::Aggregate>,
    ) -> RepoResult<Option<Self::Aggregate>> {
        let spec = self.spec();
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ? AND {DELETED_AT} IS NULL",
            column_list(spec.root_columns),
            spec.root_table
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let root = read_row(&row, spec.root_columns)?;
                Ok(self.load_all(vec![root]).await?.pop())
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), fields(table = self.spec().root_table), err)]
    async fn find_one(&self, filter: &Self::Filter) -> RepoResult<Option<Self::Aggregate>> {
        let criteria = self.mapper.checked_criteria(filter)?;
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        Ok(self.matching(&criteria, &options).await?.pop())
    }

    #[instrument(skip(self, filter), fields(table = self.spec().root_table), err)]
    async fn find_many(
        &self,
        filter: &Self::Filter,
        options: &FindOptions,
    ) -> RepoResult<Vec<Self::Aggregate>> {
        let criteria = self.mapper.checked_criteria(filter)?;
        self.matching(&criteria, options).await
    }

    #[instrument(skip(self, aggregate), fields(table = self.spec().root_table, id = %aggregate.id()), err)]
    async fn save(&self, aggregate: &Self::Aggregate) -> RepoResult<()> {
        let plan = WritePlan::for_save(&self.mapper, aggregate)?;
        tracing::debug!(ops = plan.len(), "executing write plan");
        self.execute(plan).await
    }

    #[instrument(skip(self, aggregate), fields(table = self.spec().root_table, id = %aggregate.id()), err)]
    async fn delete(&self, aggregate: &Self::Aggregate) -> RepoResult<()> {
        self.execute(WritePlan::for_delete(self.spec(), aggregate.id().to_string()))
            .await
    }

    #[instrument(skip(self, aggregate), fields(table = self.spec().root_table, id = %aggregate.id()), err)]
    async fn soft_delete(&self, aggregate: &Self::Aggregate) -> RepoResult<()> {
        self.execute(WritePlan::for_soft_delete(
            self.spec(),
            aggregate.id().to_string(),
            Utc::now(),
        ))
        .await
    }
}

async fn apply_op(conn: &mut SqliteConnection, op: WriteOp) -> RepoResult<()> {
    match op {
        WriteOp::UpsertRoot { table, row } => {
            let assignments = row
                .columns()
                .filter(|c| *c != "id")
                .map(|c| format!("{c} = excluded.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "{} ON CONFLICT(id) DO UPDATE SET {assignments}",
                insert_sql(table, &row)
            );
            bind_row(sqlx::query(&sql), &row).execute(&mut *conn).await?;
        }
        WriteOp::InsertChild { table, row } => {
            let sql = insert_sql(table, &row);
            bind_row(sqlx::query(&sql), &row).execute(&mut *conn).await?;
        }
        WriteOp::InsertLink {
            table,
            root_table,
            root_id,
            child_id,
            user_id,
        } => {
            // Owner comes from the root row; a mismatch inserts nothing.
            let sql = format!(
                "INSERT INTO {table} ({LINK_ROOT_ID}, {LINK_CHILD_ID}, {LINK_USER_ID}) \
                 SELECT id, ?, {LINK_USER_ID} FROM {root_table} WHERE id = ? AND {LINK_USER_ID} = ?"
            );
            let result = sqlx::query(&sql)
                .bind(child_id)
                .bind(root_id.clone())
                .bind(user_id.clone())
                .execute(&mut *conn)
                .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::Constraint(format!(
                    "{table} owner {user_id} does not own root {root_id}"
                )));
            }
        }
        WriteOp::UpdateChild { table, row } => {
            let id = row.id()?.to_owned();
            let assignments = row
                .columns()
                .filter(|c| *c != "id")
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("UPDATE {table} SET {assignments} WHERE id = ?");
            let mut query = sqlx::query(&sql);
            for (column, value) in row.iter() {
                if column != "id" {
                    query = bind_value(query, value);
                }
            }
            let result = query.bind(id.clone()).execute(&mut *conn).await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::Constraint(format!(
                    "no row {id} to update in {table}"
                )));
            }
        }
        WriteOp::DeleteLink {
            table,
            root_id,
            child_id,
        } => {
            let sql = format!(
                "DELETE FROM {table} WHERE {LINK_ROOT_ID} = ? AND {LINK_CHILD_ID} = ?"
            );
            sqlx::query(&sql)
                .bind(root_id)
                .bind(child_id)
                .execute(&mut *conn)
                .await?;
        }
        WriteOp::DeleteChild { table, id } => {
            let sql = format!("DELETE FROM {table} WHERE id = ?");
            sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
        }
        WriteOp::DeleteLinkedChildren {
            link_table,
            child_table,
            root_id,
        } => {
            let select =
                format!("SELECT {LINK_CHILD_ID} FROM {link_table} WHERE {LINK_ROOT_ID} = ?");
            let child_ids: Vec<String> = sqlx::query_scalar(&select)
                .bind(root_id.clone())
                .fetch_all(&mut *conn)
                .await?;

            let unlink = format!("DELETE FROM {link_table} WHERE {LINK_ROOT_ID} = ?");
            sqlx::query(&unlink)
                .bind(root_id)
                .execute(&mut *conn)
                .await?;

            let delete_child = format!("DELETE FROM {child_table} WHERE id = ?");
            for child_id in child_ids {
                sqlx::query(&delete_child)
                    .bind(child_id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        WriteOp::DeleteRoot { table, id } => {
            let sql = format!("DELETE FROM {table} WHERE id = ?");
            sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
        }
        WriteOp::SoftDeleteRoot {
            table,
            id,
            deleted_at,
        } => {
            let sql =
                format!("UPDATE {table} SET {DELETED_AT} = ? WHERE id = ? AND {DELETED_AT} IS NULL");
            sqlx::query(&sql)
                .bind(deleted_at)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

fn column_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_sql(table: &str, row: &Row) -> String {
    let columns = row.columns().collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; row.len()].join(", ");
    format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Bool(b) => query.bind(*b),
    }
}

fn bind_row<'q>(query: SqliteQuery<'q>, row: &Row) -> SqliteQuery<'q> {
    row.values().fold(query, bind_value)
}

fn read_row(row: &SqliteRow, columns: &[Column]) -> RepoResult<Row> {
    let mut out = Row::new();
    for column in columns {
        let value = match column.kind {
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(column.name)?
                .map_or(SqlValue::Null, SqlValue::Text),
            ColumnKind::Integer => row
                .try_get::<Option<i64>, _>(column.name)?
                .map_or(SqlValue::Null, SqlValue::Integer),
            ColumnKind::Bool => row
                .try_get::<Option<bool>, _>(column.name)?
                .map_or(SqlValue::Null, SqlValue::Bool),
        };
        out.set(column.name, value);
    }
    Ok(out)
}

async fn count_rows(pool: &SqlitePool, table: &str) -> RepoResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fintrack_budgeting::{BudgetAggregate, BudgetProps, NewSpending};
    use fintrack_core::{Currency, CurrencyValue, Entity, UserId};
    use rust_decimal_macros::dec;

    use crate::config::StorageConfig;
    use crate::mappers::BudgetMapper;

    async fn repo() -> SqliteAggregateRepository<BudgetMapper> {
        let pool = StorageConfig::default().connect().await.unwrap();
        SqliteAggregateRepository::new(pool, BudgetMapper)
    }

    fn budget(user_id: UserId) -> BudgetAggregate {
        BudgetAggregate::new_budget(BudgetProps {
            user_id,
            name: "Rent".to_string(),
            amount: CurrencyValue::new(dec!(1200), Currency::Usd),
            category: None,
            start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            end_date: None,
        })
    }

    #[tokio::test]
    async fn link_owner_must_match_root_owner() {
        let repo = repo().await;
        let aggregate = budget(UserId::new());
        repo.save(&aggregate).await.unwrap();

        let mut scratch = budget(UserId::new());
        scratch
            .record_spending(NewSpending {
                amount: CurrencyValue::new(dec!(2), Currency::Usd),
                name: "Fee".to_string(),
                description: None,
                category: None,
                occurred_at: Utc::now(),
                recurring: false,
            })
            .unwrap();
        let tx = scratch.spendings().items().next().unwrap();

        let plan: WritePlan = [
            WriteOp::InsertChild {
                table: "transactions",
                row: repo.mapper().child_to_row(tx),
            },
            WriteOp::InsertLink {
                table: "budget_transactions",
                root_table: "budgets",
                root_id: aggregate.id().to_string(),
                child_id: tx.id().to_string(),
                user_id: UserId::new().to_string(),
            },
        ]
        .into_iter()
        .collect();

        let err = repo.execute(plan).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
        assert!(err.to_string().contains("does not own"));
        let counts = repo.row_counts().await.unwrap();
        assert_eq!((counts.roots, counts.children, counts.links), (1, 0, 0));
    }
}
