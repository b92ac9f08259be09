//! Row mapping for the shared `transactions` table.

use fintrack_core::{Transaction, TransactionId, TransactionKind, TransactionProps, UserId};

use super::{parse_field, read_meta, with_meta};
use crate::repository::{Column, RepositoryError, Row, SqlValue};

pub const TRANSACTION_COLUMNS: &[Column] = &[
    Column::text("id"),
    Column::text("user_id"),
    Column::text("name"),
    Column::text("description"),
    Column::text("amount"),
    Column::text("currency"),
    Column::text("kind"),
    Column::text("category"),
    Column::text("occurred_at"),
    Column::boolean("recurring"),
    Column::text("created_at"),
    Column::text("updated_at"),
];

pub fn transaction_to_row(tx: &Transaction) -> Row {
    let props = tx.props();
    with_meta(Row::new(), tx.meta())
        .with("user_id", SqlValue::text(props.user_id.to_string()))
        .with("name", SqlValue::text(props.name.clone()))
        .with("description", SqlValue::opt_text(props.description.clone()))
        .with_money("amount", "currency", Some(&props.amount))
        .with("kind", SqlValue::text(props.kind.as_str()))
        .with("category", SqlValue::opt_text(props.category.clone()))
        .with("occurred_at", SqlValue::timestamp(props.occurred_at))
        .with("recurring", SqlValue::Bool(props.recurring))
}

pub fn transaction_from_row(row: &Row) -> Result<Transaction, RepositoryError> {
    let meta = read_meta::<TransactionId>(row)?;
    let props = TransactionProps {
        user_id: UserId::from_uuid(row.uuid("user_id")?),
        name: row.string("name")?,
        description: row.opt_string("description")?,
        amount: row.money("amount", "currency")?,
        kind: parse_field::<TransactionKind>(row, "kind")?,
        category: row.opt_string("category")?,
        occurred_at: row.timestamp("occurred_at")?,
        recurring: row.bool("recurring")?,
    };
    Ok(Transaction::restore(meta, props))
}
