//! Row mappers, one per aggregate family.

pub mod budget;
pub mod debt;
pub mod goal;
pub mod transaction;

pub use budget::{BudgetFilter, BudgetMapper};
pub use debt::{DebtFilter, DebtMapper};
pub use goal::{GoalFilter, GoalMapper};

use fintrack_core::EntityMeta;

use crate::repository::{Row, RepositoryError, SqlValue};

fn with_meta<Id: core::fmt::Display>(row: Row, meta: &EntityMeta<Id>) -> Row {
    row.with("id", SqlValue::text(meta.id().to_string()))
        .with("created_at", SqlValue::timestamp(meta.created_at()))
        .with("updated_at", SqlValue::timestamp(meta.updated_at()))
}

fn read_meta<Id: From<uuid::Uuid>>(row: &Row) -> Result<EntityMeta<Id>, RepositoryError> {
    Ok(EntityMeta::restore(
        Id::from(row.uuid("id")?),
        row.timestamp("created_at")?,
        row.timestamp("updated_at")?,
    ))
}

fn parse_field<T>(row: &Row, column: &str) -> Result<T, RepositoryError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    let raw = row.text(column)?;
    raw.parse::<T>().map_err(|e| {
        RepositoryError::Mapping(format!("column '{column}' has invalid value '{raw}': {e}"))
    })
}
