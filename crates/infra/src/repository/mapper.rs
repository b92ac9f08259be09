//! Composition-based mapping between aggregates and table rows.
//!
//! One [`AggregateMapper`] per aggregate family describes its tables and how
//! root and child entities become rows. The generic repositories in this module
//! tree do the rest, so no family needs its own repository type.

use fintrack_core::AggregateRoot;

use super::row::{Column, Row, SqlValue};
use super::r#trait::RepositoryError;

/// Columns shared by every link table.
pub const LINK_ROOT_ID: &str = "root_id";
pub const LINK_CHILD_ID: &str = "child_id";
pub const LINK_USER_ID: &str = "user_id";

/// Storage-only column stamped by soft delete.
pub const DELETED_AT: &str = "deleted_at";

/// Table layout of one aggregate family: root table, child table and the link
/// table joining them. Both entity tables key on `id`.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub root_table: &'static str,
    /// Columns written by upsert; `deleted_at` is not among them.
    pub root_columns: &'static [Column],
    /// Root columns `find_many` may sort by.
    pub sortable: &'static [&'static str],
    pub child_table: &'static str,
    pub child_columns: &'static [Column],
    pub link_table: &'static str,
}

impl TableSpec {
    pub fn is_sortable(&self, column: &str) -> bool {
        self.sortable.contains(&column)
    }

    pub fn ensure_sortable(&self, column: &str) -> Result<(), RepositoryError> {
        if self.is_sortable(column) {
            Ok(())
        } else {
            Err(RepositoryError::InvalidQuery(format!(
                "cannot sort {} by '{column}'",
                self.root_table
            )))
        }
    }

    pub fn ensure_root_column(&self, column: &str) -> Result<(), RepositoryError> {
        if self.root_columns.iter().any(|c| c.name == column) {
            Ok(())
        } else {
            Err(RepositoryError::InvalidQuery(format!(
                "unknown column '{column}' on {}",
                self.root_table
            )))
        }
    }
}

/// Equality match on one root column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub column: &'static str,
    pub value: SqlValue,
}

impl Criterion {
    pub fn equals(column: &'static str, value: SqlValue) -> Self {
        Self { column, value }
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(self.column).is_some_and(|v| *v == self.value)
    }
}

pub type RootOf<M> = <<M as AggregateMapper>::Aggregate as AggregateRoot>::Root;
pub type ChildOf<M> = <<M as AggregateMapper>::Aggregate as AggregateRoot>::Child;

pub trait AggregateMapper: Send + Sync + 'static {
    type Aggregate: AggregateRoot + Send + Sync;
    type Filter: Send + Sync;

    fn spec(&self) -> &TableSpec;

    fn root_to_row(&self, root: &RootOf<Self>) -> Row;

    fn root_from_row(&self, row: &Row) -> Result<RootOf<Self>, RepositoryError>;

    fn child_to_row(&self, child: &ChildOf<Self>) -> Row;

    fn child_from_row(&self, row: &Row) -> Result<ChildOf<Self>, RepositoryError>;

    /// Translate a family filter into column criteria (all must match).
    fn filter_criteria(&self, filter: &Self::Filter) -> Vec<Criterion>;

    fn assemble(&self, root: RootOf<Self>, children: Vec<ChildOf<Self>>) -> Self::Aggregate {
        <Self::Aggregate as AggregateRoot>::reconstitute(root, children)
    }

    /// Rebuild an aggregate from its root row and child rows (in link order).
    fn load(&self, root: &Row, children: &[Row]) -> Result<Self::Aggregate, RepositoryError> {
        let root = self.root_from_row(root)?;
        let children = children
            .iter()
            .map(|row| self.child_from_row(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.assemble(root, children))
    }

    /// Check criteria against the spec before they reach a backend.
    fn checked_criteria(&self, filter: &Self::Filter) -> Result<Vec<Criterion>, RepositoryError> {
        let criteria = self.filter_criteria(filter);
        for c in &criteria {
            self.spec().ensure_root_column(c.column)?;
        }
        Ok(criteria)
    }
}
