//! Aggregate persistence boundary.
//!
//! An aggregate is stored as a root row, child rows and link rows carrying
//! `(root_id, child_id, user_id)`. Saving writes only the delta recorded by the
//! aggregate's child watch-list, planned up front as a [`WritePlan`] and applied
//! atomically by a backend.

pub mod in_memory;
pub mod mapper;
pub mod plan;
pub mod row;
pub mod schema;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryAggregateRepository;
pub use mapper::{AggregateMapper, ChildOf, Criterion, RootOf, TableSpec};
pub use plan::{WriteKind, WriteOp, WritePlan};
pub use row::{Column, ColumnKind, Row, SqlValue};
pub use schema::create_schema;
pub use sqlite::SqliteAggregateRepository;
pub use r#trait::{
    AggregateId, AggregateRepository, FindOptions, RepoResult, RepositoryError, Sort,
    SortDirection,
};

/// Number of stored rows per table of one aggregate family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub roots: u64,
    pub children: u64,
    pub links: u64,
}
