use async_trait::async_trait;
use thiserror::Error;

use fintrack_core::{AggregateRoot, Entity};

/// Repository operation error.
///
/// These are **infrastructure errors**, as opposed to domain errors (validation,
/// invariants). Storage errors are carried unmodified so callers can inspect the
/// driver's error when they need to.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Primary-key or foreign-key violation detected by a backend without a database.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A stored row could not be turned back into a domain value.
    #[error("row mapping failed: {0}")]
    Mapping(String),

    /// Unknown sort or filter column, or otherwise malformed query options.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Pagination and ordering for `find_many`. Without a sort, results come back
/// oldest first (`created_at`, then `id`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: Option<u32>,
    pub offset: u32,
    pub sort: Option<Sort>,
}

impl FindOptions {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
            sort: None,
        }
    }

    pub fn sorted_by(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }
}

pub type AggregateId<A> = <<A as AggregateRoot>::Root as Entity>::Id;

/// Persistence boundary for one aggregate family.
///
/// Reads never return soft-deleted aggregates. `save` writes only the delta
/// recorded by the aggregate's child watch-list and is atomic: on error nothing
/// is persisted. It does not clear the watch-list; callers do that with
/// [`AggregateRoot::mark_persisted`] once `save` returns `Ok`.
#[async_trait]
pub trait AggregateRepository: Send + Sync {
    type Aggregate: AggregateRoot + Send + Sync;
    /// Root-field criteria used by `find_one` / `find_many`.
    type Filter: Send + Sync;

    async fn find_by_id(
        &self,
        id: &AggregateId<Self::Aggregate>,
    ) -> RepoResult<Option<Self::Aggregate>>;

    async fn find_one(&self, filter: &Self::Filter) -> RepoResult<Option<Self::Aggregate>>;

    async fn find_many(
        &self,
        filter: &Self::Filter,
        options: &FindOptions,
    ) -> RepoResult<Vec<Self::Aggregate>>;

    async fn save(&self, aggregate: &Self::Aggregate) -> RepoResult<()>;

    /// Remove the root row, its link rows and every linked child row.
    async fn delete(&self, aggregate: &Self::Aggregate) -> RepoResult<()>;

    /// Stamp `deleted_at` on the root; reads stop returning it.
    async fn soft_delete(&self, aggregate: &Self::Aggregate) -> RepoResult<()>;
}
