//! Use-case services: load an aggregate, check ownership, run one business
//! operation, validate and save.
//!
//! Ownership failures are reported as `NotFound`, so callers cannot probe for
//! ids belonging to other users.

pub mod budget;
pub mod debt;
pub mod goal;

pub use budget::BudgetService;
pub use debt::DebtService;
pub use goal::GoalService;

use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use fintrack_core::{AggregateRoot, DomainError, UserId, Validate};

use crate::repository::{AggregateId, AggregateRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type UseCaseResult<T> = Result<T, UseCaseError>;

impl UseCaseError {
    /// Stable machine-readable code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            UseCaseError::Domain(e) => e.code(),
            UseCaseError::Repository(RepositoryError::Storage(_)) => "storage_error",
            UseCaseError::Repository(RepositoryError::Constraint(_)) => "constraint_violation",
            UseCaseError::Repository(RepositoryError::Mapping(_)) => "mapping_error",
            UseCaseError::Repository(RepositoryError::InvalidQuery(_)) => "invalid_query",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UseCaseError::Domain(DomainError::NotFound))
    }

    /// `{"error": code, "message": text}`
    pub fn to_json(&self) -> JsonValue {
        json!({
            "error": self.code(),
            "message": self.to_string(),
        })
    }
}

async fn load_owned<R>(
    repo: &R,
    user_id: UserId,
    id: &AggregateId<R::Aggregate>,
) -> UseCaseResult<R::Aggregate>
where
    R: AggregateRepository,
{
    match repo.find_by_id(id).await? {
        Some(aggregate) if aggregate.is_owned_by(user_id) => Ok(aggregate),
        Some(_) => {
            tracing::debug!(%user_id, %id, "aggregate owned by another user");
            Err(DomainError::NotFound.into())
        }
        None => Err(DomainError::NotFound.into()),
    }
}

async fn persist<R>(repo: &R, mut aggregate: R::Aggregate) -> UseCaseResult<R::Aggregate>
where
    R: AggregateRepository,
{
    aggregate.validate()?;
    repo.save(&aggregate).await?;
    aggregate.mark_persisted();
    Ok(aggregate)
}
