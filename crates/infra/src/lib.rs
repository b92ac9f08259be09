//! Infrastructure layer: storage configuration, aggregate persistence and the
//! use-case services built on top of it.

pub mod config;
pub mod mappers;
pub mod repository;
pub mod use_cases;

pub use config::StorageConfig;
pub use repository::{
    AggregateRepository, FindOptions, InMemoryAggregateRepository, RepositoryError,
    SqliteAggregateRepository,
};
pub use use_cases::{BudgetService, DebtService, GoalService, UseCaseError, UseCaseResult};
