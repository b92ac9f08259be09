//! `fintrack-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! money, identity, entities, the change-tracking child collection and the
//! aggregate root contract shared by the budgeting, debts and goals crates.

pub mod aggregate;
pub mod currency;
pub mod entity;
pub mod error;
pub mod id;
pub mod transaction;
pub mod value_object;
pub mod watch_list;

pub use aggregate::AggregateRoot;
pub use currency::{Currency, CurrencyValue};
pub use entity::{Entity, EntityMeta, Validate};
pub use error::{DomainError, DomainResult};
pub use id::{TransactionId, UserId};
pub use transaction::{Transaction, TransactionKind, TransactionProps, TransactionUpdate};
pub use value_object::ValueObject;
pub use watch_list::{ChangeState, PendingChanges, WatchList};
