//! Domain error model.

use thiserror::Error;

use crate::currency::{Currency, CurrencyValue};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, money rules). Storage failures belong to the repository layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. missing required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found, or is not visible to the caller.
    #[error("not found")]
    NotFound,

    /// A conflicting state was detected (e.g. duplicate child id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Arithmetic or comparison between two different currencies.
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// A monetary amount was zero or negative where a positive one is required.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A withdrawal asked for more than the available balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: CurrencyValue,
        available: CurrencyValue,
    },

    /// A debt payment lookup failed.
    #[error("payment not found: {0}")]
    PaymentNotFound(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Stable machine-readable code, suitable for transport-level mapping.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::InvariantViolation(_) => "invariant_violation",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::NotFound => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::CurrencyMismatch { .. } => "currency_mismatch",
            DomainError::InvalidAmount(_) => "invalid_amount",
            DomainError::InsufficientBalance { .. } => "insufficient_balance",
            DomainError::PaymentNotFound(_) => "payment_not_found",
        }
    }
}
