//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Business-rule failures (insufficient funds, non-positive amounts,
/// self-transfer) are NOT errors: ledger operations report them as `false`.
/// This enum covers the remaining outcomes a caller has to classify.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced account does not exist.
    #[error("not found")]
    NotFound,

    /// The operation is deliberately not supported by this store.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The account id space is used up.
    #[error("account capacity exhausted")]
    CapacityExhausted,
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
