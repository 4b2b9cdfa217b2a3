//! Errors raised while building domain values from untrusted input.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejection of a raw value (form field, database column, path segment).
///
/// Business-rule failures such as an overdraft are not domain errors; they
/// live with the operation that enforces them (`cardbank-ledger`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed amount, card number or enum tag.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A string that should have been an identifier was not.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
