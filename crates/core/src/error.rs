//! Rejections raised while checking shop input before it reaches a store.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Input that no store call could accept.
///
/// Missing rows and duplicate records are reported by the stores themselves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Out-of-range price, quantity, threshold or text length.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Path or query id that is not a positive integer.
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
