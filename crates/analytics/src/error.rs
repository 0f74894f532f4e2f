use thiserror::Error;

/// Failure to read from the backing store (unreachable, query error, poisoned state).
///
/// Recovered by callers: the broadcaster skips the tick, the HTTP layer answers 503.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataAccessError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl DataAccessError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}
