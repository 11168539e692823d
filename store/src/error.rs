use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether retrying the same transaction may succeed.
    ///
    /// Backend failures (map full, lock contention, I/O) are transient.
    /// Missing rows, uniqueness and constraint violations are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}
