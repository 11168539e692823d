use thiserror::Error;
use tsl_store::StoreError;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient coins: need {required}, have {available}")]
    InsufficientCoins { required: u64, available: u64 },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ResolutionError {
    /// Whether the failed operation may succeed if run again unchanged.
    ///
    /// Only storage backend failures qualify. Domain errors describe the
    /// request itself and fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }
}
