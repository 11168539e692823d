//! Errors raised while building or parsing the shared types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid resolution parameters: {0}")]
    InvalidParams(String),
}
