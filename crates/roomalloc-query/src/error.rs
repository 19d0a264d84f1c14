//! Query error types.

use thiserror::Error;

use roomalloc_core::InvalidId;
use roomalloc_state::StateError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] InvalidId),

    #[error("state store error: {0}")]
    Store(#[from] StateError),
}

pub type QueryResult<T> = Result<T, QueryError>;
