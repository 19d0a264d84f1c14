//! Orchestrator error types.

use thiserror::Error;

use roomalloc_core::InvalidId;
use roomalloc_state::{RoundId, RoundPhase, StateError};

#[derive(Debug, Error)]
pub enum RoundError {
    /// The operation is not allowed in the round's current phase.
    #[error("cannot {operation} round {round_id} while it is {phase}")]
    InvalidState {
        round_id: RoundId,
        operation: &'static str,
        phase: RoundPhase,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] InvalidId),

    #[error("state store error: {0}")]
    Store(#[from] StateError),
}

pub type RoundResult<T> = Result<T, RoundError>;
