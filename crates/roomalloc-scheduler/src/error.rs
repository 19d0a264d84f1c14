//! Scheduler error types.

use thiserror::Error;

use roomalloc_state::RoundId;

/// Errors that end a scheduling pass early.
///
/// A subject that fits no room is not an error; it is recorded as
/// `cant_allocate` and the pass moves on.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("allocation round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("state store error: {0}")]
    State(#[from] roomalloc_state::StateError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
