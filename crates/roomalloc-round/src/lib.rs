//! roomalloc-round — lifecycle of allocation rounds.
//!
//! Each round moves through:
//!
//! ```text
//! Idle → Running → Completed | Aborted | Failed
//!   ↑                  │
//!   └──── reset ───────┘
//! ```
//!
//! The orchestrator owns the phase of every round it has seen and writes
//! each change through to the store. It runs each pass as its own tokio
//! task and forwards abort requests to the pass through a `watch` channel.

pub mod error;
pub mod orchestrator;

pub use error::{RoundError, RoundResult};
pub use orchestrator::{RoundOrchestrator, RoundStatus};
pub use roomalloc_state::RoundPhase;
