//! roomalloc-scheduler — priority-driven allocation passes.
//!
//! Runs one greedy pass over a round's unresolved subjects. The scheduler:
//!
//! - Orders subjects by priority number, then subject id
//! - Asks the matcher (`roomalloc-placement`) for the tightest-fit room
//! - Writes one allocation record per subject, allocated or `cant_allocate`
//! - Checks a cancellation signal between subjects, never inside one
//!
//! # Architecture
//!
//! ```text
//! Scheduler
//!   ├── AllocationStore (read subjects/rooms/records, write records)
//!   └── Per-pass BudgetLedger (room hours, debited after each commit)
//! ```

pub mod error;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{PassOutcome, PassReport, Scheduler, SubjectOutcome, pass_order};
