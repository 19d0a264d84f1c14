//! roomalloc-state — store gateway and embedded state store for RoomAlloc.
//!
//! The allocation engine talks to persistence only through the
//! [`AllocationStore`] trait. [`StateStore`] implements it on top of
//! [redb](https://docs.rs/redb), either on disk or fully in memory.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Entity keys are zero-padded decimal ids so that key order matches id
//! order. Allocation records use the composite key `{round}:{subject}`,
//! which lets every record of a round be found by prefix scan. Round
//! phases live in their own table so reseeding a round keeps its phase.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod gateway;
pub mod phase;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use gateway::AllocationStore;
pub use phase::RoundPhase;
pub use store::StateStore;
pub use types::*;
