//! RoomAlloc eligibility matcher — which rooms can take which subjects.
//!
//! This crate makes pure placement decisions. It never writes to the
//! store (that's `roomalloc-scheduler`). Instead, it evaluates rooms
//! against a subject's needs and picks the tightest fit.
//!
//! # Components
//!
//! - **`eligibility`** — Per-room fit checks (capacity, equipment, hours)
//! - **`placer`** — Tightest-fit choice and the per-pass budget ledger
//! - **`convert`** — Conversions from state store types

pub mod convert;
pub mod eligibility;
pub mod placer;

pub use convert::{remaining_capacity, room_usage, subject_needs, usage_for_round};
pub use eligibility::{Fit, RoomUsage, SubjectNeeds, eligible, eligible_rooms, equipment_near_misses, evaluate, missing_equipment};
pub use placer::{BudgetLedger, Placement, choose_room};
