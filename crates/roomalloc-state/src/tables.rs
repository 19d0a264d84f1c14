//! redb table definitions for the RoomAlloc state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).
//! Entity keys are `{id:020}`; allocation records are `{round:020}:{subject:020}`.

use redb::TableDefinition;

/// Shape shared by every table in the store.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Allocation rounds keyed by round id.
pub const ROUNDS: JsonTable = TableDefinition::new("rounds");

/// Programs keyed by program id.
pub const PROGRAMS: JsonTable = TableDefinition::new("programs");

/// Equipment keyed by equipment id.
pub const EQUIPMENT: JsonTable = TableDefinition::new("equipment");

/// Subjects keyed by subject id.
pub const SUBJECTS: JsonTable = TableDefinition::new("subjects");

/// Rooms keyed by room id.
pub const ROOMS: JsonTable = TableDefinition::new("rooms");

/// Lifecycle phase of each round keyed by round id.
pub const ROUND_PHASES: JsonTable = TableDefinition::new("round_phases");

/// Allocation records keyed by `{round_id}:{subject_id}`.
pub const RECORDS: JsonTable = TableDefinition::new("records");

/// Fixed-width key for an entity id.
pub fn id_key(id: u64) -> String {
    format!("{id:020}")
}

/// Key prefix covering every record of a round.
pub fn round_prefix(round_id: u64) -> String {
    format!("{round_id:020}:")
}

/// Composite key of a single allocation record.
pub fn record_key(round_id: u64, subject_id: u64) -> String {
    format!("{round_id:020}:{subject_id:020}")
}
