//! Shared identifier types used across RoomAlloc crates.

use thiserror::Error;

/// Identifier of an allocation round (the external round number).
pub type RoundId = u64;

/// Identifier of a subject (course section).
pub type SubjectId = u64;

/// Identifier of a room (space).
pub type RoomId = u64;

/// Identifier of a program (curriculum grouping).
pub type ProgramId = u64;

/// Identifier of a piece of equipment.
pub type EquipmentId = u64;

/// Whole hours. Used for subject requirements and room budgets alike.
pub type Hours = u32;

/// An identifier supplied by a caller was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} identifier: {value}")]
pub struct InvalidId {
    pub kind: &'static str,
    pub value: u64,
}

/// Reject the zero identifier, which no stored entity ever carries.
pub fn require_id(kind: &'static str, value: u64) -> Result<u64, InvalidId> {
    if value == 0 {
        return Err(InvalidId { kind, value });
    }
    Ok(value)
}
