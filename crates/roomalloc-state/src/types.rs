//! Domain types for the RoomAlloc state store.
//!
//! These types represent rounds, programs, equipment, subjects, rooms and
//! the per-round allocation records. All types are serializable to/from
//! JSON for storage in redb tables.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use roomalloc_core::{EquipmentId, Hours, ProgramId, RoomId, RoundId, SubjectId};

// ── Round ─────────────────────────────────────────────────────────

/// One scheduling campaign. Reset clears its records, never its identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationRound {
    pub id: RoundId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unix timestamp (seconds) when this round was created.
    #[serde(default)]
    pub created_at: u64,
}

// ── Program ───────────────────────────────────────────────────────

/// A named curriculum grouping that subjects belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
}

// ── Equipment ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
}

// ── Subject ───────────────────────────────────────────────────────

/// A course section that needs a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub program_id: ProgramId,
    /// Seats needed; a room must hold at least this many people.
    pub group_size: u32,
    /// Equipment every candidate room must provide.
    #[serde(default)]
    pub equipment: BTreeSet<EquipmentId>,
    /// Hours of the room's budget this subject consumes.
    pub hours: Hours,
    /// Lower numbers are scheduled first.
    pub priority: u32,
}

// ── Room ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Number of seats.
    pub capacity: u32,
    #[serde(default)]
    pub equipment: BTreeSet<EquipmentId>,
    /// Total hours the room can be booked in a single round.
    pub hour_budget: Hours,
}

// ── Allocation record ─────────────────────────────────────────────

/// Per-round scheduling result for one subject.
///
/// `is_allocated` and `cant_allocate` are never both set. An allocated
/// record always carries the room it was committed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationRecord {
    pub round_id: RoundId,
    pub subject_id: SubjectId,
    pub room_id: Option<RoomId>,
    pub is_allocated: bool,
    pub priority: u32,
    pub cant_allocate: bool,
    pub allocated_hours: Hours,
}

impl AllocationRecord {
    /// A subject committed to `room_id` for `hours`.
    pub fn allocated(round_id: RoundId, subject: &Subject, room_id: RoomId) -> Self {
        Self {
            round_id,
            subject_id: subject.id,
            room_id: Some(room_id),
            is_allocated: true,
            priority: subject.priority,
            cant_allocate: false,
            allocated_hours: subject.hours,
        }
    }

    /// A subject that was attempted and fit no room.
    pub fn unallocatable(round_id: RoundId, subject: &Subject) -> Self {
        Self {
            round_id,
            subject_id: subject.id,
            room_id: None,
            is_allocated: false,
            priority: subject.priority,
            cant_allocate: true,
            allocated_hours: 0,
        }
    }

    /// Whether the scheduler has reached a final decision for this subject.
    pub fn is_resolved(&self) -> bool {
        self.is_allocated || self.cant_allocate
    }

    /// Hours this record takes from `room_id`'s budget.
    pub fn hours_in(&self, room_id: RoomId) -> Hours {
        if self.is_allocated && self.room_id == Some(room_id) {
            self.allocated_hours
        } else {
            0
        }
    }

    /// Build the composite key for the records table.
    pub fn table_key(&self) -> String {
        crate::tables::record_key(self.round_id, self.subject_id)
    }
}

// ── Dataset ───────────────────────────────────────────────────────

/// Bulk import format for seeding a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Dataset {
    pub rounds: Vec<AllocationRound>,
    pub programs: Vec<Program>,
    pub equipment: Vec<Equipment>,
    pub rooms: Vec<Room>,
    pub subjects: Vec<Subject>,
}

impl Dataset {
    /// Parse a dataset from JSON.
    pub fn from_json(content: &str) -> crate::StateResult<Self> {
        serde_json::from_str(content).map_err(|e| crate::StateError::Dataset(e.to_string()))
    }

    /// Parse a dataset from TOML (`[[rooms]]`, `[[subjects]]`, ...).
    pub fn from_toml(content: &str) -> crate::StateResult<Self> {
        toml::from_str(content).map_err(|e| crate::StateError::Dataset(e.to_string()))
    }

    /// Reject entities or references carrying the zero id, which no public
    /// operation accepts.
    pub fn validate(&self) -> crate::StateResult<()> {
        use roomalloc_core::require_id;

        let invalid = |e: roomalloc_core::InvalidId| crate::StateError::Dataset(e.to_string());
        for round in &self.rounds {
            require_id("round", round.id).map_err(invalid)?;
        }
        for program in &self.programs {
            require_id("program", program.id).map_err(invalid)?;
        }
        for equipment in &self.equipment {
            require_id("equipment", equipment.id).map_err(invalid)?;
        }
        for room in &self.rooms {
            require_id("room", room.id).map_err(invalid)?;
            for &equipment_id in &room.equipment {
                require_id("equipment", equipment_id).map_err(invalid)?;
            }
        }
        for subject in &self.subjects {
            require_id("subject", subject.id).map_err(invalid)?;
            require_id("program", subject.program_id).map_err(invalid)?;
            for &equipment_id in &subject.equipment {
                require_id("equipment", equipment_id).map_err(invalid)?;
            }
        }
        Ok(())
    }

    /// Load a dataset file, picking the format from its extension.
    pub fn from_file(path: &std::path::Path) -> crate::StateResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::StateError::Dataset(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }
}
