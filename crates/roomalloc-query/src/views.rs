//! Plain serializable records returned by the query service.

use roomalloc_state::{EquipmentId, Hours, ProgramId, RoomId, SubjectId};
use serde::{Deserialize, Serialize};

// ── Rooms ───────────────────────────────────────────────────────

/// A room's budget use in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAllocation {
    pub room_id: RoomId,
    pub name: String,
    pub capacity: u32,
    pub hour_budget: Hours,
    pub allocated_hours: Hours,
    pub remaining_hours: Hours,
    pub subject_count: usize,
}

/// Hours booked in one room, from some caller-defined point of view
/// (a program, or a single subject).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomHours {
    pub room_id: RoomId,
    pub name: String,
    pub allocated_hours: Hours,
}

/// A room the subject could be placed in right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleRoom {
    pub room_id: RoomId,
    pub name: String,
    pub capacity: u32,
    pub remaining_hours: Hours,
    /// Budget the room would keep after taking the subject.
    pub leftover_hours: Hours,
}

// ── Programs ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramAllocation {
    pub program_id: ProgramId,
    pub name: String,
    pub rooms: Vec<RoomHours>,
    pub subjects: Vec<ProgramSubject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSubject {
    pub subject_id: SubjectId,
    pub name: String,
    pub hours: Hours,
    pub room_id: Option<RoomId>,
    pub is_allocated: bool,
    pub cant_allocate: bool,
}

// ── Subjects ────────────────────────────────────────────────────

/// A subject placed in a given room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedSubject {
    pub subject_id: SubjectId,
    pub name: String,
    pub program_id: ProgramId,
    pub group_size: u32,
    pub priority: u32,
    pub allocated_hours: Hours,
}

/// Why a subject has no room in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnallocatedReason {
    /// Scheduled, but no room was eligible.
    CantAllocate,
    /// Not reached by any pass yet.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnallocatedSubject {
    pub subject_id: SubjectId,
    pub name: String,
    pub program_id: ProgramId,
    pub group_size: u32,
    pub hours: Hours,
    pub priority: u32,
    pub reason: UnallocatedReason,
}

// ── Equipment ───────────────────────────────────────────────────

/// An equipment id with its name, when the store knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRef {
    pub equipment_id: EquipmentId,
    pub name: Option<String>,
}

/// Equipment a subject needs that a room lacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEquipmentReport {
    pub subject_id: SubjectId,
    pub room_id: RoomId,
    pub missing: Vec<EquipmentRef>,
}

impl MissingEquipmentReport {
    pub fn missing_ids(&self) -> Vec<EquipmentId> {
        self.missing.iter().map(|e| e.equipment_id).collect()
    }
}

/// A room that fits on capacity and hours but lacks equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearMiss {
    pub room_id: RoomId,
    pub name: String,
    pub remaining_hours: Hours,
    pub missing: Vec<EquipmentRef>,
}
