//! Conversions from `roomalloc-state` types to placement types.
//!
//! Bridges the state store's `Subject`/`Room`/`AllocationRecord` to the
//! matcher's `SubjectNeeds`/`RoomUsage`.

use roomalloc_state::{AllocationRecord, Hours, Room, Subject};

use crate::eligibility::{RoomUsage, SubjectNeeds};

/// Convert a `Subject` into the `SubjectNeeds` the matcher expects.
pub fn subject_needs(subject: &Subject) -> SubjectNeeds {
    SubjectNeeds {
        subject_id: subject.id,
        group_size: subject.group_size,
        equipment: subject.equipment.clone(),
        hours: subject.hours,
        priority: subject.priority,
    }
}

/// Build a room's usage from the allocation records of one round.
///
/// Records of other rooms (and unallocated records) contribute nothing.
pub fn room_usage(room: &Room, records: &[AllocationRecord]) -> RoomUsage {
    let allocated_hours = records
        .iter()
        .map(|r| r.hours_in(room.id))
        .fold(0, Hours::saturating_add);

    RoomUsage {
        room_id: room.id,
        capacity: room.capacity,
        equipment: room.equipment.clone(),
        hour_budget: room.hour_budget,
        allocated_hours,
    }
}

/// Usage of every room in a round.
pub fn usage_for_round(rooms: &[Room], records: &[AllocationRecord]) -> Vec<RoomUsage> {
    rooms.iter().map(|room| room_usage(room, records)).collect()
}

/// Hours still bookable in `room` given a round's records.
pub fn remaining_capacity(room: &Room, records: &[AllocationRecord]) -> Hours {
    room_usage(room, records).remaining_hours()
}
