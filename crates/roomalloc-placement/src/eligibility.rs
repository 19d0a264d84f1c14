//! Room eligibility for placement decisions.
//!
//! A room is eligible for a subject when all three checks pass:
//! - **Capacity**: the room seats at least the subject's group size
//! - **Equipment**: the room provides every required item
//! - **Hours**: the room's remaining budget covers the subject's hours
//!
//! The equipment check is kept apart from the other two so that a room
//! short only on equipment can be reported as a near miss.

use std::collections::BTreeSet;

use roomalloc_state::{EquipmentId, Hours, RoomId, SubjectId};

/// Capacity, equipment and remaining budget of a single room in a round.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RoomUsage {
    pub room_id: RoomId,
    pub capacity: u32,
    pub equipment: BTreeSet<EquipmentId>,
    pub hour_budget: Hours,
    /// Hours already committed in this round.
    pub allocated_hours: Hours,
}

impl RoomUsage {
    pub fn remaining_hours(&self) -> Hours {
        self.hour_budget.saturating_sub(self.allocated_hours)
    }
}

/// What a subject asks of a room.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SubjectNeeds {
    pub subject_id: SubjectId,
    pub group_size: u32,
    pub equipment: BTreeSet<EquipmentId>,
    pub hours: Hours,
    /// Priority (lower = scheduled first). Not used for fit, carried for logging.
    pub priority: u32,
}

/// Result of evaluating one room against one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fit {
    pub room_id: RoomId,
    pub capacity_ok: bool,
    pub hours_ok: bool,
    /// Required equipment the room does not provide.
    pub missing_equipment: BTreeSet<EquipmentId>,
    /// Budget left in the room if the subject were placed there.
    pub leftover_hours: Option<Hours>,
}

impl Fit {
    pub fn is_eligible(&self) -> bool {
        self.capacity_ok && self.hours_ok && self.missing_equipment.is_empty()
    }

    /// Capacity and hours are fine; only equipment is short.
    pub fn is_equipment_near_miss(&self) -> bool {
        self.capacity_ok && self.hours_ok && !self.missing_equipment.is_empty()
    }
}

/// Equipment required but not provided (`required \ provided`).
pub fn missing_equipment(
    required: &BTreeSet<EquipmentId>,
    provided: &BTreeSet<EquipmentId>,
) -> BTreeSet<EquipmentId> {
    required.difference(provided).copied().collect()
}

/// Evaluate a single room for the given subject.
pub fn evaluate(needs: &SubjectNeeds, room: &RoomUsage) -> Fit {
    let remaining = room.remaining_hours();
    let hours_ok = remaining >= needs.hours;
    Fit {
        room_id: room.room_id,
        capacity_ok: room.capacity >= needs.group_size,
        hours_ok,
        missing_equipment: missing_equipment(&needs.equipment, &room.equipment),
        leftover_hours: hours_ok.then(|| remaining - needs.hours),
    }
}

/// Whether `room` can take `needs` right now.
pub fn eligible(needs: &SubjectNeeds, room: &RoomUsage) -> bool {
    evaluate(needs, room).is_eligible()
}

/// Evaluate all rooms and return the eligible ones, tightest fit first.
///
/// Order: least leftover hours after placement, then lowest room id.
pub fn eligible_rooms<'a, I>(needs: &SubjectNeeds, rooms: I) -> Vec<Fit>
where
    I: IntoIterator<Item = &'a RoomUsage>,
{
    let mut fits: Vec<Fit> = rooms
        .into_iter()
        .map(|room| evaluate(needs, room))
        .filter(Fit::is_eligible)
        .collect();

    fits.sort_by_key(|fit| (fit.leftover_hours.unwrap_or(Hours::MAX), fit.room_id));
    fits
}

/// Rooms that fail solely on equipment, ordered by room id.
pub fn equipment_near_misses<'a, I>(needs: &SubjectNeeds, rooms: I) -> Vec<Fit>
where
    I: IntoIterator<Item = &'a RoomUsage>,
{
    let mut misses: Vec<Fit> = rooms
        .into_iter()
        .map(|room| evaluate(needs, room))
        .filter(Fit::is_equipment_near_miss)
        .collect();
    misses.sort_by_key(|fit| fit.room_id);
    misses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_room(id: RoomId, capacity: u32, budget: Hours, used: Hours) -> RoomUsage {
        RoomUsage {
            room_id: id,
            capacity,
            equipment: BTreeSet::new(),
            hour_budget: budget,
            allocated_hours: used,
        }
    }

    fn default_needs(group_size: u32, hours: Hours) -> SubjectNeeds {
        SubjectNeeds {
            subject_id: 1,
            group_size,
            equipment: BTreeSet::new(),
            hours,
            priority: 10,
        }
    }

    #[test]
    fn rejects_insufficient_capacity() {
        let room = make_room(1, 20, 10, 0);
        let needs = default_needs(30, 2);

        let fit = evaluate(&needs, &room);
        assert!(!fit.capacity_ok);
        assert!(!fit.is_eligible());
        assert!(!fit.is_equipment_near_miss());
    }

    #[test]
    fn rejects_exhausted_budget() {
        let room = make_room(1, 20, 10, 9); // Only 1h left.
        let needs = default_needs(10, 2);

        let fit = evaluate(&needs, &room);
        assert!(!fit.hours_ok);
        assert_eq!(fit.leftover_hours, None);
        assert!(!eligible(&needs, &room));
    }

    #[test]
    fn exact_fit_is_eligible() {
        let room = make_room(1, 10, 5, 0);
        let needs = default_needs(10, 5);

        let fit = evaluate(&needs, &room);
        assert!(fit.is_eligible());
        assert_eq!(fit.leftover_hours, Some(0));
    }

    #[test]
    fn missing_equipment_is_the_set_difference() {
        let mut room = make_room(1, 40, 10, 0);
        room.equipment = BTreeSet::from([1, 2]);
        let mut needs = default_needs(10, 2);
        needs.equipment = BTreeSet::from([2, 3, 4]);

        let fit = evaluate(&needs, &room);
        assert_eq!(fit.missing_equipment, BTreeSet::from([3, 4]));
        assert!(fit.is_equipment_near_miss());
        assert!(!fit.is_eligible());
    }

    #[test]
    fn superset_equipment_is_accepted() {
        let mut room = make_room(1, 40, 10, 0);
        room.equipment = BTreeSet::from([1, 2, 3]);
        let mut needs = default_needs(10, 2);
        needs.equipment = BTreeSet::from([2]);

        assert!(eligible(&needs, &room));
    }

    #[test]
    fn eligible_rooms_returns_tightest_first() {
        let rooms = vec![
            make_room(1, 50, 10, 0), // 8h left after placement.
            make_room(2, 50, 10, 7), // 1h left, tightest.
            make_room(3, 50, 10, 4), // 4h left.
            make_room(4, 5, 10, 7),  // Too small.
        ];
        let needs = default_needs(10, 2);

        let ranked = eligible_rooms(&needs, &rooms);

        let ids: Vec<RoomId> = ranked.iter().map(|f| f.room_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn ties_break_on_room_id() {
        let rooms = vec![make_room(9, 50, 6, 0), make_room(3, 50, 6, 0)];
        let needs = default_needs(10, 2);

        let ranked = eligible_rooms(&needs, &rooms);
        assert_eq!(ranked[0].room_id, 3);
        assert_eq!(ranked[1].room_id, 9);
    }

    #[test]
    fn near_misses_exclude_capacity_failures() {
        let mut big = make_room(1, 40, 10, 0);
        big.equipment = BTreeSet::from([1]);
        let small = make_room(2, 5, 10, 0);
        let mut needs = default_needs(10, 2);
        needs.equipment = BTreeSet::from([7]);

        let misses = equipment_near_misses(&needs, [&big, &small]);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].room_id, 1);
        assert_eq!(misses[0].missing_equipment, BTreeSet::from([7]));
    }
}
