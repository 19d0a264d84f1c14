//! Placement engine — tightest-fit room choice within a round.
//!
//! Given the rooms of a round and a subject's needs, the placer decides:
//! 1. Which rooms are eligible (using `eligibility`)
//! 2. Which one leaves the least unused budget (tightest fit)
//! 3. How the chosen room's budget shrinks once the choice is committed
//!
//! Tightest fit is a greedy heuristic for what is really a bin-packing
//! problem. It is deterministic, not optimal.

use std::collections::BTreeMap;

use tracing::debug;

use roomalloc_state::{Hours, RoomId, SubjectId};

use crate::eligibility::{Fit, RoomUsage, SubjectNeeds, eligible_rooms};

/// A placement decision for a single subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub subject_id: SubjectId,
    pub room_id: RoomId,
    pub hours: Hours,
    /// Budget the room keeps after this placement.
    pub leftover_hours: Hours,
}

/// Pick the tightest-fitting eligible room, if any.
pub fn choose_room<'a, I>(needs: &SubjectNeeds, rooms: I) -> Option<Placement>
where
    I: IntoIterator<Item = &'a RoomUsage>,
{
    let ranked = eligible_rooms(needs, rooms);
    let Fit {
        room_id,
        leftover_hours,
        ..
    } = ranked.into_iter().next()?;

    Some(Placement {
        subject_id: needs.subject_id,
        room_id,
        hours: needs.hours,
        leftover_hours: leftover_hours.unwrap_or(0),
    })
}

/// Room budgets for one scheduling pass.
///
/// The ledger is owned by a single pass, so every budget change within the
/// pass is applied in order without locking.
#[derive(Debug, Clone, Default)]
pub struct BudgetLedger {
    rooms: BTreeMap<RoomId, RoomUsage>,
}

impl BudgetLedger {
    pub fn new(rooms: impl IntoIterator<Item = RoomUsage>) -> Self {
        Self {
            rooms: rooms.into_iter().map(|r| (r.room_id, r)).collect(),
        }
    }

    /// Choose a room for `needs` without changing any budget.
    pub fn propose(&self, needs: &SubjectNeeds) -> Option<Placement> {
        choose_room(needs, self.rooms.values())
    }

    /// Debit a placement from its room's budget.
    ///
    /// Called only after the placement has been durably recorded.
    pub fn commit(&mut self, placement: &Placement) {
        if let Some(room) = self.rooms.get_mut(&placement.room_id) {
            room.allocated_hours = room.allocated_hours.saturating_add(placement.hours);
            debug!(
                room = placement.room_id,
                subject = placement.subject_id,
                hours = placement.hours,
                remaining = room.remaining_hours(),
                "room budget debited"
            );
        }
    }

    /// Hours left in `room_id` after every commit so far.
    pub fn remaining_hours(&self, room_id: RoomId) -> Option<Hours> {
        self.rooms.get(&room_id).map(RoomUsage::remaining_hours)
    }
}
