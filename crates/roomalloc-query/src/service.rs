//! Query service — read projections for allocation rounds.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use roomalloc_core::require_id;
use roomalloc_placement::{
    RoomUsage, eligible_rooms, equipment_near_misses, missing_equipment, subject_needs,
    usage_for_round,
};
use roomalloc_state::*;

use crate::error::{QueryError, QueryResult};
use crate::views::*;

/// Read-only access to rounds and their allocation results.
pub struct QueryService<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: AllocationStore> QueryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // ── Rounds ──────────────────────────────────────────────────

    pub fn list_rounds(&self) -> QueryResult<Vec<AllocationRound>> {
        Ok(self.store.list_rounds()?)
    }

    pub fn get_round(&self, round_id: RoundId) -> QueryResult<AllocationRound> {
        let round_id = require_id("round", round_id)?;
        self.store
            .get_round(round_id)?
            .ok_or_else(|| QueryError::NotFound(format!("allocation round {round_id}")))
    }

    // ── Rooms ───────────────────────────────────────────────────

    /// Rooms holding at least one allocated subject, ordered by room id.
    pub fn allocated_rooms(&self, round_id: RoundId) -> QueryResult<Vec<RoomAllocation>> {
        self.get_round(round_id)?;
        let rooms = self.store.list_rooms()?;
        let records = self.store.list_records(round_id)?;

        let mut subject_counts: HashMap<RoomId, usize> = HashMap::new();
        for room_id in records.iter().filter(|r| r.is_allocated).filter_map(|r| r.room_id) {
            *subject_counts.entry(room_id).or_default() += 1;
        }

        let allocated = rooms
            .iter()
            .zip(usage_for_round(&rooms, &records))
            .filter_map(|(room, usage)| {
                let subject_count = subject_counts.get(&room.id).copied()?;
                Some(RoomAllocation {
                    room_id: room.id,
                    name: room.name.clone(),
                    capacity: room.capacity,
                    hour_budget: room.hour_budget,
                    allocated_hours: usage.allocated_hours,
                    remaining_hours: usage.remaining_hours(),
                    subject_count,
                })
            })
            .collect();
        Ok(allocated)
    }

    /// Rooms the subject is allocated to in this round.
    pub fn allocated_rooms_for_subject(
        &self,
        round_id: RoundId,
        subject_id: SubjectId,
    ) -> QueryResult<Vec<RoomHours>> {
        self.get_round(round_id)?;
        let subject = self.subject(subject_id)?;

        let Some(record) = self.store.get_record(round_id, subject.id)? else {
            return Ok(Vec::new());
        };
        let Some(room_id) = record.room_id.filter(|_| record.is_allocated) else {
            return Ok(Vec::new());
        };
        let room = self.room(room_id)?;
        Ok(vec![RoomHours {
            room_id: room.id,
            name: room.name,
            allocated_hours: record.allocated_hours,
        }])
    }

    /// Rooms that could take the subject given what the round has committed.
    ///
    /// Tightest fit first, the same order the scheduler uses.
    pub fn eligible_rooms_for_subject(
        &self,
        round_id: RoundId,
        subject_id: SubjectId,
    ) -> QueryResult<Vec<EligibleRoom>> {
        self.get_round(round_id)?;
        let subject = self.subject(subject_id)?;
        let (rooms, usage) = self.round_usage(round_id)?;
        let needs = subject_needs(&subject);

        let eligible = eligible_rooms(&needs, usage.values())
            .into_iter()
            .filter_map(|fit| {
                let room = rooms.get(&fit.room_id)?;
                let remaining_hours = usage.get(&fit.room_id)?.remaining_hours();
                Some(EligibleRoom {
                    room_id: room.id,
                    name: room.name.clone(),
                    capacity: room.capacity,
                    remaining_hours,
                    leftover_hours: fit.leftover_hours.unwrap_or(0),
                })
            })
            .collect();
        Ok(eligible)
    }

    // ── Programs ────────────────────────────────────────────────

    /// Per program: rooms its subjects occupy (hours summed per room) and
    /// every subject with its allocation status.
    pub fn rooms_by_program(&self, round_id: RoundId) -> QueryResult<Vec<ProgramAllocation>> {
        self.get_round(round_id)?;
        let programs = self.store.list_programs()?;
        let subjects = self.store.list_subjects()?;
        let room_names: HashMap<RoomId, String> = self
            .store
            .list_rooms()?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();
        let records: HashMap<SubjectId, AllocationRecord> = self
            .store
            .list_records(round_id)?
            .into_iter()
            .map(|r| (r.subject_id, r))
            .collect();

        let result = programs
            .into_iter()
            .map(|program| {
                let mut room_hours: BTreeMap<RoomId, Hours> = BTreeMap::new();
                let mut program_subjects = Vec::new();

                for subject in subjects.iter().filter(|s| s.program_id == program.id) {
                    let record = records.get(&subject.id);
                    if let Some(room_id) = record.filter(|r| r.is_allocated).and_then(|r| r.room_id) {
                        let hours = room_hours.entry(room_id).or_default();
                        *hours = hours.saturating_add(record.map_or(0, |r| r.allocated_hours));
                    }
                    program_subjects.push(ProgramSubject {
                        subject_id: subject.id,
                        name: subject.name.clone(),
                        hours: subject.hours,
                        room_id: record.and_then(|r| r.room_id),
                        is_allocated: record.is_some_and(|r| r.is_allocated),
                        cant_allocate: record.is_some_and(|r| r.cant_allocate),
                    });
                }

                let rooms = room_hours
                    .into_iter()
                    .map(|(room_id, allocated_hours)| RoomHours {
                        room_id,
                        name: room_names.get(&room_id).cloned().unwrap_or_default(),
                        allocated_hours,
                    })
                    .collect();

                ProgramAllocation {
                    program_id: program.id,
                    name: program.name,
                    rooms,
                    subjects: program_subjects,
                }
            })
            .collect();
        Ok(result)
    }

    // ── Subjects ────────────────────────────────────────────────

    /// Subjects allocated to `room_id` in this round, ordered by subject id.
    pub fn subjects_in_room(
        &self,
        round_id: RoundId,
        room_id: RoomId,
    ) -> QueryResult<Vec<AllocatedSubject>> {
        self.get_round(round_id)?;
        let room = self.room(room_id)?;
        let subjects: HashMap<SubjectId, Subject> = self
            .store
            .list_subjects()?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let allocated = self
            .store
            .list_records(round_id)?
            .into_iter()
            .filter(|r| r.is_allocated && r.room_id == Some(room.id))
            .filter_map(|record| {
                let subject = subjects.get(&record.subject_id)?;
                Some(AllocatedSubject {
                    subject_id: subject.id,
                    name: subject.name.clone(),
                    program_id: subject.program_id,
                    group_size: subject.group_size,
                    priority: record.priority,
                    allocated_hours: record.allocated_hours,
                })
            })
            .collect();
        Ok(allocated)
    }

    /// Subjects without a room: those marked `cant_allocate` and, unless
    /// the round has completed, those no pass has reached yet.
    pub fn unallocated_subjects(&self, round_id: RoundId) -> QueryResult<Vec<UnallocatedSubject>> {
        self.get_round(round_id)?;
        let completed = matches!(
            self.store.get_round_phase(round_id)?,
            Some(RoundPhase::Completed)
        );
        let records: HashMap<SubjectId, AllocationRecord> = self
            .store
            .list_records(round_id)?
            .into_iter()
            .map(|r| (r.subject_id, r))
            .collect();

        let unallocated: Vec<UnallocatedSubject> = self
            .store
            .list_subjects()?
            .into_iter()
            .filter_map(|subject| {
                let reason = match records.get(&subject.id) {
                    Some(r) if r.is_allocated => return None,
                    Some(r) if r.cant_allocate => UnallocatedReason::CantAllocate,
                    _ if completed => return None,
                    _ => UnallocatedReason::NotAttempted,
                };
                Some(UnallocatedSubject {
                    subject_id: subject.id,
                    name: subject.name,
                    program_id: subject.program_id,
                    group_size: subject.group_size,
                    hours: subject.hours,
                    priority: subject.priority,
                    reason,
                })
            })
            .collect();

        debug!(round_id, count = unallocated.len(), "unallocated subjects listed");
        Ok(unallocated)
    }

    // ── Equipment ───────────────────────────────────────────────

    /// Equipment the subject requires that the room does not provide.
    pub fn missing_equipment(
        &self,
        subject_id: SubjectId,
        room_id: RoomId,
    ) -> QueryResult<MissingEquipmentReport> {
        let subject = self.subject(subject_id)?;
        let room = self.room(room_id)?;
        let missing = missing_equipment(&subject.equipment, &room.equipment);

        Ok(MissingEquipmentReport {
            subject_id: subject.id,
            room_id: room.id,
            missing: self.equipment_refs(&missing)?,
        })
    }

    /// Rooms that would fit the subject in this round except for equipment.
    pub fn equipment_near_misses(
        &self,
        round_id: RoundId,
        subject_id: SubjectId,
    ) -> QueryResult<Vec<NearMiss>> {
        self.get_round(round_id)?;
        let subject = self.subject(subject_id)?;
        let (rooms, usage) = self.round_usage(round_id)?;
        let needs = subject_needs(&subject);

        let mut misses = Vec::new();
        for fit in equipment_near_misses(&needs, usage.values()) {
            let (Some(room), Some(room_usage)) = (rooms.get(&fit.room_id), usage.get(&fit.room_id))
            else {
                continue;
            };
            misses.push(NearMiss {
                room_id: room.id,
                name: room.name.clone(),
                remaining_hours: room_usage.remaining_hours(),
                missing: self.equipment_refs(&fit.missing_equipment)?,
            });
        }
        Ok(misses)
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn subject(&self, subject_id: SubjectId) -> QueryResult<Subject> {
        let subject_id = require_id("subject", subject_id)?;
        self.store
            .get_subject(subject_id)?
            .ok_or_else(|| QueryError::NotFound(format!("subject {subject_id}")))
    }

    fn room(&self, room_id: RoomId) -> QueryResult<Room> {
        let room_id = require_id("room", room_id)?;
        self.store
            .get_room(room_id)?
            .ok_or_else(|| QueryError::NotFound(format!("room {room_id}")))
    }

    /// Rooms and their usage in a round, both keyed by room id.
    fn round_usage(
        &self,
        round_id: RoundId,
    ) -> QueryResult<(BTreeMap<RoomId, Room>, BTreeMap<RoomId, RoomUsage>)> {
        let rooms = self.store.list_rooms()?;
        let records = self.store.list_records(round_id)?;
        let usage = usage_for_round(&rooms, &records)
            .into_iter()
            .map(|u| (u.room_id, u))
            .collect();
        let rooms = rooms.into_iter().map(|r| (r.id, r)).collect();
        Ok((rooms, usage))
    }

    fn equipment_refs(&self, ids: &BTreeSet<EquipmentId>) -> QueryResult<Vec<EquipmentRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let names: HashMap<EquipmentId, String> = self
            .store
            .list_equipment()?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();
        Ok(ids
            .iter()
            .map(|id| EquipmentRef {
                equipment_id: *id,
                name: names.get(id).cloned(),
            })
            .collect())
    }
}
