//! Store gateway — the narrow interface the allocation engine reads and
//! writes through.
//!
//! The engine never touches redb directly. Everything it needs is listed
//! here, scoped by round where records are involved, so tests can wrap or
//! replace the store (for example to inject failures).

use crate::error::StateResult;
use crate::phase::RoundPhase;
use crate::store::StateStore;
use crate::tables::*;
use crate::types::*;

/// Read/write access to the data the allocation engine works on.
///
/// Implementations must give read-after-write consistency within a
/// round's record set. Cross-round transactions are not required.
pub trait AllocationStore: Send + Sync + 'static {
    fn get_round(&self, round_id: RoundId) -> StateResult<Option<AllocationRound>>;

    fn list_rounds(&self) -> StateResult<Vec<AllocationRound>>;

    /// Last phase written for a round, `None` if it never left Idle.
    fn get_round_phase(&self, round_id: RoundId) -> StateResult<Option<RoundPhase>>;

    fn put_round_phase(&self, round_id: RoundId, phase: &RoundPhase) -> StateResult<()>;

    fn list_programs(&self) -> StateResult<Vec<Program>>;

    fn get_program(&self, program_id: ProgramId) -> StateResult<Option<Program>>;

    fn list_equipment(&self) -> StateResult<Vec<Equipment>>;

    fn list_subjects(&self) -> StateResult<Vec<Subject>>;

    fn get_subject(&self, subject_id: SubjectId) -> StateResult<Option<Subject>>;

    fn list_rooms(&self) -> StateResult<Vec<Room>>;

    fn get_room(&self, room_id: RoomId) -> StateResult<Option<Room>>;

    /// All allocation records of a round, ordered by subject id.
    fn list_records(&self, round_id: RoundId) -> StateResult<Vec<AllocationRecord>>;

    fn get_record(
        &self,
        round_id: RoundId,
        subject_id: SubjectId,
    ) -> StateResult<Option<AllocationRecord>>;

    /// Insert or replace the record for `(record.round_id, record.subject_id)`.
    fn put_record(&self, record: &AllocationRecord) -> StateResult<()>;

    /// Delete every record of a round. Returns the number removed.
    fn delete_records(&self, round_id: RoundId) -> StateResult<u32>;
}

impl AllocationStore for StateStore {
    fn get_round(&self, round_id: RoundId) -> StateResult<Option<AllocationRound>> {
        self.get_json(ROUNDS, &id_key(round_id))
    }

    fn list_rounds(&self) -> StateResult<Vec<AllocationRound>> {
        self.list_json(ROUNDS, "")
    }

    fn get_round_phase(&self, round_id: RoundId) -> StateResult<Option<RoundPhase>> {
        self.get_json(ROUND_PHASES, &id_key(round_id))
    }

    fn put_round_phase(&self, round_id: RoundId, phase: &RoundPhase) -> StateResult<()> {
        self.put_json(ROUND_PHASES, &id_key(round_id), phase)?;
        tracing::debug!(round_id, %phase, "round phase stored");
        Ok(())
    }

    fn list_programs(&self) -> StateResult<Vec<Program>> {
        self.list_json(PROGRAMS, "")
    }

    fn get_program(&self, program_id: ProgramId) -> StateResult<Option<Program>> {
        self.get_json(PROGRAMS, &id_key(program_id))
    }

    fn list_equipment(&self) -> StateResult<Vec<Equipment>> {
        self.list_json(EQUIPMENT, "")
    }

    fn list_subjects(&self) -> StateResult<Vec<Subject>> {
        self.list_json(SUBJECTS, "")
    }

    fn get_subject(&self, subject_id: SubjectId) -> StateResult<Option<Subject>> {
        self.get_json(SUBJECTS, &id_key(subject_id))
    }

    fn list_rooms(&self) -> StateResult<Vec<Room>> {
        self.list_json(ROOMS, "")
    }

    fn get_room(&self, room_id: RoomId) -> StateResult<Option<Room>> {
        self.get_json(ROOMS, &id_key(room_id))
    }

    fn list_records(&self, round_id: RoundId) -> StateResult<Vec<AllocationRecord>> {
        self.list_json(RECORDS, &round_prefix(round_id))
    }

    fn get_record(
        &self,
        round_id: RoundId,
        subject_id: SubjectId,
    ) -> StateResult<Option<AllocationRecord>> {
        self.get_json(RECORDS, &record_key(round_id, subject_id))
    }

    fn put_record(&self, record: &AllocationRecord) -> StateResult<()> {
        self.put_json(RECORDS, &record.table_key(), record)?;
        tracing::debug!(
            round_id = record.round_id,
            subject_id = record.subject_id,
            room_id = ?record.room_id,
            "allocation record stored"
        );
        Ok(())
    }

    fn delete_records(&self, round_id: RoundId) -> StateResult<u32> {
        let deleted = self.remove_prefix(RECORDS, &round_prefix(round_id))?;
        tracing::debug!(round_id, deleted, "allocation records deleted");
        Ok(deleted)
    }
}
