//! StateStore — redb-backed state persistence for RoomAlloc.
//!
//! Provides typed CRUD operations over rounds, programs, equipment,
//! subjects, rooms and allocation records. All values are JSON-serialized
//! into redb's `&[u8]` value columns. The store supports both on-disk and
//! in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for table in [
            ROUNDS,
            ROUND_PHASES,
            PROGRAMS,
            EQUIPMENT,
            SUBJECTS,
            ROOMS,
            RECORDS,
        ] {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic table access ───────────────────────────────────────

    pub(crate) fn put_json<T: Serialize>(
        &self,
        table: JsonTable,
        key: &str,
        value: &T,
    ) -> StateResult<()> {
        let value = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        key: &str,
    ) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// List every value whose key starts with `prefix`, in key order.
    pub(crate) fn list_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        prefix: &str,
    ) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let item: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }

    pub(crate) fn remove_key(&self, table: JsonTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    /// Delete every key starting with `prefix` in one transaction.
    pub(crate) fn remove_prefix(&self, table: JsonTable, prefix: &str) -> StateResult<u32> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            let mut keys = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                if key.value().starts_with(prefix) {
                    keys.push(key.value().to_string());
                }
            }
            for key in &keys {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            count = keys.len() as u32;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(count)
    }

    // ── Rounds ─────────────────────────────────────────────────────

    /// Insert or update an allocation round.
    pub fn put_round(&self, round: &AllocationRound) -> StateResult<()> {
        self.put_json(ROUNDS, &id_key(round.id), round)?;
        debug!(round_id = round.id, "round stored");
        Ok(())
    }

    /// Delete a round, its phase and all of its allocation records.
    /// Returns true if it existed.
    pub fn delete_round(&self, round_id: RoundId) -> StateResult<bool> {
        let records = self.remove_prefix(RECORDS, &round_prefix(round_id))?;
        self.remove_key(ROUND_PHASES, &id_key(round_id))?;
        let existed = self.remove_key(ROUNDS, &id_key(round_id))?;
        debug!(round_id, existed, records, "round deleted");
        Ok(existed)
    }

    // ── Programs ───────────────────────────────────────────────────

    pub fn put_program(&self, program: &Program) -> StateResult<()> {
        self.put_json(PROGRAMS, &id_key(program.id), program)
    }

    pub fn delete_program(&self, program_id: ProgramId) -> StateResult<bool> {
        self.remove_key(PROGRAMS, &id_key(program_id))
    }

    // ── Equipment ──────────────────────────────────────────────────

    pub fn put_equipment(&self, equipment: &Equipment) -> StateResult<()> {
        self.put_json(EQUIPMENT, &id_key(equipment.id), equipment)
    }

    pub fn delete_equipment(&self, equipment_id: EquipmentId) -> StateResult<bool> {
        self.remove_key(EQUIPMENT, &id_key(equipment_id))
    }

    // ── Subjects ───────────────────────────────────────────────────

    pub fn put_subject(&self, subject: &Subject) -> StateResult<()> {
        self.put_json(SUBJECTS, &id_key(subject.id), subject)?;
        debug!(subject_id = subject.id, "subject stored");
        Ok(())
    }

    pub fn delete_subject(&self, subject_id: SubjectId) -> StateResult<bool> {
        self.remove_key(SUBJECTS, &id_key(subject_id))
    }

    // ── Rooms ──────────────────────────────────────────────────────

    pub fn put_room(&self, room: &Room) -> StateResult<()> {
        self.put_json(ROOMS, &id_key(room.id), room)?;
        debug!(room_id = room.id, "room stored");
        Ok(())
    }

    pub fn delete_room(&self, room_id: RoomId) -> StateResult<bool> {
        self.remove_key(ROOMS, &id_key(room_id))
    }

    // ── Bulk import ────────────────────────────────────────────────

    /// Write every entity of a dataset. Existing entries with the same id
    /// are replaced; allocation records and round phases are left alone.
    /// Nothing is written if any id is zero.
    pub fn load_dataset(&self, dataset: &Dataset) -> StateResult<()> {
        dataset.validate()?;
        for round in &dataset.rounds {
            self.put_round(round)?;
        }
        for program in &dataset.programs {
            self.put_program(program)?;
        }
        for equipment in &dataset.equipment {
            self.put_equipment(equipment)?;
        }
        for room in &dataset.rooms {
            self.put_room(room)?;
        }
        for subject in &dataset.subjects {
            self.put_subject(subject)?;
        }
        info!(
            rounds = dataset.rounds.len(),
            programs = dataset.programs.len(),
            equipment = dataset.equipment.len(),
            rooms = dataset.rooms.len(),
            subjects = dataset.subjects.len(),
            "dataset loaded"
        );
        Ok(())
    }
}
