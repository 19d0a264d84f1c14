//! Round orchestrator — starts, aborts and resets allocation rounds.
//!
//! Each running round has a slot holding its cancel signal and the handle
//! of the task running its pass. The slot map is only locked for
//! bookkeeping, never while a pass is doing work.
//!
//! Every phase change is written through to the store. A round seen for
//! the first time starts from its stored phase, so a Failed round stays
//! Failed across restarts until it is reset.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use roomalloc_core::require_id;
use roomalloc_scheduler::{PassOutcome, PassReport, Scheduler};
use roomalloc_state::{AllocationStore, RoundId, RoundPhase};

use crate::error::{RoundError, RoundResult};

/// Snapshot of a round's lifecycle, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoundStatus {
    pub round_id: RoundId,
    pub phase: RoundPhase,
    /// Unix seconds when the latest pass started.
    pub started_at: Option<u64>,
    /// Unix seconds when the latest pass ended.
    pub finished_at: Option<u64>,
    /// An abort was requested for the latest pass.
    pub abort_requested: bool,
    pub last_report: Option<PassReport>,
}

/// Per-round bookkeeping.
struct RoundSlot {
    phase: RoundPhase,
    /// Publishes every phase change; `join` waits on it.
    phase_tx: watch::Sender<RoundPhase>,
    /// Cancel signal of the running pass.
    cancel_tx: Option<watch::Sender<bool>>,
    /// Task running the pass.
    handle: Option<JoinHandle<()>>,
    started_at: Option<u64>,
    finished_at: Option<u64>,
    abort_requested: bool,
    last_report: Option<PassReport>,
}

impl RoundSlot {
    fn new() -> Self {
        Self::restored(RoundPhase::Idle)
    }

    /// Slot for a round whose phase was loaded from the store.
    fn restored(phase: RoundPhase) -> Self {
        let (phase_tx, _) = watch::channel(phase.clone());
        Self {
            phase,
            phase_tx,
            cancel_tx: None,
            handle: None,
            started_at: None,
            finished_at: None,
            abort_requested: false,
            last_report: None,
        }
    }

    fn set_phase(&mut self, phase: RoundPhase) {
        self.phase = phase.clone();
        self.phase_tx.send_replace(phase);
    }

    fn begin(&mut self, cancel_tx: watch::Sender<bool>) {
        self.cancel_tx = Some(cancel_tx);
        self.started_at = Some(unix_now());
        self.finished_at = None;
        self.abort_requested = false;
        self.set_phase(RoundPhase::Running);
    }

    fn request_abort(&mut self) {
        if let Some(tx) = &self.cancel_tx {
            // The pass may already have dropped its receiver on the way out.
            let _ = tx.send(true);
        }
        self.abort_requested = true;
    }

    fn settle(&mut self, phase: RoundPhase, report: Option<PassReport>) {
        self.cancel_tx = None;
        self.handle = None;
        self.finished_at = Some(unix_now());
        if report.is_some() {
            self.last_report = report;
        }
        self.set_phase(phase);
    }

    fn clear(&mut self) {
        self.started_at = None;
        self.finished_at = None;
        self.abort_requested = false;
        self.last_report = None;
        self.set_phase(RoundPhase::Idle);
    }

    fn status(&self, round_id: RoundId) -> RoundStatus {
        RoundStatus {
            round_id,
            phase: self.phase.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            abort_requested: self.abort_requested,
            last_report: self.last_report.clone(),
        }
    }
}

/// Drives allocation rounds through their lifecycle.
///
/// Cheap to clone; clones share the same round table.
pub struct RoundOrchestrator<S: AllocationStore> {
    store: Arc<S>,
    scheduler: Arc<Scheduler<S>>,
    rounds: Arc<RwLock<HashMap<RoundId, RoundSlot>>>,
}

impl<S: AllocationStore> Clone for RoundOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            scheduler: self.scheduler.clone(),
            rounds: self.rounds.clone(),
        }
    }
}

impl<S: AllocationStore> RoundOrchestrator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new(store.clone())),
            store,
            rounds: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a pass for `round_id` in the background.
    ///
    /// Completed and Aborted rounds resume: only subjects without a final
    /// decision are scheduled.
    pub async fn start(&self, round_id: RoundId) -> RoundResult<()> {
        let round_id = self.require_round(round_id)?;

        let mut rounds = self.rounds.write().await;
        let slot = self.slot_mut(&mut rounds, round_id)?;
        if !slot.phase.can_start() {
            return Err(RoundError::InvalidState {
                round_id,
                operation: "start",
                phase: slot.phase.clone(),
            });
        }

        let resumed = slot.phase.is_terminal();
        self.store.put_round_phase(round_id, &RoundPhase::Running)?;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        slot.begin(cancel_tx);

        let scheduler = self.scheduler.clone();
        let store = self.store.clone();
        let table = self.rounds.clone();
        slot.handle = Some(tokio::spawn(async move {
            // A panicking pass must still settle its slot.
            let pass =
                tokio::spawn(async move { scheduler.schedule_round(round_id, &cancel_rx).await });
            let result = match pass.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(format!("allocation pass task ended abnormally: {e}")),
            };
            finish_pass(&table, store.as_ref(), round_id, result).await;
        }));

        info!(round_id, resumed, "allocation round started");
        Ok(())
    }

    /// Ask the running pass of `round_id` to stop at its next subject.
    ///
    /// Returns once the request is delivered. The phase turns Aborted when
    /// the pass acknowledges; use [`join`](Self::join) to wait for that.
    pub async fn abort(&self, round_id: RoundId) -> RoundResult<()> {
        let round_id = self.require_round(round_id)?;

        let mut rounds = self.rounds.write().await;
        let phase = match rounds.get_mut(&round_id) {
            Some(slot) if slot.phase.is_running() => {
                let repeated = slot.abort_requested;
                slot.request_abort();
                info!(round_id, repeated, "allocation round abort requested");
                return Ok(());
            }
            Some(slot) => slot.phase.clone(),
            None => self.stored_phase(round_id)?,
        };
        Err(RoundError::InvalidState {
            round_id,
            operation: "abort",
            phase,
        })
    }

    /// Delete every record of `round_id` and return it to Idle.
    ///
    /// Returns the number of records deleted. Resetting an Idle round with
    /// no records does nothing.
    pub async fn reset(&self, round_id: RoundId) -> RoundResult<u32> {
        let round_id = self.require_round(round_id)?;

        let mut rounds = self.rounds.write().await;
        let slot = self.slot_mut(&mut rounds, round_id)?;
        if !slot.phase.can_reset() {
            return Err(RoundError::InvalidState {
                round_id,
                operation: "reset",
                phase: slot.phase.clone(),
            });
        }

        let previous = slot.phase.clone();
        let deleted = self.store.delete_records(round_id)?;
        self.store.put_round_phase(round_id, &RoundPhase::Idle)?;
        slot.clear();

        info!(round_id, deleted, %previous, "allocation round reset");
        Ok(deleted)
    }

    /// Current phase of `round_id`. Rounds never started are Idle.
    pub async fn state(&self, round_id: RoundId) -> RoundResult<RoundPhase> {
        let round_id = self.require_round(round_id)?;
        let rounds = self.rounds.read().await;
        match rounds.get(&round_id) {
            Some(slot) => Ok(slot.phase.clone()),
            None => self.stored_phase(round_id),
        }
    }

    pub async fn status(&self, round_id: RoundId) -> RoundResult<RoundStatus> {
        let round_id = self.require_round(round_id)?;
        let rounds = self.rounds.read().await;
        Ok(match rounds.get(&round_id) {
            Some(slot) => slot.status(round_id),
            None => RoundSlot::restored(self.stored_phase(round_id)?).status(round_id),
        })
    }

    /// Wait until `round_id` is no longer Running and return its phase.
    ///
    /// A round this orchestrator has tracked can be joined even if it was
    /// removed from the store meanwhile.
    pub async fn join(&self, round_id: RoundId) -> RoundResult<RoundPhase> {
        let round_id = require_id("round", round_id)?;

        let tracked = {
            let rounds = self.rounds.read().await;
            rounds.get(&round_id).map(|slot| slot.phase_tx.subscribe())
        };
        let Some(mut phase_rx) = tracked else {
            self.require_round(round_id)?;
            return self.stored_phase(round_id);
        };

        let waited = phase_rx
            .wait_for(|phase| !phase.is_running())
            .await
            .map(|phase| phase.clone());
        Ok(match waited {
            Ok(phase) => phase,
            Err(_) => phase_rx.borrow().clone(),
        })
    }

    /// Abort every running round and wait for each pass to stop.
    pub async fn shutdown(&self) {
        let handles: Vec<(RoundId, JoinHandle<()>)> = {
            let mut rounds = self.rounds.write().await;
            rounds
                .iter_mut()
                .filter(|(_, slot)| slot.phase.is_running())
                .filter_map(|(round_id, slot)| {
                    slot.request_abort();
                    slot.handle.take().map(|handle| (*round_id, handle))
                })
                .collect()
        };

        let count = handles.len();
        for (round_id, handle) in handles {
            if let Err(e) = handle.await {
                warn!(round_id, error = %e, "allocation pass task ended abnormally");
            }
        }
        info!(aborted = count, "round orchestrator shut down");
    }

    /// Validate the id and confirm the round exists in the store.
    fn require_round(&self, round_id: RoundId) -> RoundResult<RoundId> {
        let round_id = require_id("round", round_id)?;
        match self.store.get_round(round_id)? {
            Some(_) => Ok(round_id),
            None => Err(RoundError::NotFound(format!("allocation round {round_id}"))),
        }
    }

    /// Phase of a round this orchestrator has not tracked yet.
    fn stored_phase(&self, round_id: RoundId) -> RoundResult<RoundPhase> {
        Ok(self
            .store
            .get_round_phase(round_id)?
            .map(RoundPhase::restored)
            .unwrap_or_default())
    }

    /// The round's slot, created from its stored phase on first use.
    fn slot_mut<'a>(
        &self,
        rounds: &'a mut HashMap<RoundId, RoundSlot>,
        round_id: RoundId,
    ) -> RoundResult<&'a mut RoundSlot> {
        Ok(match rounds.entry(round_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let phase = self.stored_phase(round_id)?;
                debug!(round_id, %phase, "round slot restored");
                entry.insert(RoundSlot::restored(phase))
            }
        })
    }
}

/// Record how a pass ended, in the store and in the round's slot.
async fn finish_pass<S: AllocationStore>(
    rounds: &RwLock<HashMap<RoundId, RoundSlot>>,
    store: &S,
    round_id: RoundId,
    result: Result<PassOutcome, String>,
) {
    let mut rounds = rounds.write().await;
    let Some(slot) = rounds.get_mut(&round_id) else {
        return;
    };

    let (phase, report) = match result {
        Ok(PassOutcome::Completed(report)) => {
            info!(
                round_id,
                allocated = report.allocated_count(),
                unallocatable = report.unallocatable_count(),
                "allocation round completed"
            );
            (RoundPhase::Completed, Some(report))
        }
        Ok(PassOutcome::Aborted(report)) => {
            info!(
                round_id,
                processed = report.processed.len(),
                untouched = report.untouched,
                "allocation round aborted"
            );
            (RoundPhase::Aborted, Some(report))
        }
        Err(reason) => {
            warn!(round_id, %reason, "allocation round failed");
            (RoundPhase::Failed { reason }, None)
        }
    };

    if let Err(e) = store.put_round_phase(round_id, &phase) {
        error!(round_id, %phase, error = %e, "failed to store round phase");
    }
    slot.settle(phase, report);
    debug!(round_id, phase = %slot.phase, "round slot settled");
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    //! These tests run on tokio's current-thread runtime, so a spawned
    //! pass makes no progress until the test awaits something that yields
    //! (such as `join`).

    use super::*;
    use roomalloc_state::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Delegates to a `StateStore`, panicking in `list_subjects` while armed.
    struct PanickingStore {
        inner: StateStore,
        armed: AtomicBool,
    }

    impl AllocationStore for PanickingStore {
        fn get_round(&self, round_id: RoundId) -> StateResult<Option<AllocationRound>> {
            self.inner.get_round(round_id)
        }
        fn list_rounds(&self) -> StateResult<Vec<AllocationRound>> {
            self.inner.list_rounds()
        }
        fn get_round_phase(&self, round_id: RoundId) -> StateResult<Option<RoundPhase>> {
            self.inner.get_round_phase(round_id)
        }
        fn put_round_phase(&self, round_id: RoundId, phase: &RoundPhase) -> StateResult<()> {
            self.inner.put_round_phase(round_id, phase)
        }
        fn list_programs(&self) -> StateResult<Vec<Program>> {
            self.inner.list_programs()
        }
        fn get_program(&self, program_id: ProgramId) -> StateResult<Option<Program>> {
            self.inner.get_program(program_id)
        }
        fn list_equipment(&self) -> StateResult<Vec<Equipment>> {
            self.inner.list_equipment()
        }
        fn list_subjects(&self) -> StateResult<Vec<Subject>> {
            if self.armed.load(Ordering::SeqCst) {
                panic!("subject table corrupted");
            }
            self.inner.list_subjects()
        }
        fn get_subject(&self, subject_id: SubjectId) -> StateResult<Option<Subject>> {
            self.inner.get_subject(subject_id)
        }
        fn list_rooms(&self) -> StateResult<Vec<Room>> {
            self.inner.list_rooms()
        }
        fn get_room(&self, room_id: RoomId) -> StateResult<Option<Room>> {
            self.inner.get_room(room_id)
        }
        fn list_records(&self, round_id: RoundId) -> StateResult<Vec<AllocationRecord>> {
            self.inner.list_records(round_id)
        }
        fn get_record(
            &self,
            round_id: RoundId,
            subject_id: SubjectId,
        ) -> StateResult<Option<AllocationRecord>> {
            self.inner.get_record(round_id, subject_id)
        }
        fn put_record(&self, record: &AllocationRecord) -> StateResult<()> {
            self.inner.put_record(record)
        }
        fn delete_records(&self, round_id: RoundId) -> StateResult<u32> {
            self.inner.delete_records(round_id)
        }
    }

    fn subject(id: SubjectId, priority: u32) -> Subject {
        Subject {
            id,
            name: format!("subject-{id}"),
            program_id: 1,
            group_size: 10,
            equipment: Default::default(),
            hours: 4,
            priority,
        }
    }

    fn round(id: RoundId) -> AllocationRound {
        AllocationRound {
            id,
            name: format!("round-{id}"),
            description: None,
            created_at: 0,
        }
    }

    fn test_store() -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        store
            .load_dataset(&Dataset {
                rounds: vec![round(1), round(2)],
                rooms: vec![Room {
                    id: 1,
                    name: "hall".into(),
                    capacity: 40,
                    equipment: Default::default(),
                    hour_budget: 12,
                }],
                subjects: (1..=4).map(|id| subject(id, id as u32)).collect(),
                ..Default::default()
            })
            .unwrap();
        store
    }

    fn test_orchestrator() -> (Arc<StateStore>, RoundOrchestrator<StateStore>) {
        let store = Arc::new(test_store());
        let orchestrator = RoundOrchestrator::new(store.clone());
        (store, orchestrator)
    }

    #[tokio::test]
    async fn unknown_round_is_not_found() {
        let (_, orch) = test_orchestrator();
        assert!(matches!(orch.start(42).await, Err(RoundError::NotFound(_))));
        assert!(matches!(orch.reset(42).await, Err(RoundError::NotFound(_))));
    }

    #[tokio::test]
    async fn zero_round_id_is_a_validation_error() {
        let (_, orch) = test_orchestrator();
        assert!(matches!(orch.start(0).await, Err(RoundError::Validation(_))));
        assert!(matches!(orch.state(0).await, Err(RoundError::Validation(_))));
    }

    #[tokio::test]
    async fn fresh_round_is_idle() {
        let (_, orch) = test_orchestrator();
        assert_eq!(orch.state(1).await.unwrap(), RoundPhase::Idle);
        assert_eq!(orch.join(1).await.unwrap(), RoundPhase::Idle);
        let status = orch.status(1).await.unwrap();
        assert!(status.last_report.is_none());
        assert!(status.started_at.is_none());
    }

    #[tokio::test]
    async fn start_runs_pass_to_completion() {
        let (store, orch) = test_orchestrator();

        orch.start(1).await.unwrap();
        assert_eq!(orch.state(1).await.unwrap(), RoundPhase::Running);
        assert_eq!(orch.join(1).await.unwrap(), RoundPhase::Completed);

        // 12h budget, 4h each: three of four subjects fit.
        let status = orch.status(1).await.unwrap();
        let report = status.last_report.unwrap();
        assert_eq!(report.allocated_count(), 3);
        assert_eq!(report.unallocatable_count(), 1);
        assert!(status.finished_at.is_some());
        assert_eq!(store.list_records(1).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn running_round_rejects_start_and_reset() {
        let (_, orch) = test_orchestrator();
        orch.start(1).await.unwrap();

        let err = orch.start(1).await.unwrap_err();
        assert!(matches!(
            err,
            RoundError::InvalidState {
                operation: "start",
                phase: RoundPhase::Running,
                ..
            }
        ));
        assert!(matches!(
            orch.reset(1).await,
            Err(RoundError::InvalidState { .. })
        ));

        orch.join(1).await.unwrap();
    }

    #[tokio::test]
    async fn abort_before_first_subject_commits_nothing() {
        let (store, orch) = test_orchestrator();
        orch.start(1).await.unwrap();
        orch.abort(1).await.unwrap();
        orch.abort(1).await.unwrap(); // Repeat while pending is accepted.

        assert_eq!(orch.join(1).await.unwrap(), RoundPhase::Aborted);
        let status = orch.status(1).await.unwrap();
        assert!(status.abort_requested);
        assert_eq!(status.last_report.unwrap().untouched, 4);
        assert!(store.list_records(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn abort_requires_running_round() {
        let (_, orch) = test_orchestrator();
        assert!(matches!(
            orch.abort(1).await,
            Err(RoundError::InvalidState {
                phase: RoundPhase::Idle,
                ..
            })
        ));

        orch.start(1).await.unwrap();
        orch.join(1).await.unwrap();
        assert!(matches!(
            orch.abort(1).await,
            Err(RoundError::InvalidState {
                phase: RoundPhase::Completed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn reset_clears_records_and_is_idempotent() {
        let (store, orch) = test_orchestrator();
        orch.start(1).await.unwrap();
        orch.join(1).await.unwrap();

        assert_eq!(orch.reset(1).await.unwrap(), 4);
        assert_eq!(orch.state(1).await.unwrap(), RoundPhase::Idle);
        assert!(store.list_records(1).unwrap().is_empty());
        assert!(orch.status(1).await.unwrap().last_report.is_none());

        assert_eq!(orch.reset(1).await.unwrap(), 0);
        assert_eq!(orch.reset(1).await.unwrap(), 0);
        assert_eq!(orch.state(1).await.unwrap(), RoundPhase::Idle);
    }

    #[tokio::test]
    async fn aborted_round_resumes_where_it_stopped() {
        let (store, orch) = test_orchestrator();
        orch.start(1).await.unwrap();
        orch.abort(1).await.unwrap();
        orch.join(1).await.unwrap();

        orch.start(1).await.unwrap();
        assert_eq!(orch.join(1).await.unwrap(), RoundPhase::Completed);
        let report = orch.status(1).await.unwrap().last_report.unwrap();
        assert_eq!(report.processed.len(), 4);
        assert_eq!(store.list_records(1).unwrap().len(), 4);

        // A second resume finds nothing left to do.
        orch.start(1).await.unwrap();
        orch.join(1).await.unwrap();
        let report = orch.status(1).await.unwrap().last_report.unwrap();
        assert!(report.processed.is_empty());
        assert_eq!(report.already_resolved, 4);
    }

    #[tokio::test]
    async fn failed_round_must_be_reset_before_restart() {
        let (store, orch) = test_orchestrator();
        orch.start(1).await.unwrap();
        // Pull the round out from under the pass before it first runs.
        store.delete_round(1).unwrap();

        let phase = orch.join(1).await.unwrap();
        assert!(matches!(phase, RoundPhase::Failed { .. }));
        assert!(phase.to_string().contains("not found"));

        store.put_round(&round(1)).unwrap();
        assert!(matches!(
            orch.state(1).await.unwrap(),
            RoundPhase::Failed { .. }
        ));
        assert!(matches!(
            orch.start(1).await,
            Err(RoundError::InvalidState { .. })
        ));

        orch.reset(1).await.unwrap();
        orch.start(1).await.unwrap();
        assert_eq!(orch.join(1).await.unwrap(), RoundPhase::Completed);
    }

    #[tokio::test]
    async fn phases_survive_a_new_orchestrator() {
        let (store, orch) = test_orchestrator();
        orch.start(1).await.unwrap();
        store.delete_round(1).unwrap();
        assert!(matches!(
            orch.join(1).await.unwrap(),
            RoundPhase::Failed { .. }
        ));
        store.put_round(&round(1)).unwrap();

        orch.start(2).await.unwrap();
        assert_eq!(orch.join(2).await.unwrap(), RoundPhase::Completed);

        // Same store, fresh process.
        let restarted = RoundOrchestrator::new(store.clone());
        assert!(matches!(
            restarted.state(1).await.unwrap(),
            RoundPhase::Failed { .. }
        ));
        assert!(matches!(
            restarted.join(1).await.unwrap(),
            RoundPhase::Failed { .. }
        ));
        assert!(matches!(
            restarted.start(1).await,
            Err(RoundError::InvalidState {
                operation: "start",
                phase: RoundPhase::Failed { .. },
                ..
            })
        ));
        assert_eq!(restarted.state(2).await.unwrap(), RoundPhase::Completed);

        restarted.reset(1).await.unwrap();
        assert_eq!(store.get_round_phase(1).unwrap(), Some(RoundPhase::Idle));
        restarted.start(1).await.unwrap();
        assert_eq!(restarted.join(1).await.unwrap(), RoundPhase::Completed);
        assert_eq!(
            store.get_round_phase(1).unwrap(),
            Some(RoundPhase::Completed)
        );
    }

    #[tokio::test]
    async fn pass_cut_off_by_restart_reads_as_failed() {
        let (store, _) = test_orchestrator();
        store.put_round_phase(1, &RoundPhase::Running).unwrap();

        let orch = RoundOrchestrator::new(store.clone());
        let phase = orch.state(1).await.unwrap();
        assert!(phase.to_string().contains("interrupted"));
        assert!(matches!(
            orch.abort(1).await,
            Err(RoundError::InvalidState {
                phase: RoundPhase::Failed { .. },
                ..
            })
        ));
        assert!(orch.start(1).await.is_err());

        orch.reset(1).await.unwrap();
        assert_eq!(orch.state(1).await.unwrap(), RoundPhase::Idle);
    }

    #[tokio::test]
    async fn panicking_pass_fails_the_round() {
        let store = Arc::new(PanickingStore {
            inner: test_store(),
            armed: AtomicBool::new(true),
        });
        let orch = RoundOrchestrator::new(store.clone());

        orch.start(1).await.unwrap();
        let phase = orch.join(1).await.unwrap();
        assert!(matches!(phase, RoundPhase::Failed { .. }));
        assert!(phase.to_string().contains("panicked"));
        assert!(matches!(
            store.get_round_phase(1).unwrap(),
            Some(RoundPhase::Failed { .. })
        ));

        // The slot is usable again after a reset.
        store.armed.store(false, Ordering::SeqCst);
        orch.reset(1).await.unwrap();
        orch.start(1).await.unwrap();
        assert_eq!(orch.join(1).await.unwrap(), RoundPhase::Completed);
    }

    #[tokio::test]
    async fn rounds_are_independent() {
        let (store, orch) = test_orchestrator();
        orch.start(1).await.unwrap();
        orch.start(2).await.unwrap();
        orch.abort(2).await.unwrap();

        assert_eq!(orch.join(1).await.unwrap(), RoundPhase::Completed);
        assert_eq!(orch.join(2).await.unwrap(), RoundPhase::Aborted);
        assert_eq!(store.list_records(1).unwrap().len(), 4);
        assert!(store.list_records(2).unwrap().is_empty());

        orch.reset(1).await.unwrap();
        assert_eq!(orch.state(2).await.unwrap(), RoundPhase::Aborted);
    }

    #[tokio::test]
    async fn shutdown_aborts_running_rounds() {
        let (_, orch) = test_orchestrator();
        orch.start(1).await.unwrap();
        orch.start(2).await.unwrap();

        orch.shutdown().await;

        assert_eq!(orch.state(1).await.unwrap(), RoundPhase::Aborted);
        assert_eq!(orch.state(2).await.unwrap(), RoundPhase::Aborted);
    }

    #[test]
    fn status_serializes_phase_and_report() {
        let mut slot = RoundSlot::new();
        slot.settle(RoundPhase::Completed, Some(PassReport::default()));
        let json = serde_json::to_value(slot.status(3)).unwrap();
        assert_eq!(json["round_id"], 3);
        assert_eq!(json["phase"], "completed");
        assert!(json["finished_at"].is_u64());
    }
}
