//! Scheduler — commits subjects to rooms for one allocation round.
//!
//! A pass is a single sequential sweep:
//! - Load subjects, rooms and the round's existing records
//! - Skip subjects that already have a final decision
//! - Visit the rest by (priority, subject id), placing each in the
//!   tightest-fitting eligible room or marking it `cant_allocate`
//!
//! Each subject's match and commit happen as one step. Cancellation is only
//! observed between steps, so an aborted pass always leaves a clean prefix
//! of the visiting order behind it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use roomalloc_placement::{BudgetLedger, subject_needs, usage_for_round};
use roomalloc_state::*;

use crate::error::{SchedulerError, SchedulerResult};

/// What happened to one subject during a pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubjectOutcome {
    pub subject_id: SubjectId,
    pub priority: u32,
    /// `None` when no room fit and the subject was marked `cant_allocate`.
    pub room_id: Option<RoomId>,
    pub hours: Hours,
}

impl SubjectOutcome {
    pub fn is_allocated(&self) -> bool {
        self.room_id.is_some()
    }
}

/// Summary of a single pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PassReport {
    pub round_id: RoundId,
    /// Subjects handled by this pass, in commit order.
    pub processed: Vec<SubjectOutcome>,
    /// Subjects that were already allocated or `cant_allocate` when the pass began.
    pub already_resolved: usize,
    /// Pending subjects the pass never reached. Non-zero only after an abort.
    pub untouched: usize,
}

impl PassReport {
    pub fn allocated_count(&self) -> usize {
        self.processed.iter().filter(|o| o.is_allocated()).count()
    }

    pub fn unallocatable_count(&self) -> usize {
        self.processed.len() - self.allocated_count()
    }
}

/// How a pass ended when the store stayed healthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every pending subject was visited.
    Completed(PassReport),
    /// The cancellation signal was observed before all subjects were visited.
    Aborted(PassReport),
}

impl PassOutcome {
    pub fn report(&self) -> &PassReport {
        match self {
            PassOutcome::Completed(report) | PassOutcome::Aborted(report) => report,
        }
    }

    pub fn into_report(self) -> PassReport {
        match self {
            PassOutcome::Completed(report) | PassOutcome::Aborted(report) => report,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, PassOutcome::Aborted(_))
    }
}

/// Split subjects into the pass's visiting order and a count of those
/// already resolved in this round.
///
/// Pending subjects are sorted by priority number ascending, then by
/// subject id ascending, so the same inputs always produce the same order.
pub fn pass_order(subjects: Vec<Subject>, records: &[AllocationRecord]) -> (Vec<Subject>, usize) {
    let resolved: HashMap<SubjectId, bool> = records
        .iter()
        .map(|r| (r.subject_id, r.is_resolved()))
        .collect();

    let (done, mut pending): (Vec<Subject>, Vec<Subject>) = subjects
        .into_iter()
        .partition(|s| resolved.get(&s.id).copied().unwrap_or(false));

    pending.sort_by_key(|s| (s.priority, s.id));
    (pending, done.len())
}

/// Runs allocation passes against an `AllocationStore`.
pub struct Scheduler<S> {
    store: Arc<S>,
}

impl<S: AllocationStore> Scheduler<S> {
    /// Create a new scheduler.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Run one pass over the round's unresolved subjects.
    ///
    /// `cancel` is checked before each subject. A store failure stops the
    /// pass immediately; records written before the failure are kept.
    pub async fn schedule_round(
        &self,
        round_id: RoundId,
        cancel: &watch::Receiver<bool>,
    ) -> SchedulerResult<PassOutcome> {
        let result = self.run_pass(round_id, cancel).await;
        if let Err(e) = &result {
            error!(round_id, error = %e, "allocation pass failed");
        }
        result
    }

    async fn run_pass(
        &self,
        round_id: RoundId,
        cancel: &watch::Receiver<bool>,
    ) -> SchedulerResult<PassOutcome> {
        if self.store.get_round(round_id)?.is_none() {
            return Err(SchedulerError::RoundNotFound(round_id));
        }
        tokio::task::yield_now().await;

        let subjects = self.store.list_subjects()?;
        tokio::task::yield_now().await;
        let rooms = self.store.list_rooms()?;
        tokio::task::yield_now().await;
        let records = self.store.list_records(round_id)?;
        tokio::task::yield_now().await;

        let (pending, already_resolved) = pass_order(subjects, &records);
        let mut ledger = BudgetLedger::new(usage_for_round(&rooms, &records));
        let mut report = PassReport {
            round_id,
            processed: Vec::with_capacity(pending.len()),
            already_resolved,
            untouched: 0,
        };

        info!(
            round_id,
            pending = pending.len(),
            already_resolved,
            rooms = rooms.len(),
            "allocation pass started"
        );

        for (index, subject) in pending.iter().enumerate() {
            if *cancel.borrow() {
                report.untouched = pending.len() - index;
                info!(
                    round_id,
                    processed = report.processed.len(),
                    untouched = report.untouched,
                    "allocation pass aborted"
                );
                return Ok(PassOutcome::Aborted(report));
            }

            let outcome = self.schedule_subject(round_id, subject, &mut ledger)?;
            report.processed.push(outcome);
            tokio::task::yield_now().await;
        }

        info!(
            round_id,
            allocated = report.allocated_count(),
            unallocatable = report.unallocatable_count(),
            "allocation pass completed"
        );
        Ok(PassOutcome::Completed(report))
    }

    /// Match and commit a single subject. Not interruptible.
    fn schedule_subject(
        &self,
        round_id: RoundId,
        subject: &Subject,
        ledger: &mut BudgetLedger,
    ) -> SchedulerResult<SubjectOutcome> {
        let needs = subject_needs(subject);

        match ledger.propose(&needs) {
            Some(placement) => {
                let record = AllocationRecord::allocated(round_id, subject, placement.room_id);
                self.store.put_record(&record)?;
                ledger.commit(&placement);
                debug!(
                    round_id,
                    subject_id = subject.id,
                    room_id = placement.room_id,
                    priority = subject.priority,
                    remaining = ?ledger.remaining_hours(placement.room_id),
                    "subject allocated"
                );
                Ok(SubjectOutcome {
                    subject_id: subject.id,
                    priority: subject.priority,
                    room_id: Some(placement.room_id),
                    hours: subject.hours,
                })
            }
            None => {
                let record = AllocationRecord::unallocatable(round_id, subject);
                self.store.put_record(&record)?;
                warn!(
                    round_id,
                    subject_id = subject.id,
                    group_size = subject.group_size,
                    hours = subject.hours,
                    "no eligible room, subject marked cant_allocate"
                );
                Ok(SubjectOutcome {
                    subject_id: subject.id,
                    priority: subject.priority,
                    room_id: None,
                    hours: subject.hours,
                })
            }
        }
    }
}
