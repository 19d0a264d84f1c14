//! Round lifecycle phases.
//!
//! The phase is stored next to the round so it survives restarts; the
//! orchestrator is the only writer.

use std::fmt;

/// Where a round is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// No pass has run since the last reset (or ever).
    #[default]
    Idle,
    /// A pass is in progress.
    Running,
    /// The last pass visited every pending subject.
    Completed,
    /// The last pass stopped early on request.
    Aborted,
    /// The last pass hit a store failure. Must be reset before restarting.
    Failed { reason: String },
}

impl RoundPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, RoundPhase::Running)
    }

    /// Terminal phases are left only through `reset` (or a resuming `start`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RoundPhase::Completed | RoundPhase::Aborted | RoundPhase::Failed { .. }
        )
    }

    /// Idle, Completed and Aborted rounds may start a pass.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            RoundPhase::Idle | RoundPhase::Completed | RoundPhase::Aborted
        )
    }

    pub fn can_reset(&self) -> bool {
        !self.is_running()
    }

    /// Phase to report for a round whose stored phase was written by an
    /// earlier process. A pass cannot outlive its process, so a stored
    /// Running phase means the pass was cut off.
    pub fn restored(self) -> Self {
        match self {
            RoundPhase::Running => RoundPhase::Failed {
                reason: "allocation pass interrupted by a restart".into(),
            },
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RoundPhase::Idle => "idle",
            RoundPhase::Running => "running",
            RoundPhase::Completed => "completed",
            RoundPhase::Aborted => "aborted",
            RoundPhase::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Failed { reason } => write!(f, "failed ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_rules() {
        assert!(RoundPhase::Idle.can_start());
        assert!(RoundPhase::Completed.can_start());
        assert!(RoundPhase::Aborted.can_start());
        assert!(!RoundPhase::Running.can_start());
        assert!(
            !RoundPhase::Failed {
                reason: "disk".into()
            }
            .can_start()
        );
    }

    #[test]
    fn only_running_blocks_reset() {
        assert!(!RoundPhase::Running.can_reset());
        assert!(RoundPhase::Idle.can_reset());
        assert!(
            RoundPhase::Failed {
                reason: "disk".into()
            }
            .can_reset()
        );
    }

    #[test]
    fn terminal_phases() {
        assert!(!RoundPhase::Idle.is_terminal());
        assert!(!RoundPhase::Running.is_terminal());
        assert!(RoundPhase::Completed.is_terminal());
        assert!(RoundPhase::Aborted.is_terminal());
    }

    #[test]
    fn restored_running_phase_becomes_failed() {
        assert!(matches!(
            RoundPhase::Running.restored(),
            RoundPhase::Failed { .. }
        ));
        assert_eq!(RoundPhase::Aborted.restored(), RoundPhase::Aborted);
        assert_eq!(RoundPhase::Idle.restored(), RoundPhase::Idle);
    }

    #[test]
    fn display_includes_failure_reason() {
        let phase = RoundPhase::Failed {
            reason: "store unavailable".into(),
        };
        assert_eq!(phase.to_string(), "failed (store unavailable)");
        assert_eq!(RoundPhase::Running.to_string(), "running");
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RoundPhase::Completed).unwrap(),
            "\"completed\""
        );
        let failed = serde_json::to_value(RoundPhase::Failed {
            reason: "x".into(),
        })
        .unwrap();
        assert_eq!(failed["failed"]["reason"], "x");
    }
}
