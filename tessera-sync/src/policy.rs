//! Reconciliation policy: the decision state machine.
//!
//! ```text
//! Evaluating ─┬─ clean or forced ──▶ NoConflict ──▶ Resolved(Overwrite)
//!             └─ modified/deleted ─▶ ConflictDetected ──▶ AwaitingDecision
//!
//! AwaitingDecision + Overwrite           ──▶ Resolved(Overwrite)
//!                  + BackupThenOverwrite ──▶ Resolved(BackupThenOverwrite)
//!                  + Skip                ──▶ Resolved(Skip)
//!                  + Cancel              ──▶ Cancelled          (interactive)
//!                                        ──▶ Resolved(Skip)     (bulk)
//! ```
//!
//! The machine never blocks and never touches the filesystem: it returns
//! the [`Action`] the driver has to carry out.

use std::fmt;
use std::str::FromStr;

use crate::detect::ChangeReport;
use crate::error::SyncError;

/// A caller's answer to a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Overwrite,
    BackupThenOverwrite,
    Skip,
    Cancel,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Overwrite => f.write_str("overwrite"),
            Decision::BackupThenOverwrite => f.write_str("backup"),
            Decision::Skip => f.write_str("skip"),
            Decision::Cancel => f.write_str("cancel"),
        }
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Decision::Overwrite),
            "backup" | "backup-then-overwrite" => Ok(Decision::BackupThenOverwrite),
            "skip" => Ok(Decision::Skip),
            "cancel" => Ok(Decision::Cancel),
            other => Err(format!(
                "unknown decision '{other}'; expected: overwrite, backup, skip, cancel"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Overwrite,
    BackupThenOverwrite,
    Skip,
}

impl Resolution {
    pub fn as_decision(self) -> Decision {
        match self {
            Resolution::Overwrite => Decision::Overwrite,
            Resolution::BackupThenOverwrite => Decision::BackupThenOverwrite,
            Resolution::Skip => Decision::Skip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Evaluating,
    NoConflict,
    ConflictDetected,
    AwaitingDecision,
    Resolved(Resolution),
    Cancelled,
}

/// Whether a `Cancel` ends the operation or only this artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Bulk,
}

/// What the driver must do for a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Write,
    BackupThenWrite,
    LeaveUntouched,
    Abort,
}

#[derive(Debug, Clone)]
pub struct ReconciliationPolicy {
    state: PolicyState,
    mode: Mode,
}

impl ReconciliationPolicy {
    pub fn new(mode: Mode) -> Self {
        Self {
            state: PolicyState::Evaluating,
            mode,
        }
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }

    pub fn is_awaiting_decision(&self) -> bool {
        self.state == PolicyState::AwaitingDecision
    }

    /// Feed the change report. Leaves the machine either resolved (no
    /// conflict) or awaiting a decision.
    pub fn evaluate(&mut self, report: &ChangeReport, force: bool) -> Result<PolicyState, SyncError> {
        if self.state != PolicyState::Evaluating {
            return Err(SyncError::InvalidTransition { state: self.state });
        }
        if force || report.is_clean() {
            self.transition(PolicyState::NoConflict);
            self.transition(PolicyState::Resolved(Resolution::Overwrite));
        } else {
            self.transition(PolicyState::ConflictDetected);
            self.transition(PolicyState::AwaitingDecision);
        }
        Ok(self.state)
    }

    /// Resume with the caller's decision and return the action to perform.
    pub fn decide(&mut self, decision: Decision) -> Result<Action, SyncError> {
        if self.state != PolicyState::AwaitingDecision {
            return Err(SyncError::InvalidTransition { state: self.state });
        }
        let next = match (decision, self.mode) {
            (Decision::Overwrite, _) => PolicyState::Resolved(Resolution::Overwrite),
            (Decision::BackupThenOverwrite, _) => PolicyState::Resolved(Resolution::BackupThenOverwrite),
            (Decision::Skip, _) | (Decision::Cancel, Mode::Bulk) => PolicyState::Resolved(Resolution::Skip),
            (Decision::Cancel, Mode::Interactive) => PolicyState::Cancelled,
        };
        self.transition(next);
        self.action()
            .ok_or(SyncError::InvalidTransition { state: self.state })
    }

    /// The action for a terminal state; `None` while still evaluating or waiting.
    pub fn action(&self) -> Option<Action> {
        match self.state {
            PolicyState::Resolved(Resolution::Overwrite) => Some(Action::Write),
            PolicyState::Resolved(Resolution::BackupThenOverwrite) => Some(Action::BackupThenWrite),
            PolicyState::Resolved(Resolution::Skip) => Some(Action::LeaveUntouched),
            PolicyState::Cancelled => Some(Action::Abort),
            _ => None,
        }
    }

    /// The decision that ended the machine, for reporting.
    pub fn decision_taken(&self) -> Option<Decision> {
        match self.state {
            PolicyState::Resolved(resolution) => Some(resolution.as_decision()),
            PolicyState::Cancelled => Some(Decision::Cancel),
            _ => None,
        }
    }

    fn transition(&mut self, next: PolicyState) {
        tracing::debug!(from = ?self.state, to = ?next, "policy transition");
        self.state = next;
    }
}
