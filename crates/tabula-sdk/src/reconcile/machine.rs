//! Reconciliation state machine
//!
//! ```text
//! Idle --Submitted--> Pending --PollIssued--> Indexing --PollResult(reflected)--> Converged
//!                                               |  ^
//!                                               |  +-- PollResult(not yet) / PollIssued
//!                                               +----- read error, timeout, abandon --> Failed
//! ```
//!
//! Terminal states absorb every further event, so a converged mutation
//! stays converged.

use super::pending::PendingMutation;
use crate::error::{Result, TabulaError};
use crate::submit::LogEntryId;
use crate::traits::{EntityRef, IndexedEntity};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationState {
    Idle,
    Pending,
    Indexing,
    Converged,
    Failed,
}

impl ReconciliationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconciliationState::Converged | ReconciliationState::Failed)
    }
}

impl std::fmt::Display for ReconciliationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReconciliationState::Idle => "idle",
            ReconciliationState::Pending => "pending",
            ReconciliationState::Indexing => "indexing",
            ReconciliationState::Converged => "converged",
            ReconciliationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    /// The write confirmed and its log entry id is known
    Submitted(LogEntryId),
    /// A read against the index was started
    PollIssued,
    /// The outstanding read finished
    PollResult(Result<Option<IndexedEntity>>),
    /// The caller now cares about a different entity
    Retarget(EntityRef),
    /// The caller no longer cares
    Abandon,
    /// Waiting exceeded the configured bound (seconds)
    TimedOut(u64),
}

impl ReconcileEvent {
    fn name(&self) -> &'static str {
        match self {
            ReconcileEvent::Submitted(_) => "submitted",
            ReconcileEvent::PollIssued => "poll_issued",
            ReconcileEvent::PollResult(_) => "poll_result",
            ReconcileEvent::Retarget(_) => "retarget",
            ReconcileEvent::Abandon => "abandon",
            ReconcileEvent::TimedOut(_) => "timed_out",
        }
    }
}

/// Observable status of one reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileStatus {
    pub state: ReconciliationState,
    pub is_converged: bool,
    pub loading: bool,
    pub error: Option<TabulaError>,
    pub log_entry_id: Option<LogEntryId>,
    pub polls: u32,
}

/// State machine for a single pending mutation
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pending: PendingMutation,
    state: ReconciliationState,
    in_flight: bool,
    polls: u32,
    error: Option<TabulaError>,
}

impl Reconciliation {
    pub fn new(pending: PendingMutation) -> Self {
        Self {
            pending,
            state: ReconciliationState::Idle,
            in_flight: false,
            polls: 0,
            error: None,
        }
    }

    pub fn state(&self) -> ReconciliationState {
        self.state
    }

    pub fn pending(&self) -> &PendingMutation {
        &self.pending
    }

    pub fn is_converged(&self) -> bool {
        self.state == ReconciliationState::Converged
    }

    /// Whether a read is outstanding
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn status(&self) -> ReconcileStatus {
        ReconcileStatus {
            state: self.state,
            is_converged: self.is_converged(),
            loading: matches!(
                self.state,
                ReconciliationState::Pending | ReconciliationState::Indexing
            ),
            error: self.error.clone(),
            log_entry_id: self.pending.log_entry_id().cloned(),
            polls: self.polls,
        }
    }

    /// Apply an event, returning the new state
    ///
    /// Fails with `InvalidTransition` when the event makes no sense in the
    /// current state (e.g. a second poll while one is outstanding); the
    /// state is left unchanged in that case.
    pub fn apply(&mut self, event: ReconcileEvent) -> Result<ReconciliationState> {
        use ReconcileEvent as E;
        use ReconciliationState as S;

        if self.state.is_terminal() {
            return Ok(self.state);
        }

        match (self.state, event) {
            (S::Idle, E::Submitted(id)) => {
                self.pending.bind(id);
                self.state = S::Pending;
            }

            (S::Pending, E::PollIssued) => {
                if self.pending.target().is_none() {
                    return Err(TabulaError::InvalidTransition(
                        "cannot start indexing without a target".into(),
                    ));
                }
                self.in_flight = true;
                self.polls += 1;
                self.state = S::Indexing;
            }

            (S::Indexing, E::PollIssued) => {
                if self.in_flight {
                    return Err(TabulaError::InvalidTransition(
                        "a poll is already outstanding".into(),
                    ));
                }
                self.in_flight = true;
                self.polls += 1;
            }

            (S::Indexing, E::PollResult(result)) => {
                if !self.in_flight {
                    return Err(TabulaError::InvalidTransition("no poll is outstanding".into()));
                }
                self.in_flight = false;
                match result {
                    Ok(observed) => {
                        if self.pending.is_reflected_by(observed.as_ref()) {
                            self.state = S::Converged;
                            info!(
                                log_entry_id = ?self.pending.log_entry_id().map(|id| id.as_str()),
                                polls = self.polls,
                                "Index converged"
                            );
                        } else {
                            debug!(polls = self.polls, "Index not caught up yet");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Index read failed");
                        self.fail(err);
                    }
                }
            }

            (_, E::Retarget(target)) => {
                if self.pending.target().as_ref() != Some(&target) {
                    debug!(target = %target, "Target changed, abandoning");
                    self.fail(TabulaError::Abandoned);
                }
            }

            (_, E::Abandon) => self.fail(TabulaError::Abandoned),

            (S::Pending | S::Indexing, E::TimedOut(secs)) => {
                warn!(timeout_secs = secs, "Index did not converge in time");
                self.fail(TabulaError::IndexingTimedOut(secs));
            }

            (state, event) => {
                return Err(TabulaError::InvalidTransition(format!(
                    "{} while {}",
                    event.name(),
                    state
                )));
            }
        }

        Ok(self.state)
    }

    fn fail(&mut self, err: TabulaError) {
        self.in_flight = false;
        self.error = Some(err);
        self.state = ReconciliationState::Failed;
    }
}
