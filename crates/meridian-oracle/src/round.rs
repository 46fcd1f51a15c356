//! Consensus round state machine.
//!
//! A round moves strictly forward:
//!
//! ```text
//! Open -> Finalizing -> Executed
//! ```
//!
//! `Open` collects submissions, `Finalizing` marks consensus in progress
//! so no late submission can slip into the set being aggregated, and
//! `Executed` is terminal: the final value and accepted set are written
//! exactly once. There are no backward transitions; a round that cannot
//! reach consensus is abandoned by the engine and a fresh id is allocated
//! for subsequent activity.

use meridian_types::{FeedId, ReporterId, RoundId};
use serde::{Deserialize, Serialize};

use crate::{OracleError, Result};

/// Lifecycle state of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// Accepting submissions.
    Open,
    /// Consensus computation in progress.
    Finalizing,
    /// Finalized value committed. Terminal.
    Executed,
}

impl RoundState {
    /// Stable name for error reporting.
    pub fn name(self) -> &'static str {
        match self {
            RoundState::Open => "open",
            RoundState::Finalizing => "finalizing",
            RoundState::Executed => "executed",
        }
    }
}

/// One reporter's contribution to a round.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Submission {
    /// Submitting reporter.
    pub reporter: ReporterId,
    /// Reported value in the feed's integer encoding.
    pub value: u64,
    /// Reporter-declared observation time.
    pub submitted_at: u64,
    /// Optional self-declared confidence (0..=100).
    pub confidence: Option<u8>,
}

/// A single consensus round for one feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
    /// Globally unique round id.
    pub id: RoundId,
    /// Feed this round belongs to.
    pub feed: FeedId,
    /// Current lifecycle state.
    pub state: RoundState,
    /// Unix timestamp at which the round opened.
    pub opened_at: u64,
    /// Unix timestamp of execution, once terminal.
    pub ended_at: Option<u64>,
    /// The committed value, once terminal.
    pub final_value: Option<u64>,
    /// Reporters whose submissions entered the final value, once terminal.
    pub accepted: Vec<ReporterId>,
    submissions: Vec<Submission>,
}

impl Round {
    /// Open a fresh round at `now`.
    pub fn open(id: RoundId, feed: FeedId, now: u64) -> Self {
        tracing::debug!(round = id, feed = ?feed, "round opened");
        Self {
            id,
            feed,
            state: RoundState::Open,
            opened_at: now,
            ended_at: None,
            final_value: None,
            accepted: Vec::new(),
            submissions: Vec::new(),
        }
    }

    /// Last instant at which submissions are accepted.
    pub fn deadline(&self, window: u64) -> u64 {
        self.opened_at.saturating_add(window)
    }

    /// Record a submission, returning the new submission count.
    ///
    /// # Errors
    ///
    /// - [`OracleError::AlreadyExecuted`] when the round is terminal
    /// - [`OracleError::InvalidState`] when finalization has started
    /// - [`OracleError::AlreadySubmitted`] for a repeat reporter
    pub fn record(&mut self, submission: Submission) -> Result<usize> {
        match self.state {
            RoundState::Open => {}
            RoundState::Executed => {
                return Err(OracleError::AlreadyExecuted { round_id: self.id });
            }
            RoundState::Finalizing => {
                return Err(OracleError::InvalidState {
                    expected: RoundState::Open.name(),
                    actual: self.state.name(),
                });
            }
        }
        if self.holds_slot(&submission.reporter) {
            return Err(OracleError::AlreadySubmitted { round_id: self.id });
        }
        self.submissions.push(submission);
        Ok(self.submissions.len())
    }

    /// Whether the reporter already submitted in this round.
    pub fn holds_slot(&self, reporter: &ReporterId) -> bool {
        self.submissions.iter().any(|s| s.reporter == *reporter)
    }

    /// Number of recorded submissions.
    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }

    /// Iterate over submissions in arrival order.
    pub fn submissions(&self) -> impl Iterator<Item = &Submission> {
        self.submissions.iter()
    }

    /// Move `Open -> Finalizing`.
    ///
    /// # Errors
    ///
    /// - [`OracleError::AlreadyExecuted`] when the round is terminal
    /// - [`OracleError::InvalidState`] for any other non-open state
    pub fn finalize(&mut self) -> Result<()> {
        match self.state {
            RoundState::Open => {
                self.state = RoundState::Finalizing;
                Ok(())
            }
            RoundState::Executed => Err(OracleError::AlreadyExecuted { round_id: self.id }),
            _ => Err(OracleError::InvalidState {
                expected: RoundState::Open.name(),
                actual: self.state.name(),
            }),
        }
    }

    /// Move `Finalizing -> Executed`, committing the final value and the
    /// accepted reporter set.
    ///
    /// # Errors
    ///
    /// - [`OracleError::AlreadyExecuted`] when the round is terminal
    /// - [`OracleError::InvalidState`] when finalization never started
    pub fn execute(&mut self, value: u64, accepted: Vec<ReporterId>, now: u64) -> Result<()> {
        match self.state {
            RoundState::Finalizing => {
                self.state = RoundState::Executed;
                self.final_value = Some(value);
                self.accepted = accepted;
                self.ended_at = Some(now);
                Ok(())
            }
            RoundState::Executed => Err(OracleError::AlreadyExecuted { round_id: self.id }),
            _ => Err(OracleError::InvalidState {
                expected: RoundState::Finalizing.name(),
                actual: self.state.name(),
            }),
        }
    }
}
