//! Consensus parameters.
//!
//! Defaults mirror the reference deployment: rounds finalize at three
//! submissions, a 3% deviation band excludes outliers, and the finalized
//! value may move at most 10% between consecutive rounds.

use meridian_types::{ReporterId, MAX_CONFIDENCE};
use serde::{Deserialize, Serialize};

use crate::{ConsensusError, Result};

/// Default number of submissions that triggers a finalization attempt.
pub const DEFAULT_CONSENSUS_THRESHOLD: usize = 3;

/// Default minimum accepted submissions for the median path.
pub const DEFAULT_MIN_VALID_SUBMISSIONS: usize = 3;

/// Default floor for the degraded weighted-average path.
pub const DEFAULT_WEIGHTED_FLOOR: usize = 2;

/// Default outlier exclusion band in basis points (3%).
pub const DEFAULT_OUTLIER_THRESHOLD_BPS: u64 = 300;

/// Default cap on round-to-round value change in basis points (10%).
pub const DEFAULT_MAX_CHANGE_BPS: u64 = 1_000;

/// Default reputation reward for an accepted submission.
pub const DEFAULT_REWARD: u8 = 1;

/// Default reputation penalty for an excluded submission.
pub const DEFAULT_PENALTY: u8 = 5;

/// Default confidence floor.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 10;

/// Parameters governing round finalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Submission count at which finalization is attempted.
    pub consensus_threshold: usize,
    /// Minimum accepted submissions for the median path.
    pub min_valid_submissions: usize,
    /// Minimum accepted submissions for the degraded weighted-average path.
    pub weighted_floor: usize,
    /// Deviation from the round mean beyond which a submission is an outlier.
    pub outlier_threshold_bps: u64,
    /// Maximum round-to-round change of the finalized value.
    pub max_change_bps: u64,
    /// Reputation gained by each accepted reporter.
    pub reward: u8,
    /// Reputation lost by each outlier reporter.
    pub penalty: u8,
    /// Lower bound on confidence scores.
    pub min_confidence: u8,
    /// Reporters that must be in the accepted set for organic finalization.
    pub required_reporters: Vec<ReporterId>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: DEFAULT_CONSENSUS_THRESHOLD,
            min_valid_submissions: DEFAULT_MIN_VALID_SUBMISSIONS,
            weighted_floor: DEFAULT_WEIGHTED_FLOOR,
            outlier_threshold_bps: DEFAULT_OUTLIER_THRESHOLD_BPS,
            max_change_bps: DEFAULT_MAX_CHANGE_BPS,
            reward: DEFAULT_REWARD,
            penalty: DEFAULT_PENALTY,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            required_reporters: Vec::new(),
        }
    }
}

impl ConsensusConfig {
    /// Validate the parameter set.
    ///
    /// # Errors
    ///
    /// - [`ConsensusError::InvalidConfig`] naming the offending parameter
    pub fn validate(&self) -> Result<()> {
        if self.weighted_floor == 0 {
            return Err(ConsensusError::InvalidConfig(
                "weighted_floor must be at least 1".to_string(),
            ));
        }
        if self.min_valid_submissions < self.weighted_floor {
            return Err(ConsensusError::InvalidConfig(format!(
                "min_valid_submissions {} below weighted_floor {}",
                self.min_valid_submissions, self.weighted_floor
            )));
        }
        if self.consensus_threshold < self.min_valid_submissions {
            return Err(ConsensusError::InvalidConfig(format!(
                "consensus_threshold {} below min_valid_submissions {}",
                self.consensus_threshold, self.min_valid_submissions
            )));
        }
        if self.outlier_threshold_bps == 0 {
            return Err(ConsensusError::InvalidConfig(
                "outlier_threshold_bps must be at least 1".to_string(),
            ));
        }
        if self.max_change_bps == 0 {
            return Err(ConsensusError::InvalidConfig(
                "max_change_bps must be at least 1".to_string(),
            ));
        }
        if self.min_confidence > MAX_CONFIDENCE {
            return Err(ConsensusError::InvalidConfig(format!(
                "min_confidence {} above maximum {MAX_CONFIDENCE}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}
