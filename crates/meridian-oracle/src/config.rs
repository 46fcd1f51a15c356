//! Engine configuration.

use meridian_consensus::config::ConsensusConfig;
use meridian_types::MAX_CONFIDENCE;
use serde::{Deserialize, Serialize};

use crate::feeds::IntervalBounds;
use crate::{OracleError, Result};

/// Default minimum number of active reporters.
pub const DEFAULT_MIN_REPORTERS: usize = 3;

/// Default maximum number of active reporters.
pub const DEFAULT_MAX_REPORTERS: usize = 10;

/// Default reputation floor below which a reporter may not submit.
pub const DEFAULT_MIN_REPUTATION: u8 = 10;

/// Default error count at which a reporter is flagged slashable.
pub const DEFAULT_MAX_ERROR_COUNT: u32 = 10;

/// Default submission window per round, in seconds.
pub const DEFAULT_SUBMISSION_WINDOW: u64 = 300;

/// Default number of round records retained in the ledger.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// Default minimum number of fresh feeds for a cross-feed aggregate.
pub const DEFAULT_MIN_VALID_FEEDS: usize = 1;

/// Default smallest accepted per-feed update interval, in seconds.
pub const DEFAULT_INTERVAL_FLOOR: u64 = 60;

/// Default largest accepted per-feed update interval, in seconds.
pub const DEFAULT_INTERVAL_CEILING: u64 = 86_400;

/// Top-level engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Minimum active reporters; deregistration may not go below this.
    pub min_reporters: usize,
    /// Maximum active reporters.
    pub max_reporters: usize,
    /// Reputation floor for submission eligibility.
    pub min_reputation: u8,
    /// Error count at which a reporter is flagged slashable.
    pub max_error_count: u32,
    /// Seconds a round stays open after its first submission.
    pub submission_window: u64,
    /// Smallest accepted submission value.
    pub min_value: u64,
    /// Largest accepted submission value.
    pub max_value: u64,
    /// Capacity of the round-record ledger.
    pub history_capacity: usize,
    /// Minimum fresh feeds required by the cross-feed aggregate.
    pub min_valid_feeds: usize,
    /// Bounds each feed's `min_update_interval` must respect.
    pub interval_bounds: IntervalBounds,
    /// Consensus parameters shared by all feeds.
    pub consensus: ConsensusConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            min_reporters: DEFAULT_MIN_REPORTERS,
            max_reporters: DEFAULT_MAX_REPORTERS,
            min_reputation: DEFAULT_MIN_REPUTATION,
            max_error_count: DEFAULT_MAX_ERROR_COUNT,
            submission_window: DEFAULT_SUBMISSION_WINDOW,
            min_value: 1,
            max_value: u64::MAX,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            min_valid_feeds: DEFAULT_MIN_VALID_FEEDS,
            interval_bounds: IntervalBounds {
                floor: DEFAULT_INTERVAL_FLOOR,
                ceiling: DEFAULT_INTERVAL_CEILING,
            },
            consensus: ConsensusConfig::default(),
        }
    }
}

impl OracleConfig {
    /// Validate internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::InvalidConfig`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.min_reporters == 0 {
            return Err(OracleError::InvalidConfig(
                "min_reporters must be at least 1".into(),
            ));
        }
        if self.max_reporters < self.min_reporters {
            return Err(OracleError::InvalidConfig(format!(
                "max_reporters {} below min_reporters {}",
                self.max_reporters, self.min_reporters
            )));
        }
        if self.min_reputation > MAX_CONFIDENCE {
            return Err(OracleError::InvalidConfig(format!(
                "min_reputation {} exceeds 100",
                self.min_reputation
            )));
        }
        if self.max_error_count == 0 {
            return Err(OracleError::InvalidConfig(
                "max_error_count must be at least 1".into(),
            ));
        }
        if self.submission_window == 0 {
            return Err(OracleError::InvalidConfig(
                "submission_window must be positive".into(),
            ));
        }
        if self.min_value == 0 || self.min_value > self.max_value {
            return Err(OracleError::InvalidConfig(format!(
                "value range {}..={} is invalid",
                self.min_value, self.max_value
            )));
        }
        if self.history_capacity == 0 {
            return Err(OracleError::InvalidConfig(
                "history_capacity must be at least 1".into(),
            ));
        }
        if self.min_valid_feeds == 0 {
            return Err(OracleError::InvalidConfig(
                "min_valid_feeds must be at least 1".into(),
            ));
        }
        if self.interval_bounds.floor == 0
            || self.interval_bounds.floor > self.interval_bounds.ceiling
        {
            return Err(OracleError::InvalidConfig(format!(
                "interval bounds {}..={} are invalid",
                self.interval_bounds.floor, self.interval_bounds.ceiling
            )));
        }
        if self.consensus.consensus_threshold > self.max_reporters {
            return Err(OracleError::InvalidConfig(format!(
                "consensus_threshold {} exceeds max_reporters {}",
                self.consensus.consensus_threshold, self.max_reporters
            )));
        }
        self.consensus
            .validate()
            .map_err(|e| OracleError::InvalidConfig(e.to_string()))?;
        Ok(())
    }
}
