//! Read models returned by the engine.

use meridian_consensus::ConsensusError;
use meridian_types::{FeedId, ReporterId, RoundId, ValueSource};
use serde::{Deserialize, Serialize};

use crate::history::RoundRecord;

/// Result of an accepted submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The round is still collecting submissions.
    Pending {
        /// The open round.
        round_id: RoundId,
        /// Submissions recorded so far, including this one.
        submissions: usize,
    },
    /// This submission crossed the threshold and the round finalized.
    Finalized(FinalizationReport),
    /// The threshold was reached but consensus could not complete; the
    /// round stays open and nothing was mutated.
    Deferred {
        /// The still-open round.
        round_id: RoundId,
        /// Why finalization was not possible yet.
        reason: ConsensusError,
    },
}

/// Everything a consumer needs to act on a finalized round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalizationReport {
    /// The committed round record, as appended to the ledger.
    pub record: RoundRecord,
    /// Reporters whose error count reached the slashable maximum in this
    /// round. Acting on the signal is the caller's responsibility.
    pub slashable: Vec<ReporterId>,
}

/// The latest finalized value of a feed, plus provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedValue {
    /// The value itself.
    pub value: u64,
    /// Round that produced it; `None` for fallback-served values.
    pub round_id: Option<RoundId>,
    /// Unix timestamp of finalization (or of the fallback being set).
    pub finalized_at: u64,
    /// Confidence score (0..=100).
    pub confidence: u8,
    /// How the value was derived.
    pub source: ValueSource,
}

/// Snapshot produced by a cross-feed aggregation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedData {
    /// Feed-weighted mean over the contributing values.
    pub weighted_value: u64,
    /// Sum of the contributing feed weights.
    pub total_weight: u64,
    /// Number of feeds that contributed a value.
    pub valid_feed_count: usize,
    /// Unix timestamp of the aggregation run.
    pub computed_at: u64,
    /// Smallest confidence among the contributing values.
    pub confidence: u8,
    /// Ids of the contributing feeds, in request order.
    pub feeds: Vec<FeedId>,
}

/// Monotonic operational counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleStats {
    /// Rounds opened by a first submission.
    pub rounds_opened: u64,
    /// Rounds that reached a committed final value.
    pub rounds_finalized: u64,
    /// Rounds discarded (lapsed window, feed removed or deactivated).
    pub rounds_abandoned: u64,
    /// Threshold crossings where consensus deferred and the round stayed
    /// open.
    pub finalizations_deferred: u64,
    /// Submissions recorded into a round.
    pub submissions_accepted: u64,
    /// Submissions rejected by validation.
    pub submissions_rejected: u64,
    /// Finalizations and aggregations served from a fallback value.
    pub fallback_served: u64,
    /// Completed aggregation runs.
    pub aggregations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = OracleStats::default();
        assert_eq!(stats.rounds_opened, 0);
        assert_eq!(stats.submissions_rejected, 0);
        assert_eq!(stats.fallback_served, 0);
    }

    #[test]
    fn test_finalized_value_serde_round_trip() {
        let value = FinalizedValue {
            value: 4_200,
            round_id: Some(17),
            finalized_at: 1_700_000_000,
            confidence: 98,
            source: ValueSource::Median,
        };
        let json = serde_json::to_string(&value).expect("serialize");
        let back: FinalizedValue = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, value);
    }
}
