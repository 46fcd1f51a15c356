//! Bounded audit ledger of finalized rounds.
//!
//! Every executed round appends a [`RoundRecord`] carrying enough detail
//! to reconstruct the consensus decision later: who submitted, who was
//! accepted, which outliers were excluded and by how much. The ledger is
//! bounded; the oldest record is evicted once capacity is reached.

use std::collections::VecDeque;

use meridian_consensus::outliers::Outlier;
use meridian_types::{FeedId, ReporterId, RoundId, ValueSource};
use serde::{Deserialize, Serialize};

/// Immutable record of one finalized round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round id the record was produced by.
    pub round_id: RoundId,
    /// Feed the round served.
    pub feed: FeedId,
    /// Finalized value.
    pub value: u64,
    /// How the value was derived.
    pub source: ValueSource,
    /// Confidence score of the finalized value (0..=100).
    pub confidence: u8,
    /// Unix timestamp of finalization.
    pub finalized_at: u64,
    /// Total submissions considered.
    pub submissions: usize,
    /// Reporters whose values entered the final computation.
    pub accepted: Vec<ReporterId>,
    /// Excluded reporters with their deviations.
    pub outliers: Vec<Outlier>,
    /// Deviation from the previously finalized value, in basis points.
    pub delta_bps: u64,
}

/// FIFO ledger of round records with a fixed capacity.
#[derive(Debug)]
pub struct History {
    records: VecDeque<RoundRecord>,
    capacity: usize,
}

impl History {
    /// Create an empty ledger holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1_024)),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn push(&mut self, record: RoundRecord) {
        if self.records.len() >= self.capacity {
            if let Some(evicted) = self.records.pop_front() {
                tracing::debug!(
                    round = evicted.round_id,
                    feed = ?evicted.feed,
                    "evicted oldest round record"
                );
            }
        }
        self.records.push_back(record);
    }

    /// Record for a specific round id, if still retained.
    pub fn get(&self, round_id: RoundId) -> Option<&RoundRecord> {
        self.records.iter().find(|r| r.round_id == round_id)
    }

    /// Most recent record across all feeds.
    pub fn latest(&self) -> Option<&RoundRecord> {
        self.records.back()
    }

    /// Most recent record for one feed.
    pub fn latest_for(&self, feed: &FeedId) -> Option<&RoundRecord> {
        self.records.iter().rev().find(|r| r.feed == *feed)
    }

    /// Records in oldest-first order.
    pub fn iter(&self) -> impl Iterator<Item = &RoundRecord> {
        self.records.iter()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured maximum record count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
