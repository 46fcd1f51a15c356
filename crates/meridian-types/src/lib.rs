//! # meridian-types
//!
//! Shared domain types used across the Meridian workspace.
//!
//! ## Modules
//!
//! - [`bps`] — basis-point fixed-point arithmetic

pub mod bps;

use serde::{Deserialize, Serialize};

/// Account identifier for reporters and administrative callers.
pub type AccountId = [u8; 32];

/// Reporters are identified by ordinary account ids.
pub type ReporterId = AccountId;

/// Feed identifier, assigned by the operator when the feed is created.
pub type FeedId = [u8; 16];

/// Monotonically increasing consensus round identifier.
pub type RoundId = u64;

/// Basis points per whole unit (1% = 100 bps).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Scale of reporter and feed weights (percent).
pub const WEIGHT_SCALE: u64 = 100;

/// Neutral starting reputation for a newly registered reporter.
pub const REPUTATION_BASELINE: u8 = 100;

/// Upper bound on reporter reputation.
pub const REPUTATION_CEILING: u8 = 100;

/// Upper bound on confidence scores.
pub const MAX_CONFIDENCE: u8 = 100;

/// Provenance of a finalized or aggregated value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSource {
    /// Median of the accepted submissions.
    Median,
    /// Weighted average of the accepted submissions (degraded mode).
    WeightedMean,
    /// Administrator-set fallback value.
    Fallback,
}
