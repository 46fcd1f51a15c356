//! # meridian-consensus
//!
//! Consensus mathematics for the Meridian oracle.
//!
//! Submissions from independent reporters are combined into a single
//! trusted value in three steps: a reputation-weighted mean anchors the
//! round, values deviating too far from the anchor are trimmed away as
//! outliers (re-anchoring after each exclusion), and the median of the
//! surviving values becomes the canonical result:
//!
//! ```text
//! mean      = sum(value_i * weight_i) / sum(weight_i)
//! outlier   = |value - mean| * 10_000 / mean > outlier_threshold_bps
//! final     = median(accepted values)
//! ```
//!
//! Every function in this crate is pure: submissions and configuration in,
//! a result out, no internal state. The stateful half of finalization lives
//! in the engine crate, which commits a [`plan::FinalizationPlan`] only
//! after it validates.
//!
//! ## Modules
//!
//! - [`config`] — consensus parameters and validation
//! - [`weighted`] — weighted mean over (value, weight) pairs
//! - [`median`] — canonical median selection
//! - [`outliers`] — deviation-based outlier trimming
//! - [`confidence`] — confidence scoring for finalized values
//! - [`plan`] — full finalization plan (the pure half of round finalization)

pub mod confidence;
pub mod config;
pub mod median;
pub mod outliers;
pub mod plan;
pub mod weighted;

use meridian_types::ReporterId;

/// One reporter's submission with its effective aggregation weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedValue {
    /// The submitting reporter.
    pub reporter: ReporterId,
    /// The submitted value.
    pub value: u64,
    /// Effective weight (reputation scaled by the base weight).
    pub weight: u64,
}

/// Error types for consensus computation.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// No submissions were provided.
    #[error("no submissions to aggregate")]
    NoSubmissions,

    /// Every submission carried zero effective weight.
    #[error("total submission weight is zero")]
    ZeroTotalWeight,

    /// Too few submissions survived outlier exclusion.
    #[error("insufficient valid submissions: accepted {accepted}, floor {floor}")]
    InsufficientValidSubmissions {
        /// Number of submissions that survived exclusion.
        accepted: usize,
        /// Minimum number required to finalize.
        floor: usize,
    },

    /// A reporter marked as required did not survive outlier exclusion.
    #[error("required reporter missing from accepted set: {reporter:?}")]
    RequiredReporterMissing {
        /// The missing reporter.
        reporter: ReporterId,
    },

    /// The proposed value moves too far from the previous finalized value.
    #[error("delta too high: previous {previous}, proposed {proposed}, limit {max_change_bps} bps")]
    DeltaTooHigh {
        /// The previous finalized value.
        previous: u64,
        /// The proposed new value.
        proposed: u64,
        /// Maximum allowed change in basis points.
        max_change_bps: u64,
    },

    /// Consensus parameters are inconsistent.
    #[error("invalid consensus config: {0}")]
    InvalidConfig(String),

    /// Arithmetic overflow or division by zero in consensus math.
    #[error("arithmetic overflow in consensus computation")]
    Overflow,
}

/// Convenience result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;
