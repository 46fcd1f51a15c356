//! # meridian-oracle
//!
//! Reputation-weighted oracle engine.
//!
//! Independent reporters submit numeric observations for named feeds. The
//! engine collects submissions into strictly sequential consensus rounds,
//! finalizes each round through the trimmed-median consensus in
//! [`meridian_consensus`], penalizes outlier reporters, and serves
//! finalized values to downstream consumers together with a bounded
//! history of past rounds.
//!
//! ## Modules
//!
//! - [`auth`] — capability checks for administrative operations
//! - [`breaker`] — emergency pause and staleness checks
//! - [`config`] — engine configuration
//! - [`engine`] — the [`Oracle`](engine::Oracle) coordinator
//! - [`feeds`] — feed registry and health classification
//! - [`fallback`] — administrator-set fallback values
//! - [`history`] — bounded FIFO ledger of finalized rounds
//! - [`report`] — read models returned by the engine
//! - [`reporters`] — reporter registry and reputation
//! - [`round`] — consensus round state machine
//! - [`shared`] — thread-safe engine wrapper

pub mod auth;
pub mod breaker;
pub mod config;
pub mod engine;
pub mod fallback;
pub mod feeds;
pub mod history;
pub mod report;
pub mod reporters;
pub mod round;
pub mod shared;

use meridian_types::{FeedId, RoundId};

/// Error types for oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The caller lacks the capability for this operation.
    #[error("caller is not authorized for this operation")]
    Unauthorized,

    /// A submitted value, timestamp or confidence failed validation.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Engine or feed configuration is inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A reporter or feed weight is out of range.
    #[error("invalid weight {weight}: expected {min}..={max}")]
    InvalidWeight {
        /// The rejected weight.
        weight: u8,
        /// Smallest allowed weight.
        min: u8,
        /// Largest allowed weight.
        max: u8,
    },

    /// The open round's submission window has lapsed.
    #[error("submission window closed: round opened at {opened_at}, deadline {deadline}, now {now}")]
    SubmissionWindowClosed {
        /// When the round opened.
        opened_at: u64,
        /// Last instant at which submissions were accepted.
        deadline: u64,
        /// The rejected submission's clock.
        now: u64,
    },

    /// A new round would start sooner than the feed's minimum update interval.
    #[error("update too frequent: last finalized at {last_finalized}, minimum interval {min_interval}s, now {now}")]
    UpdateTooFrequent {
        /// When the feed last finalized.
        last_finalized: u64,
        /// The feed's minimum seconds between finalizations.
        min_interval: u64,
        /// The rejected submission's clock.
        now: u64,
    },

    /// The latest finalized value is older than the feed's staleness bound.
    #[error("stale data: last update {last_update}, now {current}, threshold {threshold}s")]
    StaleData {
        /// When the value was finalized.
        last_update: u64,
        /// The querying clock.
        current: u64,
        /// The feed's staleness threshold in seconds.
        threshold: u64,
    },

    /// A submission deviates too far from the previous finalized value.
    #[error("deviation too high: {value} is {deviation_bps} bps from {reference}, limit {max_bps}")]
    DeviationTooHigh {
        /// The rejected value.
        value: u64,
        /// The previous finalized value.
        reference: u64,
        /// Measured deviation in basis points.
        deviation_bps: u64,
        /// The feed's per-submission deviation limit.
        max_bps: u64,
    },

    /// Too few feeds carried fresh values for aggregation.
    #[error("insufficient valid feeds: have {have}, need {need}")]
    InsufficientValidFeeds {
        /// Feeds with fresh finalized values.
        have: usize,
        /// The configured aggregation floor.
        need: usize,
    },

    /// The reporter already holds a slot in the open round.
    #[error("reporter already submitted in round {round_id}")]
    AlreadySubmitted {
        /// The open round.
        round_id: RoundId,
    },

    /// The round has already been executed and is immutable.
    #[error("round {round_id} is already executed")]
    AlreadyExecuted {
        /// The executed round.
        round_id: RoundId,
    },

    /// The round is in the wrong state for this transition.
    #[error("invalid round state: expected {expected}, got {actual}")]
    InvalidState {
        /// The state the operation needs.
        expected: &'static str,
        /// The state the round is in.
        actual: &'static str,
    },

    /// The entry already exists.
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// Registering another reporter would exceed the configured maximum.
    #[error("capacity exceeded: {have} active, maximum {max}")]
    CapacityExceeded {
        /// Currently active entries.
        have: usize,
        /// The configured maximum.
        max: usize,
    },

    /// Removal would drop the active count below the configured floor.
    #[error("below minimum: {have} active, minimum {min}")]
    BelowMinimum {
        /// Currently active entries.
        have: usize,
        /// The configured minimum.
        min: usize,
    },

    /// The entry does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The feed is unknown or inactive.
    #[error("feed not supported: {0:?}")]
    FeedNotSupported(FeedId),

    /// The feed has no finalized value yet.
    #[error("no finalized data for feed {0:?}")]
    NoData(FeedId),

    /// The engine is paused.
    #[error("oracle is paused")]
    Paused,

    /// A thread panicked while holding the engine lock.
    #[error("engine lock poisoned")]
    LockPoisoned,

    /// Consensus computation failed.
    #[error(transparent)]
    Consensus(#[from] meridian_consensus::ConsensusError),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
