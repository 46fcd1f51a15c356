//! Feed registry and health classification.
//!
//! A feed is one named data stream (a price pair, a sensor channel) with
//! its own update cadence, deviation tolerance, and aggregation weight.
//! Health is derived from the age of the last finalized value against the
//! feed's heartbeat settings:
//!
//! ```text
//! age <= heartbeat_interval              Healthy
//! heartbeat_interval < age <= stale_after  Warning
//! age > stale_after, or never finalized    Stale
//! ```

use std::collections::BTreeMap;

use meridian_types::FeedId;
use serde::{Deserialize, Serialize};

use crate::{OracleError, Result};

/// Engine-wide bounds on per-feed update intervals, in seconds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct IntervalBounds {
    /// Smallest allowed `min_update_interval`.
    pub floor: u64,
    /// Largest allowed `min_update_interval`.
    pub ceiling: u64,
}

/// Per-feed configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Minimum seconds between finalized rounds.
    pub min_update_interval: u64,
    /// Largest tolerated deviation of a submission from the previous
    /// finalized value, in basis points.
    pub max_deviation_bps: u64,
    /// Age in seconds up to which the feed counts as healthy.
    pub heartbeat_interval: u64,
    /// Age in seconds beyond which the feed counts as stale.
    pub stale_after: u64,
    /// Relative weight in cross-feed aggregation (1..=100).
    pub weight: u8,
}

/// Smallest allowed feed weight.
pub const MIN_FEED_WEIGHT: u8 = 1;

/// Largest allowed feed weight.
pub const MAX_FEED_WEIGHT: u8 = 100;

impl FeedConfig {
    /// Validate against the engine's interval bounds.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::InvalidConfig`] when the update interval is
    /// outside `bounds`, the heartbeat ordering is inverted, or the
    /// deviation band is zero, and [`OracleError::InvalidWeight`] when the
    /// weight is outside `1..=100`.
    pub fn validate(&self, bounds: &IntervalBounds) -> Result<()> {
        if self.min_update_interval < bounds.floor || self.min_update_interval > bounds.ceiling {
            return Err(OracleError::InvalidConfig(format!(
                "min_update_interval {} outside bounds {}..={}",
                self.min_update_interval, bounds.floor, bounds.ceiling
            )));
        }
        if self.max_deviation_bps == 0 {
            return Err(OracleError::InvalidConfig(
                "max_deviation_bps must be positive".into(),
            ));
        }
        if self.heartbeat_interval == 0 || self.stale_after <= self.heartbeat_interval {
            return Err(OracleError::InvalidConfig(format!(
                "stale_after {} must exceed heartbeat_interval {}",
                self.stale_after, self.heartbeat_interval
            )));
        }
        if !(MIN_FEED_WEIGHT..=MAX_FEED_WEIGHT).contains(&self.weight) {
            return Err(OracleError::InvalidWeight {
                weight: self.weight,
                min: MIN_FEED_WEIGHT,
                max: MAX_FEED_WEIGHT,
            });
        }
        Ok(())
    }
}

/// Freshness classification of a feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Last value is within the heartbeat interval.
    Healthy,
    /// Last value missed a heartbeat but is not yet stale.
    Warning,
    /// Last value is older than `stale_after`, or no value exists.
    Stale,
}

/// A registered feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feed {
    /// The feed's identifier.
    pub id: FeedId,
    /// Current configuration.
    pub config: FeedConfig,
    /// Whether submissions are accepted.
    pub active: bool,
    /// Unix timestamp of registration.
    pub created_at: u64,
}

/// Classify feed freshness from the last finalization time.
pub fn health(config: &FeedConfig, last_finalized: Option<u64>, now: u64) -> HealthStatus {
    let Some(last) = last_finalized else {
        return HealthStatus::Stale;
    };
    let age = now.saturating_sub(last);
    if age <= config.heartbeat_interval {
        HealthStatus::Healthy
    } else if age <= config.stale_after {
        HealthStatus::Warning
    } else {
        HealthStatus::Stale
    }
}

/// Registry of feeds keyed by id.
#[derive(Debug, Default)]
pub struct FeedRegistry {
    feeds: BTreeMap<FeedId, Feed>,
}

impl FeedRegistry {
    /// Register a new feed.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::AlreadyExists`] when the id is taken.
    pub fn add(&mut self, id: FeedId, config: FeedConfig, now: u64) -> Result<()> {
        if self.feeds.contains_key(&id) {
            return Err(OracleError::AlreadyExists("feed"));
        }
        self.feeds.insert(
            id,
            Feed {
                id,
                config,
                active: true,
                created_at: now,
            },
        );
        tracing::info!(feed = ?id, "feed registered");
        Ok(())
    }

    /// Replace a feed's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::FeedNotSupported`] for unknown ids.
    pub fn update(&mut self, id: &FeedId, config: FeedConfig) -> Result<()> {
        let feed = self
            .feeds
            .get_mut(id)
            .ok_or(OracleError::FeedNotSupported(*id))?;
        feed.config = config;
        tracing::info!(feed = ?id, "feed config updated");
        Ok(())
    }

    /// Activate or deactivate a feed.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::FeedNotSupported`] for unknown ids.
    pub fn set_active(&mut self, id: &FeedId, active: bool) -> Result<()> {
        let feed = self
            .feeds
            .get_mut(id)
            .ok_or(OracleError::FeedNotSupported(*id))?;
        feed.active = active;
        tracing::info!(feed = ?id, active, "feed active flag changed");
        Ok(())
    }

    /// Drop a feed from the registry entirely.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::FeedNotSupported`] for unknown ids.
    pub fn remove(&mut self, id: &FeedId) -> Result<Feed> {
        let feed = self
            .feeds
            .remove(id)
            .ok_or(OracleError::FeedNotSupported(*id))?;
        tracing::info!(feed = ?id, "feed removed");
        Ok(feed)
    }

    /// Look up a feed.
    pub fn get(&self, id: &FeedId) -> Option<&Feed> {
        self.feeds.get(id)
    }

    /// Look up a feed, failing for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::FeedNotSupported`] for unknown ids.
    pub fn require_known(&self, id: &FeedId) -> Result<&Feed> {
        self.feeds.get(id).ok_or(OracleError::FeedNotSupported(*id))
    }

    /// Look up a feed that must be accepting submissions.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::FeedNotSupported`] for unknown or inactive
    /// feeds.
    pub fn require_active(&self, id: &FeedId) -> Result<&Feed> {
        self.feeds
            .get(id)
            .filter(|f| f.active)
            .ok_or(OracleError::FeedNotSupported(*id))
    }

    /// Iterate over all feeds in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.values()
    }

    /// Number of registered feeds.
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
