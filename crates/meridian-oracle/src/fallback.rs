//! Administrative fallback values.
//!
//! A fallback is an operator-set value of last resort for one feed. It is
//! served when consensus cannot produce an organic value, and substituted
//! during finalization when too few submissions survive outlier
//! filtering. Setting one is loud in the logs; a fallback in use means
//! the reporter set is not doing its job.

use std::collections::BTreeMap;

use meridian_types::FeedId;
use serde::{Deserialize, Serialize};

/// An operator-provided substitute value.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FallbackValue {
    /// The substitute value.
    pub value: u64,
    /// Unix timestamp at which it was set.
    pub set_at: u64,
}

/// Per-feed store of fallback values.
#[derive(Debug, Default)]
pub struct FallbackProvider {
    values: BTreeMap<FeedId, FallbackValue>,
}

impl FallbackProvider {
    /// Set or replace the fallback for a feed.
    pub fn set(&mut self, feed: FeedId, value: u64, now: u64) {
        tracing::warn!(feed = ?feed, value, "fallback value set");
        self.values.insert(feed, FallbackValue { value, set_at: now });
    }

    /// Remove the fallback for a feed, returning the old value if any.
    pub fn clear(&mut self, feed: &FeedId) -> Option<FallbackValue> {
        let removed = self.values.remove(feed);
        if removed.is_some() {
            tracing::info!(feed = ?feed, "fallback value cleared");
        }
        removed
    }

    /// The full fallback record for a feed.
    pub fn get(&self, feed: &FeedId) -> Option<&FallbackValue> {
        self.values.get(feed)
    }

    /// Just the substitute value for a feed.
    pub fn value(&self, feed: &FeedId) -> Option<u64> {
        self.values.get(feed).map(|f| f.value)
    }

    /// Whether a fallback is configured for the feed.
    pub fn is_active(&self, feed: &FeedId) -> bool {
        self.values.contains_key(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let mut provider = FallbackProvider::default();
        let feed = [1; 16];
        assert!(!provider.is_active(&feed));
        assert!(provider.value(&feed).is_none());

        provider.set(feed, 4_200, 1_000);
        assert!(provider.is_active(&feed));
        assert_eq!(provider.value(&feed), Some(4_200));
        assert_eq!(provider.get(&feed).expect("record").set_at, 1_000);

        let cleared = provider.clear(&feed).expect("cleared");
        assert_eq!(cleared.value, 4_200);
        assert!(!provider.is_active(&feed));
        assert!(provider.clear(&feed).is_none());
    }

    #[test]
    fn test_set_replaces() {
        let mut provider = FallbackProvider::default();
        let feed = [1; 16];
        provider.set(feed, 100, 1_000);
        provider.set(feed, 150, 2_000);
        let record = provider.get(&feed).expect("record");
        assert_eq!(record.value, 150);
        assert_eq!(record.set_at, 2_000);
    }

    #[test]
    fn test_feeds_independent() {
        let mut provider = FallbackProvider::default();
        provider.set([1; 16], 100, 1_000);
        assert!(provider.is_active(&[1; 16]));
        assert!(!provider.is_active(&[2; 16]));
    }
}
