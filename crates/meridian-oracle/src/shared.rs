//! Thread-safe engine wrapper.
//!
//! [`SharedOracle`] puts the engine behind an `Arc<RwLock>`: mutating
//! calls take the write lock, queries take the read lock. Finalized
//! values are immutable once written, so concurrent reads never observe
//! a half-committed round. Query methods return owned clones rather than
//! guards, which keeps lock scopes inside this module.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use meridian_types::{AccountId, FeedId, ReporterId, RoundId};

use crate::engine::Oracle;
use crate::fallback::FallbackValue;
use crate::feeds::{Feed, FeedConfig, HealthStatus};
use crate::history::RoundRecord;
use crate::report::{AggregatedData, FinalizedValue, OracleStats, SubmitOutcome};
use crate::reporters::Reporter;
use crate::round::{Round, Submission};
use crate::{OracleError, Result};

/// Cloneable handle to a lock-guarded [`Oracle`].
#[derive(Clone)]
pub struct SharedOracle {
    inner: Arc<RwLock<Oracle>>,
}

impl SharedOracle {
    /// Wrap an engine for shared use.
    pub fn new(oracle: Oracle) -> Self {
        Self {
            inner: Arc::new(RwLock::new(oracle)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Oracle>> {
        self.inner.read().map_err(|_| OracleError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Oracle>> {
        self.inner.write().map_err(|_| OracleError::LockPoisoned)
    }

    // ---- mutating calls (write lock) ----

    /// See [`Oracle::submit`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::submit`], plus [`OracleError::LockPoisoned`].
    pub fn submit(&self, feed: FeedId, submission: Submission, now: u64) -> Result<SubmitOutcome> {
        self.write()?.submit(feed, submission, now)
    }

    /// See [`Oracle::aggregate`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::aggregate`], plus [`OracleError::LockPoisoned`].
    pub fn aggregate(&self, feed_ids: &[FeedId], now: u64) -> Result<AggregatedData> {
        self.write()?.aggregate(feed_ids, now)
    }

    /// See [`Oracle::add_reporter`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::add_reporter`], plus [`OracleError::LockPoisoned`].
    pub fn add_reporter(&self, caller: &AccountId, id: ReporterId, weight: u8) -> Result<()> {
        self.write()?.add_reporter(caller, id, weight)
    }

    /// See [`Oracle::remove_reporter`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::remove_reporter`], plus [`OracleError::LockPoisoned`].
    pub fn remove_reporter(&self, caller: &AccountId, id: &ReporterId) -> Result<()> {
        self.write()?.remove_reporter(caller, id)
    }

    /// See [`Oracle::add_feed`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::add_feed`], plus [`OracleError::LockPoisoned`].
    pub fn add_feed(
        &self,
        caller: &AccountId,
        id: FeedId,
        config: FeedConfig,
        now: u64,
    ) -> Result<()> {
        self.write()?.add_feed(caller, id, config, now)
    }

    /// See [`Oracle::update_feed`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::update_feed`], plus [`OracleError::LockPoisoned`].
    pub fn update_feed(&self, caller: &AccountId, id: &FeedId, config: FeedConfig) -> Result<()> {
        self.write()?.update_feed(caller, id, config)
    }

    /// See [`Oracle::set_feed_active`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::set_feed_active`], plus [`OracleError::LockPoisoned`].
    pub fn set_feed_active(&self, caller: &AccountId, id: &FeedId, active: bool) -> Result<()> {
        self.write()?.set_feed_active(caller, id, active)
    }

    /// See [`Oracle::remove_feed`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::remove_feed`], plus [`OracleError::LockPoisoned`].
    pub fn remove_feed(&self, caller: &AccountId, id: &FeedId) -> Result<()> {
        self.write()?.remove_feed(caller, id)
    }

    /// See [`Oracle::set_fallback`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::set_fallback`], plus [`OracleError::LockPoisoned`].
    pub fn set_fallback(
        &self,
        caller: &AccountId,
        feed: FeedId,
        value: u64,
        now: u64,
    ) -> Result<()> {
        self.write()?.set_fallback(caller, feed, value, now)
    }

    /// See [`Oracle::clear_fallback`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::clear_fallback`], plus [`OracleError::LockPoisoned`].
    pub fn clear_fallback(&self, caller: &AccountId, feed: &FeedId) -> Result<()> {
        self.write()?.clear_fallback(caller, feed)
    }

    /// See [`Oracle::pause`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::pause`], plus [`OracleError::LockPoisoned`].
    pub fn pause(&self, caller: &AccountId) -> Result<()> {
        self.write()?.pause(caller)
    }

    /// See [`Oracle::resume`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::resume`], plus [`OracleError::LockPoisoned`].
    pub fn resume(&self, caller: &AccountId) -> Result<()> {
        self.write()?.resume(caller)
    }

    // ---- queries (read lock) ----

    /// See [`Oracle::final_value`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::final_value`], plus [`OracleError::LockPoisoned`].
    pub fn final_value(&self, feed: &FeedId, now: u64) -> Result<FinalizedValue> {
        self.read()?.final_value(feed, now)
    }

    /// See [`Oracle::feed_health`].
    ///
    /// # Errors
    ///
    /// As [`Oracle::feed_health`], plus [`OracleError::LockPoisoned`].
    pub fn feed_health(&self, feed: &FeedId, now: u64) -> Result<HealthStatus> {
        self.read()?.feed_health(feed, now)
    }

    /// See [`Oracle::reporter`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn reporter(&self, id: &ReporterId) -> Result<Option<Reporter>> {
        Ok(self.read()?.reporter(id).cloned())
    }

    /// See [`Oracle::active_reporters`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn active_reporters(&self) -> Result<Vec<Reporter>> {
        Ok(self.read()?.active_reporters().cloned().collect())
    }

    /// See [`Oracle::feed`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn feed(&self, id: &FeedId) -> Result<Option<Feed>> {
        Ok(self.read()?.feed(id).cloned())
    }

    /// See [`Oracle::round`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn round(&self, feed: &FeedId) -> Result<Option<Round>> {
        Ok(self.read()?.round(feed).cloned())
    }

    /// The most recent ledger record.
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn latest_record(&self) -> Result<Option<RoundRecord>> {
        Ok(self.read()?.history().latest().cloned())
    }

    /// The ledger record for one round, if still retained.
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn round_record(&self, round_id: RoundId) -> Result<Option<RoundRecord>> {
        Ok(self.read()?.history().get(round_id).cloned())
    }

    /// See [`Oracle::fallback_value`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn fallback_value(&self, feed: &FeedId) -> Result<Option<FallbackValue>> {
        Ok(self.read()?.fallback_value(feed).copied())
    }

    /// See [`Oracle::last_aggregate`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn last_aggregate(&self) -> Result<Option<AggregatedData>> {
        Ok(self.read()?.last_aggregate().cloned())
    }

    /// See [`Oracle::stats`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn stats(&self) -> Result<OracleStats> {
        Ok(self.read()?.stats())
    }

    /// See [`Oracle::is_paused`].
    ///
    /// # Errors
    ///
    /// [`OracleError::LockPoisoned`] when the lock is poisoned.
    pub fn is_paused(&self) -> Result<bool> {
        Ok(self.read()?.is_paused())
    }
}

// Compile-time check that the handle stays shareable across threads.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SharedOracle>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowAll;
    use crate::config::OracleConfig;

    const ADMIN: AccountId = [0xAA; 32];
    const NOW: u64 = 1_700_000_000;
    const FEED: FeedId = [1; 16];

    fn reporter(n: u8) -> ReporterId {
        [n; 32]
    }

    fn shared() -> SharedOracle {
        let oracle =
            Oracle::new(OracleConfig::default(), Box::new(AllowAll)).expect("valid config");
        let shared = SharedOracle::new(oracle);
        shared
            .add_feed(
                &ADMIN,
                FEED,
                FeedConfig {
                    min_update_interval: 60,
                    max_deviation_bps: 2_000,
                    heartbeat_interval: 600,
                    stale_after: 3_600,
                    weight: 50,
                },
                NOW,
            )
            .expect("add feed");
        for n in 1..=3 {
            shared
                .add_reporter(&ADMIN, reporter(n), 100)
                .expect("add reporter");
        }
        shared
    }

    #[test]
    fn test_threaded_submissions_finalize_once() {
        let oracle = shared();

        let handles: Vec<_> = (1..=3u8)
            .map(|n| {
                let oracle = oracle.clone();
                std::thread::spawn(move || {
                    let submission = Submission {
                        reporter: reporter(n),
                        value: 100 + u64::from(n),
                        submitted_at: NOW,
                        confidence: None,
                    };
                    oracle.submit(FEED, submission, NOW).expect("submit")
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread completed");
        }

        let stats = oracle.stats().expect("stats");
        assert_eq!(stats.rounds_finalized, 1);
        assert_eq!(stats.submissions_accepted, 3);

        let value = oracle.final_value(&FEED, NOW).expect("finalized value");
        assert_eq!(value.value, 102, "median of {{101,102,103}}");
        assert!(oracle.round(&FEED).expect("no poisoning").is_none());
        assert!(oracle.latest_record().expect("no poisoning").is_some());
    }

    #[test]
    fn test_queries_use_clones() {
        let oracle = shared();
        let listed = oracle.active_reporters().expect("reporters");
        assert_eq!(listed.len(), 3);
        assert!(oracle.reporter(&reporter(1)).expect("lookup").is_some());
        assert!(oracle.feed(&FEED).expect("lookup").is_some());
        assert!(oracle.last_aggregate().expect("lookup").is_none());
        assert!(!oracle.is_paused().expect("flag"));
    }
}
