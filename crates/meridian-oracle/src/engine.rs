//! The oracle engine.
//!
//! [`Oracle`] owns every registry and all round state; mutation happens
//! only through its methods, so each call is atomic with respect to the
//! whole engine. Finalization runs synchronously inside the submission
//! that crosses the consensus threshold: the plan is computed pure first
//! and committed only when it validates, which keeps a failed
//! finalization from touching any state at all.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use meridian_consensus::plan::build_plan;
use meridian_consensus::{ConsensusError, WeightedValue};
use meridian_types::{bps, AccountId, FeedId, ReporterId, RoundId, ValueSource, MAX_CONFIDENCE};

use crate::auth::{AdminAction, Authorizer};
use crate::breaker::{self, Breaker};
use crate::config::OracleConfig;
use crate::fallback::{FallbackProvider, FallbackValue};
use crate::feeds::{self, Feed, FeedConfig, FeedRegistry, HealthStatus};
use crate::history::{History, RoundRecord};
use crate::report::{AggregatedData, FinalizationReport, FinalizedValue, OracleStats, SubmitOutcome};
use crate::reporters::{Reporter, ReporterRegistry};
use crate::round::{Round, Submission};
use crate::{OracleError, Result};

/// Single-owner oracle engine.
///
/// All mutating methods take `&mut self`; exclusive access is the
/// critical section. For concurrent callers, wrap the engine in
/// [`SharedOracle`](crate::shared::SharedOracle).
pub struct Oracle {
    config: OracleConfig,
    authorizer: Box<dyn Authorizer>,
    reporters: ReporterRegistry,
    feeds: FeedRegistry,
    rounds: BTreeMap<FeedId, Round>,
    latest: BTreeMap<FeedId, FinalizedValue>,
    history: History,
    fallback: FallbackProvider,
    breaker: Breaker,
    stats: OracleStats,
    next_round_id: RoundId,
    last_aggregate: Option<AggregatedData>,
}

impl Oracle {
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::InvalidConfig`] when the configuration is
    /// inconsistent.
    pub fn new(config: OracleConfig, authorizer: Box<dyn Authorizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reporters: ReporterRegistry::new(config.min_reporters, config.max_reporters),
            history: History::new(config.history_capacity),
            feeds: FeedRegistry::default(),
            rounds: BTreeMap::new(),
            latest: BTreeMap::new(),
            fallback: FallbackProvider::default(),
            breaker: Breaker::default(),
            stats: OracleStats::default(),
            next_round_id: 1,
            last_aggregate: None,
            authorizer,
            config,
        })
    }

    fn authorize(&self, caller: &AccountId, action: AdminAction) -> Result<()> {
        if !self.authorizer.authorize(caller, action) {
            return Err(OracleError::Unauthorized);
        }
        Ok(())
    }

    fn check_value(&self, value: u64) -> Result<()> {
        if value < self.config.min_value || value > self.config.max_value {
            return Err(OracleError::InvalidValue(format!(
                "value {} outside {}..={}",
                value, self.config.min_value, self.config.max_value
            )));
        }
        Ok(())
    }

    fn abandon_round(&mut self, feed: &FeedId, reason: &'static str) {
        if let Some(round) = self.rounds.remove(feed) {
            self.stats.rounds_abandoned += 1;
            tracing::warn!(
                round = round.id,
                feed = ?feed,
                submissions = round.submission_count(),
                reason,
                "round abandoned"
            );
        }
    }

    // ---- administration ----

    /// Register a reporter.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `ManageReporters`
    /// capability, otherwise as [`ReporterRegistry::add`].
    pub fn add_reporter(&mut self, caller: &AccountId, id: ReporterId, weight: u8) -> Result<()> {
        self.authorize(caller, AdminAction::ManageReporters)?;
        self.reporters.add(id, weight)
    }

    /// Deactivate a reporter.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `ManageReporters`
    /// capability, otherwise as [`ReporterRegistry::remove`].
    pub fn remove_reporter(&mut self, caller: &AccountId, id: &ReporterId) -> Result<()> {
        self.authorize(caller, AdminAction::ManageReporters)?;
        self.reporters.remove(id)
    }

    /// Register a feed.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `ManageFeeds` capability;
    /// validation and registry errors otherwise.
    pub fn add_feed(
        &mut self,
        caller: &AccountId,
        id: FeedId,
        config: FeedConfig,
        now: u64,
    ) -> Result<()> {
        self.authorize(caller, AdminAction::ManageFeeds)?;
        config.validate(&self.config.interval_bounds)?;
        self.feeds.add(id, config, now)
    }

    /// Replace a feed's configuration.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `ManageFeeds` capability;
    /// validation and registry errors otherwise.
    pub fn update_feed(
        &mut self,
        caller: &AccountId,
        id: &FeedId,
        config: FeedConfig,
    ) -> Result<()> {
        self.authorize(caller, AdminAction::ManageFeeds)?;
        config.validate(&self.config.interval_bounds)?;
        self.feeds.update(id, config)
    }

    /// Activate or deactivate a feed. Deactivation abandons the feed's
    /// open round.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `ManageFeeds` capability;
    /// [`OracleError::FeedNotSupported`] for unknown ids.
    pub fn set_feed_active(&mut self, caller: &AccountId, id: &FeedId, active: bool) -> Result<()> {
        self.authorize(caller, AdminAction::ManageFeeds)?;
        self.feeds.set_active(id, active)?;
        if !active {
            self.abandon_round(id, "feed deactivated");
        }
        Ok(())
    }

    /// Remove a feed entirely, dropping its open round, latest value, and
    /// fallback. Ledger records survive for audit.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `ManageFeeds` capability;
    /// [`OracleError::FeedNotSupported`] for unknown ids.
    pub fn remove_feed(&mut self, caller: &AccountId, id: &FeedId) -> Result<()> {
        self.authorize(caller, AdminAction::ManageFeeds)?;
        self.feeds.remove(id)?;
        self.abandon_round(id, "feed removed");
        self.latest.remove(id);
        self.fallback.clear(id);
        Ok(())
    }

    /// Set a feed's fallback value.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `SetFallback` capability;
    /// [`OracleError::FeedNotSupported`] for unknown feeds;
    /// [`OracleError::InvalidValue`] outside the sanity range.
    pub fn set_fallback(
        &mut self,
        caller: &AccountId,
        feed: FeedId,
        value: u64,
        now: u64,
    ) -> Result<()> {
        self.authorize(caller, AdminAction::SetFallback)?;
        self.feeds.require_known(&feed)?;
        self.check_value(value)?;
        self.fallback.set(feed, value, now);
        Ok(())
    }

    /// Clear a feed's fallback value. Clearing an absent fallback is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `SetFallback` capability.
    pub fn clear_fallback(&mut self, caller: &AccountId, feed: &FeedId) -> Result<()> {
        self.authorize(caller, AdminAction::SetFallback)?;
        self.fallback.clear(feed);
        Ok(())
    }

    /// Trip the pause breaker.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `Pause` capability.
    pub fn pause(&mut self, caller: &AccountId) -> Result<()> {
        self.authorize(caller, AdminAction::Pause)?;
        self.breaker.pause();
        Ok(())
    }

    /// Reset the pause breaker.
    ///
    /// # Errors
    ///
    /// [`OracleError::Unauthorized`] without the `Pause` capability.
    pub fn resume(&mut self, caller: &AccountId) -> Result<()> {
        self.authorize(caller, AdminAction::Pause)?;
        self.breaker.resume();
        Ok(())
    }

    // ---- submission and consensus ----

    /// Validate and record one reporter's submission for `feed`.
    ///
    /// Once the open round's count reaches the consensus threshold,
    /// finalization runs synchronously inside this call; the crossing
    /// submitter pays the aggregation cost.
    ///
    /// # Errors
    ///
    /// Checks run in a fixed order: [`OracleError::Paused`],
    /// [`OracleError::FeedNotSupported`], [`OracleError::Unauthorized`],
    /// [`OracleError::InvalidValue`],
    /// [`OracleError::SubmissionWindowClosed`] /
    /// [`OracleError::UpdateTooFrequent`],
    /// [`OracleError::AlreadySubmitted`],
    /// [`OracleError::DeviationTooHigh`]. A rejected submission leaves the
    /// round untouched.
    pub fn submit(
        &mut self,
        feed: FeedId,
        submission: Submission,
        now: u64,
    ) -> Result<SubmitOutcome> {
        match self.submit_inner(feed, submission, now) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.stats.submissions_rejected += 1;
                Err(err)
            }
        }
    }

    fn submit_inner(
        &mut self,
        feed: FeedId,
        submission: Submission,
        now: u64,
    ) -> Result<SubmitOutcome> {
        self.breaker.ensure_active()?;
        let feed_config = self.feeds.require_active(&feed)?.config;
        if !self
            .reporters
            .is_eligible(&submission.reporter, self.config.min_reputation)
        {
            return Err(OracleError::Unauthorized);
        }
        self.check_value(submission.value)?;
        if submission.submitted_at > now {
            return Err(OracleError::InvalidValue(format!(
                "timestamp {} is in the future (now {})",
                submission.submitted_at, now
            )));
        }
        if let Some(confidence) = submission.confidence {
            if confidence > MAX_CONFIDENCE {
                return Err(OracleError::InvalidValue(format!(
                    "confidence {confidence} exceeds {MAX_CONFIDENCE}"
                )));
            }
        }

        if let Some(round) = self.rounds.get(&feed) {
            let deadline = round.deadline(self.config.submission_window);
            if now > deadline {
                let opened_at = round.opened_at;
                self.abandon_round(&feed, "submission window lapsed");
                return Err(OracleError::SubmissionWindowClosed {
                    opened_at,
                    deadline,
                    now,
                });
            }
            if round.holds_slot(&submission.reporter) {
                return Err(OracleError::AlreadySubmitted { round_id: round.id });
            }
        } else if let Some(previous) = self.latest.get(&feed) {
            let next_allowed = previous
                .finalized_at
                .saturating_add(feed_config.min_update_interval);
            if now < next_allowed {
                return Err(OracleError::UpdateTooFrequent {
                    last_finalized: previous.finalized_at,
                    min_interval: feed_config.min_update_interval,
                    now,
                });
            }
        }

        // Gross-manipulation pre-filter against the last finalized value.
        if let Some(previous) = self.latest.get(&feed) {
            let deviation_bps =
                bps::deviation(submission.value, previous.value).unwrap_or(u64::MAX);
            if deviation_bps > feed_config.max_deviation_bps {
                return Err(OracleError::DeviationTooHigh {
                    value: submission.value,
                    reference: previous.value,
                    deviation_bps,
                    max_bps: feed_config.max_deviation_bps,
                });
            }
        }

        let round = match self.rounds.entry(feed) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let id = self.next_round_id;
                self.next_round_id += 1;
                self.stats.rounds_opened += 1;
                entry.insert(Round::open(id, feed, now))
            }
        };
        let count = round.record(submission)?;
        let round_id = round.id;
        self.reporters.touch(&submission.reporter, now);
        self.stats.submissions_accepted += 1;
        tracing::debug!(
            feed = ?feed,
            round = round_id,
            reporter = ?submission.reporter,
            value = submission.value,
            count,
            "submission recorded"
        );

        if count < self.config.consensus.consensus_threshold {
            return Ok(SubmitOutcome::Pending {
                round_id,
                submissions: count,
            });
        }

        match self.try_finalize(&feed, now) {
            Ok(report) => Ok(SubmitOutcome::Finalized(report)),
            Err(OracleError::Consensus(reason)) if is_deferrable(&reason) => {
                self.stats.finalizations_deferred += 1;
                tracing::debug!(feed = ?feed, round = round_id, %reason, "consensus deferred");
                Ok(SubmitOutcome::Deferred { round_id, reason })
            }
            Err(err) => Err(err),
        }
    }

    /// Finalize the feed's open round. Nothing is mutated unless the whole
    /// plan validates.
    fn try_finalize(&mut self, feed: &FeedId, now: u64) -> Result<FinalizationReport> {
        let round = self.rounds.get(feed).ok_or(OracleError::NotFound("round"))?;
        let entries: Vec<WeightedValue> = round
            .submissions()
            .map(|s| WeightedValue {
                reporter: s.reporter,
                value: s.value,
                weight: self
                    .reporters
                    .get(&s.reporter)
                    .map_or(0, |r| r.effective_weight()),
            })
            .collect();
        let previous = self.latest.get(feed).map(|v| v.value);
        let fallback = self.fallback.value(feed);

        let plan = build_plan(&entries, previous, fallback, &self.config.consensus)?;

        // The plan is valid; everything past this point is infallible
        // bookkeeping.
        let mut round = self
            .rounds
            .remove(feed)
            .ok_or(OracleError::NotFound("round"))?;
        round.finalize()?;
        round.execute(plan.value, plan.accepted.clone(), now)?;

        let record = RoundRecord {
            round_id: round.id,
            feed: *feed,
            value: plan.value,
            source: plan.source,
            confidence: plan.confidence,
            finalized_at: now,
            submissions: round.submission_count(),
            accepted: plan.accepted.clone(),
            outliers: plan.outliers.clone(),
            delta_bps: plan.delta_bps,
        };

        let mut slashable = Vec::new();
        for outlier in &plan.outliers {
            if self.reporters.penalize(
                &outlier.reporter,
                self.config.consensus.penalty,
                self.config.max_error_count,
            ) {
                slashable.push(outlier.reporter);
            }
        }
        for reporter in &plan.accepted {
            self.reporters.reward(reporter, self.config.consensus.reward);
        }

        if plan.source == ValueSource::Fallback {
            self.stats.fallback_served += 1;
            tracing::warn!(feed = ?feed, round = round.id, value = plan.value, "round finalized from fallback value");
        }
        self.latest.insert(
            *feed,
            FinalizedValue {
                value: plan.value,
                round_id: Some(round.id),
                finalized_at: now,
                confidence: plan.confidence,
                source: plan.source,
            },
        );
        self.history.push(record.clone());
        self.stats.rounds_finalized += 1;
        tracing::info!(
            feed = ?feed,
            round = round.id,
            value = plan.value,
            source = ?plan.source,
            confidence = plan.confidence,
            accepted = record.accepted.len(),
            outliers = record.outliers.len(),
            delta_bps = plan.delta_bps,
            "round finalized"
        );

        Ok(FinalizationReport { record, slashable })
    }

    // ---- aggregation and queries ----

    /// Combine the latest fresh values of several feeds into one
    /// feed-weighted snapshot, replacing the previous one.
    ///
    /// Inactive feeds are skipped. A feed without a fresh value
    /// contributes its fallback if one is set.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Paused`] while the breaker is tripped
    /// - [`OracleError::FeedNotSupported`] for unknown ids in the request
    /// - [`OracleError::InsufficientValidFeeds`] below the configured
    ///   floor
    pub fn aggregate(&mut self, feed_ids: &[FeedId], now: u64) -> Result<AggregatedData> {
        self.breaker.ensure_active()?;

        let mut pairs: Vec<(u64, u64)> = Vec::with_capacity(feed_ids.len());
        let mut contributing: Vec<FeedId> = Vec::with_capacity(feed_ids.len());
        let mut confidence = MAX_CONFIDENCE;
        let mut fallback_used = false;

        for id in feed_ids {
            let feed = self.feeds.require_known(id)?;
            if !feed.active || contributing.contains(id) {
                continue;
            }
            let feed_config = feed.config;
            let fresh = self
                .latest
                .get(id)
                .filter(|v| now.saturating_sub(v.finalized_at) <= feed_config.stale_after);
            match fresh {
                Some(value) => {
                    pairs.push((value.value, u64::from(feed_config.weight)));
                    confidence = confidence.min(value.confidence);
                    contributing.push(*id);
                }
                None => {
                    if let Some(fallback) = self.fallback.value(id) {
                        pairs.push((fallback, u64::from(feed_config.weight)));
                        fallback_used = true;
                        contributing.push(*id);
                    }
                }
            }
        }

        if pairs.len() < self.config.min_valid_feeds {
            return Err(OracleError::InsufficientValidFeeds {
                have: pairs.len(),
                need: self.config.min_valid_feeds,
            });
        }

        let weighted_value = meridian_consensus::weighted::weighted_mean(&pairs)?;
        let total_weight = pairs.iter().map(|(_, w)| w).sum();
        if fallback_used {
            self.stats.fallback_served += 1;
        }
        self.stats.aggregations += 1;

        let data = AggregatedData {
            weighted_value,
            total_weight,
            valid_feed_count: pairs.len(),
            computed_at: now,
            confidence,
            feeds: contributing,
        };
        tracing::info!(
            feeds = data.valid_feed_count,
            value = data.weighted_value,
            total_weight = data.total_weight,
            confidence = data.confidence,
            "aggregate computed"
        );
        self.last_aggregate = Some(data.clone());
        Ok(data)
    }

    /// The feed's latest finalized value, if still fresh. A stale or
    /// missing value is substituted by the feed's fallback when one is
    /// set.
    ///
    /// # Errors
    ///
    /// - [`OracleError::FeedNotSupported`] for unknown feeds
    /// - [`OracleError::NoData`] when nothing was ever finalized
    /// - [`OracleError::StaleData`] beyond the feed's `stale_after`
    pub fn final_value(&self, feed: &FeedId, now: u64) -> Result<FinalizedValue> {
        let feed_config = self.feeds.require_known(feed)?.config;
        match self.latest.get(feed) {
            Some(value) => {
                match breaker::check_fresh(value.finalized_at, now, feed_config.stale_after) {
                    Ok(()) => Ok(*value),
                    Err(stale) => self.fallback_view(feed).ok_or(stale),
                }
            }
            None => self.fallback_view(feed).ok_or(OracleError::NoData(*feed)),
        }
    }

    fn fallback_view(&self, feed: &FeedId) -> Option<FinalizedValue> {
        self.fallback.get(feed).map(|f| FinalizedValue {
            value: f.value,
            round_id: None,
            finalized_at: f.set_at,
            confidence: MAX_CONFIDENCE,
            source: ValueSource::Fallback,
        })
    }

    /// Freshness classification of a feed.
    ///
    /// # Errors
    ///
    /// [`OracleError::FeedNotSupported`] for unknown feeds.
    pub fn feed_health(&self, feed: &FeedId, now: u64) -> Result<HealthStatus> {
        let feed_config = self.feeds.require_known(feed)?.config;
        Ok(feeds::health(
            &feed_config,
            self.latest.get(feed).map(|v| v.finalized_at),
            now,
        ))
    }

    /// A reporter record, active or not.
    pub fn reporter(&self, id: &ReporterId) -> Option<&Reporter> {
        self.reporters.get(id)
    }

    /// Active reporters in id order.
    pub fn active_reporters(&self) -> impl Iterator<Item = &Reporter> {
        self.reporters.active()
    }

    /// A feed record.
    pub fn feed(&self, id: &FeedId) -> Option<&Feed> {
        self.feeds.get(id)
    }

    /// The feed's open round, if any.
    pub fn round(&self, feed: &FeedId) -> Option<&Round> {
        self.rounds.get(feed)
    }

    /// The round ledger.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Operational counters.
    pub fn stats(&self) -> OracleStats {
        self.stats
    }

    /// The snapshot of the most recent aggregation run.
    pub fn last_aggregate(&self) -> Option<&AggregatedData> {
        self.last_aggregate.as_ref()
    }

    /// The feed's fallback record, if set.
    pub fn fallback_value(&self, feed: &FeedId) -> Option<&FallbackValue> {
        self.fallback.get(feed)
    }

    /// Whether the pause breaker is tripped.
    pub fn is_paused(&self) -> bool {
        self.breaker.is_paused()
    }

    /// The engine configuration.
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }
}

/// Consensus failures that keep the round open instead of surfacing as an
/// engine error.
fn is_deferrable(reason: &ConsensusError) -> bool {
    matches!(
        reason,
        ConsensusError::InsufficientValidSubmissions { .. }
            | ConsensusError::RequiredReporterMissing { .. }
            | ConsensusError::DeltaTooHigh { .. }
            | ConsensusError::ZeroTotalWeight
    )
}
