//! Reporter registry and reputation.
//!
//! Reporters are the semi-trusted identities allowed to submit values.
//! Each carries a reputation in `[0, 100]` that feeds directly into
//! consensus weighting: honest participation earns a point per accepted
//! submission, an outlier submission costs a fixed penalty. A reporter
//! whose error count reaches the configured maximum is flagged as
//! slashable; acting on that flag is the consumer's job, the engine only
//! raises it.
//!
//! Deregistered reporters stay in the registry as inactive records, so the
//! error history of an identity survives re-registration.

use std::collections::BTreeMap;

use meridian_types::{ReporterId, REPUTATION_BASELINE, REPUTATION_CEILING, WEIGHT_SCALE};
use serde::{Deserialize, Serialize};

use crate::{OracleError, Result};

/// Smallest allowed base weight for a reporter.
pub const MIN_REPORTER_WEIGHT: u8 = 1;

/// Largest allowed base weight for a reporter.
pub const MAX_REPORTER_WEIGHT: u8 = 100;

/// A registered reporting identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reporter {
    /// The reporter's account id.
    pub id: ReporterId,
    /// Whether the reporter may participate in rounds.
    pub active: bool,
    /// Administratively assigned base weight (1..=100).
    pub weight: u8,
    /// Dynamic reputation (0..=100), starting at the baseline.
    pub reputation: u8,
    /// Number of rounds in which this reporter was excluded as an outlier.
    pub error_count: u32,
    /// Unix timestamp of the last accepted submission.
    pub last_submission_at: Option<u64>,
}

impl Reporter {
    /// Effective aggregation weight: reputation scaled by the base weight.
    pub fn effective_weight(&self) -> u64 {
        u64::from(self.reputation) * u64::from(self.weight) / WEIGHT_SCALE
    }
}

/// Registry of reporters with configured active-count bounds.
#[derive(Debug)]
pub struct ReporterRegistry {
    reporters: BTreeMap<ReporterId, Reporter>,
    min_active: usize,
    max_active: usize,
}

impl ReporterRegistry {
    /// Create an empty registry with the given active-count bounds.
    pub fn new(min_active: usize, max_active: usize) -> Self {
        Self {
            reporters: BTreeMap::new(),
            min_active,
            max_active,
        }
    }

    /// Register a reporter, or reactivate a previously removed one.
    ///
    /// Reactivation restores the neutral baseline reputation but keeps the
    /// accumulated error count.
    ///
    /// # Errors
    ///
    /// - [`OracleError::AlreadyExists`] if the reporter is already active
    /// - [`OracleError::InvalidWeight`] if `weight` is outside `1..=100`
    /// - [`OracleError::CapacityExceeded`] at the configured maximum
    pub fn add(&mut self, id: ReporterId, weight: u8) -> Result<()> {
        if self.reporters.get(&id).is_some_and(|r| r.active) {
            return Err(OracleError::AlreadyExists("reporter"));
        }
        if !(MIN_REPORTER_WEIGHT..=MAX_REPORTER_WEIGHT).contains(&weight) {
            return Err(OracleError::InvalidWeight {
                weight,
                min: MIN_REPORTER_WEIGHT,
                max: MAX_REPORTER_WEIGHT,
            });
        }
        let active = self.active_count();
        if active >= self.max_active {
            return Err(OracleError::CapacityExceeded {
                have: active,
                max: self.max_active,
            });
        }

        match self.reporters.get_mut(&id) {
            Some(existing) => {
                existing.active = true;
                existing.weight = weight;
                existing.reputation = REPUTATION_BASELINE;
                tracing::info!(reporter = ?id, weight, error_count = existing.error_count, "reporter reactivated");
            }
            None => {
                self.reporters.insert(
                    id,
                    Reporter {
                        id,
                        active: true,
                        weight,
                        reputation: REPUTATION_BASELINE,
                        error_count: 0,
                        last_submission_at: None,
                    },
                );
                tracing::info!(reporter = ?id, weight, "reporter registered");
            }
        }
        Ok(())
    }

    /// Deactivate a reporter, clearing its weight and reputation. The
    /// error count stays on the record for audit.
    ///
    /// # Errors
    ///
    /// - [`OracleError::NotFound`] if the reporter is not active
    /// - [`OracleError::BelowMinimum`] if removal would drop the active
    ///   count below the configured floor
    pub fn remove(&mut self, id: &ReporterId) -> Result<()> {
        let active = self.active_count();
        let reporter = self
            .reporters
            .get_mut(id)
            .filter(|r| r.active)
            .ok_or(OracleError::NotFound("reporter"))?;
        if active <= self.min_active {
            return Err(OracleError::BelowMinimum {
                have: active,
                min: self.min_active,
            });
        }
        reporter.active = false;
        reporter.weight = 0;
        reporter.reputation = 0;
        tracing::info!(reporter = ?id, "reporter deactivated");
        Ok(())
    }

    /// Look up a reporter record, active or not.
    pub fn get(&self, id: &ReporterId) -> Option<&Reporter> {
        self.reporters.get(id)
    }

    /// Whether the reporter may submit: active with sufficient reputation.
    pub fn is_eligible(&self, id: &ReporterId, min_reputation: u8) -> bool {
        self.reporters
            .get(id)
            .is_some_and(|r| r.active && r.reputation >= min_reputation)
    }

    /// Iterate over active reporters in id order.
    pub fn active(&self) -> impl Iterator<Item = &Reporter> {
        self.reporters.values().filter(|r| r.active)
    }

    /// Number of active reporters.
    pub fn active_count(&self) -> usize {
        self.reporters.values().filter(|r| r.active).count()
    }

    /// Record an accepted submission time.
    pub fn touch(&mut self, id: &ReporterId, now: u64) {
        if let Some(reporter) = self.reporters.get_mut(id) {
            reporter.last_submission_at = Some(now);
        }
    }

    /// Reward an accepted reporter, capped at the reputation ceiling.
    pub fn reward(&mut self, id: &ReporterId, amount: u8) {
        if let Some(reporter) = self.reporters.get_mut(id) {
            reporter.reputation = reporter
                .reputation
                .saturating_add(amount)
                .min(REPUTATION_CEILING);
        }
    }

    /// Penalize an outlier reporter and bump its error count.
    ///
    /// Returns `true` when the error count has reached `max_errors` and the
    /// reporter should be flagged slashable.
    pub fn penalize(&mut self, id: &ReporterId, amount: u8, max_errors: u32) -> bool {
        let Some(reporter) = self.reporters.get_mut(id) else {
            return false;
        };
        reporter.reputation = reporter.reputation.saturating_sub(amount);
        reporter.error_count += 1;
        tracing::warn!(
            reporter = ?id,
            reputation = reporter.reputation,
            error_count = reporter.error_count,
            "reporter penalized as outlier"
        );
        if reporter.error_count >= max_errors {
            tracing::warn!(reporter = ?id, error_count = reporter.error_count, "reporter reached slashable error count");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> ReporterId {
        [n; 32]
    }

    #[test]
    fn test_register_starts_at_baseline() {
        let mut registry = ReporterRegistry::new(1, 10);
        registry.add(id(1), 100).expect("register");

        let reporter = registry.get(&id(1)).expect("lookup");
        assert!(reporter.active);
        assert_eq!(reporter.reputation, REPUTATION_BASELINE);
        assert_eq!(reporter.error_count, 0);
        assert_eq!(reporter.last_submission_at, None);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ReporterRegistry::new(1, 10);
        registry.add(id(1), 100).expect("register");
        assert!(matches!(
            registry.add(id(1), 100).unwrap_err(),
            OracleError::AlreadyExists("reporter")
        ));
    }

    #[test]
    fn test_weight_bounds() {
        let mut registry = ReporterRegistry::new(1, 10);
        assert!(matches!(
            registry.add(id(1), 0).unwrap_err(),
            OracleError::InvalidWeight { weight: 0, .. }
        ));
        assert!(matches!(
            registry.add(id(1), 101).unwrap_err(),
            OracleError::InvalidWeight { weight: 101, .. }
        ));
        registry.add(id(1), 1).expect("minimum weight");
        registry.add(id(2), 100).expect("maximum weight");
    }

    #[test]
    fn test_capacity_enforced() {
        let mut registry = ReporterRegistry::new(1, 2);
        registry.add(id(1), 100).expect("first");
        registry.add(id(2), 100).expect("second");
        assert!(matches!(
            registry.add(id(3), 100).unwrap_err(),
            OracleError::CapacityExceeded { have: 2, max: 2 }
        ));
    }

    #[test]
    fn test_remove_below_minimum_rejected() {
        let mut registry = ReporterRegistry::new(2, 10);
        registry.add(id(1), 100).expect("first");
        registry.add(id(2), 100).expect("second");
        assert!(matches!(
            registry.remove(&id(1)).unwrap_err(),
            OracleError::BelowMinimum { have: 2, min: 2 }
        ));

        registry.add(id(3), 100).expect("third");
        registry.remove(&id(1)).expect("above minimum");
        let removed = registry.get(&id(1)).expect("record kept");
        assert!(!removed.active);
        assert_eq!(removed.weight, 0);
        assert_eq!(removed.reputation, 0);
    }

    #[test]
    fn test_remove_unknown_rejected() {
        let mut registry = ReporterRegistry::new(1, 10);
        assert!(matches!(
            registry.remove(&id(1)).unwrap_err(),
            OracleError::NotFound("reporter")
        ));
    }

    #[test]
    fn test_reactivation_keeps_error_count() {
        let mut registry = ReporterRegistry::new(0, 10);
        registry.add(id(1), 100).expect("register");
        registry.penalize(&id(1), 5, 10);
        registry.penalize(&id(1), 5, 10);
        registry.remove(&id(1)).expect("remove");

        registry.add(id(1), 80).expect("reactivate");
        let reporter = registry.get(&id(1)).expect("lookup");
        assert!(reporter.active);
        assert_eq!(reporter.weight, 80);
        assert_eq!(reporter.reputation, REPUTATION_BASELINE);
        assert_eq!(reporter.error_count, 2);
    }

    #[test]
    fn test_reward_caps_at_ceiling() {
        let mut registry = ReporterRegistry::new(1, 10);
        registry.add(id(1), 100).expect("register");
        registry.reward(&id(1), 1);
        assert_eq!(registry.get(&id(1)).expect("lookup").reputation, 100);

        registry.penalize(&id(1), 5, 10);
        registry.reward(&id(1), 1);
        assert_eq!(registry.get(&id(1)).expect("lookup").reputation, 96);
    }

    #[test]
    fn test_penalize_floors_at_zero() {
        let mut registry = ReporterRegistry::new(1, 10);
        registry.add(id(1), 100).expect("register");
        for _ in 0..30 {
            registry.penalize(&id(1), 5, 100);
        }
        assert_eq!(registry.get(&id(1)).expect("lookup").reputation, 0);
        assert_eq!(registry.get(&id(1)).expect("lookup").error_count, 30);
    }

    #[test]
    fn test_penalize_signals_slashable() {
        let mut registry = ReporterRegistry::new(1, 10);
        registry.add(id(1), 100).expect("register");
        assert!(!registry.penalize(&id(1), 5, 3));
        assert!(!registry.penalize(&id(1), 5, 3));
        assert!(registry.penalize(&id(1), 5, 3));
        // Stays flagged on further errors.
        assert!(registry.penalize(&id(1), 5, 3));
    }

    #[test]
    fn test_eligibility() {
        let mut registry = ReporterRegistry::new(0, 10);
        registry.add(id(1), 100).expect("register");
        assert!(registry.is_eligible(&id(1), 10));
        assert!(!registry.is_eligible(&id(2), 10));

        for _ in 0..19 {
            registry.penalize(&id(1), 5, 100);
        }
        // Reputation is 5, below the floor of 10.
        assert!(!registry.is_eligible(&id(1), 10));

        registry.remove(&id(1)).expect("remove");
        assert!(!registry.is_eligible(&id(1), 0));
    }

    #[test]
    fn test_effective_weight() {
        let mut registry = ReporterRegistry::new(1, 10);
        registry.add(id(1), 100).expect("register");
        assert_eq!(registry.get(&id(1)).expect("lookup").effective_weight(), 100);

        registry.penalize(&id(1), 50, 100);
        assert_eq!(registry.get(&id(1)).expect("lookup").effective_weight(), 50);

        registry.add(id(2), 80).expect("register");
        registry.penalize(&id(2), 50, 100);
        // 50 reputation * 80 weight / 100 = 40.
        assert_eq!(registry.get(&id(2)).expect("lookup").effective_weight(), 40);
    }

    #[test]
    fn test_active_iteration() {
        let mut registry = ReporterRegistry::new(0, 10);
        registry.add(id(2), 100).expect("register");
        registry.add(id(1), 100).expect("register");
        registry.add(id(3), 100).expect("register");
        registry.remove(&id(2)).expect("remove");

        let ids: Vec<ReporterId> = registry.active().map(|r| r.id).collect();
        assert_eq!(ids, vec![id(1), id(3)]);
        assert_eq!(registry.active_count(), 2);
    }
}
