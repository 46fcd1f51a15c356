//! Finalization planning.
//!
//! [`build_plan`] is the pure half of round finalization. It consumes the
//! round's submissions and produces either a complete plan (final value,
//! provenance, confidence, accepted set, outliers) or the reason the round
//! cannot finalize. The engine commits a plan to its state only after this
//! step succeeds, so a failed finalization mutates nothing.
//!
//! Value selection walks three bands by accepted-submission count:
//!
//! ```text
//! accepted >= min_valid_submissions   median of accepted values
//! accepted >= weighted_floor          weighted mean of accepted values
//! otherwise                           fallback value, if one is set
//! ```

use meridian_types::{bps, ReporterId, ValueSource, MAX_CONFIDENCE};

use crate::confidence::score;
use crate::config::ConsensusConfig;
use crate::median::median;
use crate::outliers::{trim, Outlier};
use crate::weighted::weighted_mean;
use crate::{ConsensusError, Result, WeightedValue};

/// A fully computed round outcome, ready to commit.
#[derive(Clone, Debug)]
pub struct FinalizationPlan {
    /// The finalized value.
    pub value: u64,
    /// How the value was derived.
    pub source: ValueSource,
    /// Confidence score for the value.
    pub confidence: u8,
    /// Reporters whose submissions were accepted, in submission order.
    pub accepted: Vec<ReporterId>,
    /// Excluded submissions, worst first.
    pub outliers: Vec<Outlier>,
    /// Change from the previous finalized value in basis points (zero when
    /// there is no previous value).
    pub delta_bps: u64,
}

/// Compute the outcome of a round from its weighted submissions.
///
/// `previous` is the feed's last finalized value, used for the global
/// change guard. `fallback` is the administrator-set substitute consulted
/// only when too few submissions survive trimming.
///
/// # Errors
///
/// - [`ConsensusError::NoSubmissions`] if `entries` is empty
/// - [`ConsensusError::InsufficientValidSubmissions`] if the accepted set
///   is below every floor and no fallback is set
/// - [`ConsensusError::RequiredReporterMissing`] if a required reporter
///   was trimmed (organic paths only)
/// - [`ConsensusError::DeltaTooHigh`] if the proposed value moves more
///   than `max_change_bps` from `previous`
/// - [`ConsensusError::ZeroTotalWeight`] / [`ConsensusError::Overflow`]
///   from the underlying arithmetic
pub fn build_plan(
    entries: &[WeightedValue],
    previous: Option<u64>,
    fallback: Option<u64>,
    config: &ConsensusConfig,
) -> Result<FinalizationPlan> {
    if entries.is_empty() {
        return Err(ConsensusError::NoSubmissions);
    }

    let split = trim(entries, config.outlier_threshold_bps)?;
    let accepted_values: Vec<u64> = split.accepted.iter().map(|e| e.value).collect();

    tracing::trace!(
        submissions = entries.len(),
        accepted = split.accepted.len(),
        outliers = split.outliers.len(),
        "round submissions trimmed"
    );

    let (value, source, confidence) = if split.accepted.len() >= config.min_valid_submissions {
        let value = median(&accepted_values)?;
        (value, ValueSource::Median, score(&accepted_values, value, config.min_confidence)?)
    } else if split.accepted.len() >= config.weighted_floor {
        let pairs: Vec<(u64, u64)> = split.accepted.iter().map(|e| (e.value, e.weight)).collect();
        let value = weighted_mean(&pairs)?;
        (
            value,
            ValueSource::WeightedMean,
            score(&accepted_values, value, config.min_confidence)?,
        )
    } else if let Some(fallback) = fallback {
        (fallback, ValueSource::Fallback, MAX_CONFIDENCE)
    } else {
        return Err(ConsensusError::InsufficientValidSubmissions {
            accepted: split.accepted.len(),
            floor: config.weighted_floor,
        });
    };

    // Required reporters bind organic consensus only; the fallback is an
    // administrator override.
    if source != ValueSource::Fallback {
        for required in &config.required_reporters {
            if !split.accepted.iter().any(|e| e.reporter == *required) {
                return Err(ConsensusError::RequiredReporterMissing {
                    reporter: *required,
                });
            }
        }
    }

    let delta_bps = match previous {
        Some(previous) => {
            let delta = bps::deviation(value, previous).ok_or(ConsensusError::Overflow)?;
            if delta > config.max_change_bps {
                return Err(ConsensusError::DeltaTooHigh {
                    previous,
                    proposed: value,
                    max_change_bps: config.max_change_bps,
                });
            }
            delta
        }
        None => 0,
    };

    Ok(FinalizationPlan {
        value,
        source,
        confidence,
        accepted: split.accepted.iter().map(|e| e.reporter).collect(),
        outliers: split.outliers,
        delta_bps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u8, value: u64) -> WeightedValue {
        WeightedValue {
            reporter: [id; 32],
            value,
            weight: 100,
        }
    }

    fn config() -> ConsensusConfig {
        ConsensusConfig::default()
    }

    #[test]
    fn test_median_path() {
        let entries = vec![entry(1, 100), entry(2, 102), entry(3, 104)];
        let plan = build_plan(&entries, None, None, &config()).expect("plan");

        assert_eq!(plan.value, 102);
        assert_eq!(plan.source, ValueSource::Median);
        assert_eq!(plan.accepted.len(), 3);
        assert!(plan.outliers.is_empty());
        assert_eq!(plan.delta_bps, 0);
    }

    #[test]
    fn test_even_accepted_count_averages_middles() {
        let entries = vec![entry(1, 100), entry(2, 102), entry(3, 104), entry(4, 106)];
        let plan = build_plan(&entries, None, None, &config()).expect("plan");
        assert_eq!(plan.value, 103);
    }

    #[test]
    fn test_outlier_excluded_then_median() {
        let entries = vec![entry(1, 100), entry(2, 100), entry(3, 100), entry(4, 150)];
        let plan = build_plan(&entries, None, None, &config()).expect("plan");

        assert_eq!(plan.value, 100);
        assert_eq!(plan.source, ValueSource::Median);
        assert_eq!(plan.outliers.len(), 1);
        assert_eq!(plan.outliers[0].reporter, [4u8; 32]);
        assert_eq!(plan.accepted.len(), 3);
    }

    #[test]
    fn test_degraded_weighted_mean_between_floors() {
        // Two survivors sit below the median floor of 3 but at the weighted
        // floor of 2.
        let entries = vec![
            WeightedValue { reporter: [1; 32], value: 100, weight: 100 },
            WeightedValue { reporter: [2; 32], value: 102, weight: 50 },
            entry(3, 400),
        ];
        let plan = build_plan(&entries, None, None, &config()).expect("plan");

        assert_eq!(plan.source, ValueSource::WeightedMean);
        // (100*100 + 102*50) / 150 = 100
        assert_eq!(plan.value, 100);
        assert_eq!(plan.outliers.len(), 1);
    }

    #[test]
    fn test_below_floor_without_fallback_fails() {
        let entries = vec![entry(1, 100), entry(2, 200), entry(3, 400)];
        let err = build_plan(&entries, None, None, &config()).unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::InsufficientValidSubmissions { accepted: 1, floor: 2 }
        ));
    }

    #[test]
    fn test_below_floor_with_fallback_substitutes() {
        let entries = vec![entry(1, 100), entry(2, 200), entry(3, 400)];
        let plan = build_plan(&entries, None, Some(120), &config()).expect("plan");

        assert_eq!(plan.value, 120);
        assert_eq!(plan.source, ValueSource::Fallback);
        assert_eq!(plan.confidence, MAX_CONFIDENCE);
        // The trimmed submissions are still reported as outliers.
        assert_eq!(plan.outliers.len(), 2);
    }

    #[test]
    fn test_delta_guard_blocks_large_move() {
        let entries = vec![entry(1, 115), entry(2, 115), entry(3, 115)];
        let err = build_plan(&entries, Some(100), None, &config()).unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::DeltaTooHigh { previous: 100, proposed: 115, max_change_bps: 1_000 }
        ));
    }

    #[test]
    fn test_delta_recorded_for_allowed_move() {
        let entries = vec![entry(1, 105), entry(2, 105), entry(3, 105)];
        let plan = build_plan(&entries, Some(100), None, &config()).expect("plan");
        assert_eq!(plan.delta_bps, 500);
    }

    #[test]
    fn test_delta_guard_applies_to_fallback() {
        let entries = vec![entry(1, 100), entry(2, 200), entry(3, 400)];
        let err = build_plan(&entries, Some(100), Some(500), &config()).unwrap_err();
        assert!(matches!(err, ConsensusError::DeltaTooHigh { .. }));
    }

    #[test]
    fn test_required_reporter_enforced() {
        let mut config = config();
        config.required_reporters = vec![[9u8; 32]];

        let entries = vec![entry(1, 100), entry(2, 100), entry(3, 100)];
        let err = build_plan(&entries, None, None, &config).unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::RequiredReporterMissing { reporter } if reporter == [9u8; 32]
        ));

        let entries = vec![entry(9, 100), entry(2, 100), entry(3, 100)];
        build_plan(&entries, None, None, &config).expect("required reporter present");
    }

    #[test]
    fn test_required_reporter_skipped_for_fallback() {
        let mut config = config();
        config.required_reporters = vec![[9u8; 32]];

        let entries = vec![entry(1, 100), entry(2, 200), entry(3, 400)];
        let plan = build_plan(&entries, None, Some(110), &config).expect("fallback plan");
        assert_eq!(plan.source, ValueSource::Fallback);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            build_plan(&[], None, None, &config()).unwrap_err(),
            ConsensusError::NoSubmissions
        ));
    }
}
