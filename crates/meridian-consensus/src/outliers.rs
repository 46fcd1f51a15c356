//! Deviation-based outlier trimming.
//!
//! Submissions are compared against the round's weighted mean. A value
//! deviating more than the configured threshold is excluded and its
//! reporter penalized:
//!
//! ```text
//! deviation_bps = |value - mean| * 10_000 / mean
//! ```
//!
//! Exclusion is iterative: only the single worst deviator is dropped per
//! pass and the mean is recomputed before the next check. One extreme value
//! therefore cannot drag the reference far enough to disqualify honest
//! submissions along with it.

use meridian_types::{bps, ReporterId};
use serde::{Deserialize, Serialize};

use crate::weighted::weighted_mean;
use crate::{ConsensusError, Result, WeightedValue};

/// A submission excluded from consensus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outlier {
    /// The reporter that submitted the excluded value.
    pub reporter: ReporterId,
    /// The excluded value.
    pub value: u64,
    /// Deviation from the round mean at the time of exclusion.
    pub deviation_bps: u64,
}

/// Result of splitting a round's submissions around the mean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    /// Submissions within the deviation band, in submission order.
    pub accepted: Vec<WeightedValue>,
    /// Excluded submissions, in exclusion order (worst first).
    pub outliers: Vec<Outlier>,
}

/// Split `entries` around a fixed `reference` in a single pass.
///
/// A deviation strictly greater than `threshold_bps` excludes the entry; a
/// deviation equal to the threshold is retained.
///
/// # Errors
///
/// - [`ConsensusError::Overflow`] if `reference` is zero or a deviation
///   does not fit in a `u64`
pub fn partition(
    entries: &[WeightedValue],
    reference: u64,
    threshold_bps: u64,
) -> Result<Partition> {
    let mut accepted = Vec::with_capacity(entries.len());
    let mut outliers = Vec::new();

    for entry in entries {
        let deviation_bps =
            bps::deviation(entry.value, reference).ok_or(ConsensusError::Overflow)?;
        if deviation_bps > threshold_bps {
            outliers.push(Outlier {
                reporter: entry.reporter,
                value: entry.value,
                deviation_bps,
            });
        } else {
            accepted.push(entry.clone());
        }
    }

    Ok(Partition { accepted, outliers })
}

/// Trim `entries` down to the set within `threshold_bps` of their own
/// weighted mean.
///
/// Each pass recomputes the weighted mean of the remaining entries and
/// excludes the single worst deviator beyond the threshold, until every
/// remaining entry is within the band. Ties go to the latest submission.
///
/// # Errors
///
/// - [`ConsensusError::NoSubmissions`] if `entries` is empty
/// - [`ConsensusError::ZeroTotalWeight`] if the remaining entries carry no
///   weight
/// - [`ConsensusError::Overflow`] on deviation overflow
pub fn trim(entries: &[WeightedValue], threshold_bps: u64) -> Result<Partition> {
    if entries.is_empty() {
        return Err(ConsensusError::NoSubmissions);
    }

    let mut remaining: Vec<WeightedValue> = entries.to_vec();
    let mut outliers = Vec::new();

    while !remaining.is_empty() {
        let pairs: Vec<(u64, u64)> = remaining.iter().map(|e| (e.value, e.weight)).collect();
        let mean = weighted_mean(&pairs)?;

        let split = partition(&remaining, mean, threshold_bps)?;
        if split.outliers.is_empty() {
            return Ok(Partition {
                accepted: remaining,
                outliers,
            });
        }

        let worst = split
            .outliers
            .iter()
            .max_by_key(|o| o.deviation_bps)
            .cloned()
            .ok_or(ConsensusError::Overflow)?;
        tracing::trace!(
            value = worst.value,
            deviation_bps = worst.deviation_bps,
            mean,
            "outlier trimmed"
        );
        remaining.retain(|e| e.reporter != worst.reporter);
        outliers.push(worst);
    }

    Ok(Partition {
        accepted: Vec::new(),
        outliers,
    })
}
