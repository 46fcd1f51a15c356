//! Weighted mean over (value, weight) pairs.
//!
//! ```text
//! mean = sum(value_i * weight_i) / sum(weight_i)
//! ```
//!
//! Products and sums are accumulated in `u128`; the quotient always fits a
//! `u64` because the mean cannot exceed the largest input value.

use crate::{ConsensusError, Result};

/// Compute the weighted mean of `(value, weight)` pairs.
///
/// Entries with zero weight contribute nothing. The quotient truncates
/// toward zero.
///
/// # Errors
///
/// - [`ConsensusError::NoSubmissions`] if `pairs` is empty
/// - [`ConsensusError::ZeroTotalWeight`] if every weight is zero
/// - [`ConsensusError::Overflow`] if the accumulated sums overflow
///
/// # Examples
///
/// ```
/// use meridian_consensus::weighted::weighted_mean;
///
/// let mean = weighted_mean(&[(100, 1), (200, 1)]).unwrap();
/// assert_eq!(mean, 150);
///
/// // A heavier entry pulls the mean toward itself.
/// let mean = weighted_mean(&[(100, 3), (200, 1)]).unwrap();
/// assert_eq!(mean, 125);
/// ```
pub fn weighted_mean(pairs: &[(u64, u64)]) -> Result<u64> {
    if pairs.is_empty() {
        return Err(ConsensusError::NoSubmissions);
    }

    let mut weighted_sum: u128 = 0;
    let mut total_weight: u128 = 0;
    for &(value, weight) in pairs {
        weighted_sum = weighted_sum
            .checked_add(u128::from(value) * u128::from(weight))
            .ok_or(ConsensusError::Overflow)?;
        total_weight = total_weight
            .checked_add(u128::from(weight))
            .ok_or(ConsensusError::Overflow)?;
    }

    if total_weight == 0 {
        return Err(ConsensusError::ZeroTotalWeight);
    }

    let mean = weighted_sum / total_weight;

    // The mean is bounded by the largest input value, which is a u64.
    Ok(mean as u64)
}
