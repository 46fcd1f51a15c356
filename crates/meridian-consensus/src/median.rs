//! Canonical median selection.
//!
//! The median of the accepted submissions is the canonical final value of
//! a round. For an odd number of values it is the exact middle of the
//! sorted list; for an even number it is the truncating average of the two
//! middle values:
//!
//! ```text
//! median({100, 102, 104})      = 102
//! median({100, 102, 104, 106}) = 103
//! ```

use crate::{ConsensusError, Result};

/// Compute the median of `values`.
///
/// Input order does not matter; the values are sorted internally.
///
/// # Errors
///
/// - [`ConsensusError::NoSubmissions`] if `values` is empty
///
/// # Examples
///
/// ```
/// use meridian_consensus::median::median;
///
/// assert_eq!(median(&[104, 100, 102]).unwrap(), 102);
/// assert_eq!(median(&[100, 102, 104, 106]).unwrap(), 103);
/// ```
pub fn median(values: &[u64]) -> Result<u64> {
    if values.is_empty() {
        return Err(ConsensusError::NoSubmissions);
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid])
    } else {
        // Average of the two middle values; u128 avoids overflow near u64::MAX.
        let sum = u128::from(sorted[mid - 1]) + u128::from(sorted[mid]);
        Ok((sum / 2) as u64)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_odd_count() {
        assert_eq!(median(&[100, 102, 104]).expect("median"), 102);
    }

    #[test]
    fn test_even_count_averages_middles() {
        assert_eq!(median(&[100, 102, 104, 106]).expect("median"), 103);
    }

    #[test]
    fn test_single_value() {
        assert_eq!(median(&[42]).expect("median"), 42);
    }

    #[test]
    fn test_two_values() {
        assert_eq!(median(&[100, 102]).expect("median"), 101);
        // Truncates toward zero.
        assert_eq!(median(&[100, 101]).expect("median"), 100);
    }

    #[test]
    fn test_unsorted_input() {
        assert_eq!(median(&[104, 100, 102]).expect("median"), 102);
    }

    #[test]
    fn test_duplicates() {
        assert_eq!(median(&[100, 100, 100, 150]).expect("median"), 100);
    }

    #[test]
    fn test_near_max_does_not_overflow() {
        assert_eq!(
            median(&[u64::MAX, u64::MAX - 2]).expect("median"),
            u64::MAX - 1
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            median(&[]).unwrap_err(),
            ConsensusError::NoSubmissions
        ));
    }

    proptest! {
        #[test]
        fn prop_median_within_bounds(values in prop::collection::vec(0u64..u64::MAX, 1..64)) {
            let m = median(&values).expect("median");
            let min = *values.iter().min().expect("min");
            let max = *values.iter().max().expect("max");
            prop_assert!(m >= min && m <= max);
        }

        #[test]
        fn prop_odd_median_is_a_member(values in prop::collection::vec(0u64..u64::MAX, 1..64)) {
            prop_assume!(values.len() % 2 == 1);
            let m = median(&values).expect("median");
            prop_assert!(values.contains(&m));
        }

        #[test]
        fn prop_order_independent(mut values in prop::collection::vec(0u64..u64::MAX, 1..32)) {
            let forward = median(&values).expect("median");
            values.reverse();
            prop_assert_eq!(median(&values).expect("median"), forward);
        }
    }
}
