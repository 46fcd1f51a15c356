//! Basis-point fixed-point arithmetic.
//!
//! All deviation math is integer-only. The deviation between two values is
//! expressed in basis points:
//!
//! ```text
//! deviation(a, b) = |a - b| * 10_000 / b
//! ```
//!
//! The scaling step is computed in `u128`, so it cannot overflow for any
//! pair of `u64` inputs.

use crate::BPS_DENOMINATOR;

/// Compute the deviation of `value` from `reference` in basis points.
///
/// Returns `None` if `reference` is zero, or if the scaled result does not
/// fit in a `u64` (possible when `reference` is much smaller than `value`).
///
/// # Examples
///
/// ```
/// use meridian_types::bps;
///
/// assert_eq!(bps::deviation(103, 100), Some(300));
/// assert_eq!(bps::deviation(97, 100), Some(300));
/// assert_eq!(bps::deviation(100, 100), Some(0));
/// assert_eq!(bps::deviation(100, 0), None);
/// ```
pub fn deviation(value: u64, reference: u64) -> Option<u64> {
    if reference == 0 {
        return None;
    }
    let scaled = u128::from(value.abs_diff(reference)) * u128::from(BPS_DENOMINATOR);
    u64::try_from(scaled / u128::from(reference)).ok()
}

/// Convert basis points to whole percent, truncating toward zero.
pub fn to_percent(bps: u64) -> u64 {
    bps / 100
}
