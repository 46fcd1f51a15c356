//! Confidence scoring.
//!
//! Confidence reflects how tightly the accepted submissions cluster around
//! the finalized value:
//!
//! ```text
//! confidence = 100 - to_percent(avg(|value_i - final| * 10_000 / final))
//! ```
//!
//! clamped to the configured floor. A round of identical submissions
//! scores the maximum of 100.

use meridian_types::{bps, MAX_CONFIDENCE};

use crate::{ConsensusError, Result};

/// Score the confidence of `final_value` against the accepted `values`.
///
/// # Errors
///
/// - [`ConsensusError::NoSubmissions`] if `values` is empty
/// - [`ConsensusError::Overflow`] if `final_value` is zero or a deviation
///   does not fit in a `u64`
pub fn score(values: &[u64], final_value: u64, min_confidence: u8) -> Result<u8> {
    if values.is_empty() {
        return Err(ConsensusError::NoSubmissions);
    }

    let mut total_bps: u128 = 0;
    for &value in values {
        let deviation =
            bps::deviation(value, final_value).ok_or(ConsensusError::Overflow)?;
        total_bps += u128::from(deviation);
    }
    let avg_bps = total_bps / values.len() as u128;

    // A 100% average deviation already floors the score; capping there
    // keeps both casts lossless.
    let capped_bps = avg_bps.min(u128::from(MAX_CONFIDENCE) * 100) as u64;
    let percent = bps::to_percent(capped_bps) as u8;

    Ok(MAX_CONFIDENCE.saturating_sub(percent).max(min_confidence))
}
