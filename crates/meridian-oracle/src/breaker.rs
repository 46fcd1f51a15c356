//! Emergency pause switch and freshness guard.
//!
//! The breaker gates every mutating entry point of the engine. While
//! paused, submissions and admin mutations are refused but reads keep
//! working, so downstream consumers can still see the last good values
//! while operators investigate.

use crate::{OracleError, Result};

/// Manually operated pause switch.
#[derive(Debug, Default)]
pub struct Breaker {
    paused: bool,
}

impl Breaker {
    /// Fail when the breaker is tripped.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Paused`] while paused.
    pub fn ensure_active(&self) -> Result<()> {
        if self.paused {
            return Err(OracleError::Paused);
        }
        Ok(())
    }

    /// Trip the breaker. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            tracing::warn!("engine paused");
        }
        self.paused = true;
    }

    /// Reset the breaker. Idempotent.
    pub fn resume(&mut self) {
        if self.paused {
            tracing::info!("engine resumed");
        }
        self.paused = false;
    }

    /// Whether the breaker is tripped.
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Fail when `last_update` is older than `threshold` seconds at `now`.
///
/// # Errors
///
/// Returns [`OracleError::StaleData`] for values past the threshold.
pub fn check_fresh(last_update: u64, now: u64, threshold: u64) -> Result<()> {
    let age = now.saturating_sub(last_update);
    if age > threshold {
        return Err(OracleError::StaleData {
            last_update,
            current: now,
            threshold,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_starts_active() {
        let breaker = Breaker::default();
        assert!(!breaker.is_paused());
        breaker.ensure_active().expect("active");
    }

    #[test]
    fn test_pause_blocks_and_resume_restores() {
        let mut breaker = Breaker::default();
        breaker.pause();
        assert!(breaker.is_paused());
        assert!(matches!(
            breaker.ensure_active().unwrap_err(),
            OracleError::Paused
        ));

        breaker.resume();
        breaker.ensure_active().expect("resumed");
    }

    #[test]
    fn test_pause_is_idempotent() {
        let mut breaker = Breaker::default();
        breaker.pause();
        breaker.pause();
        assert!(breaker.is_paused());
        breaker.resume();
        breaker.resume();
        assert!(!breaker.is_paused());
    }

    #[test]
    fn test_freshness_boundary() {
        check_fresh(1_000, 1_000, 60).expect("same instant");
        check_fresh(1_000, 1_060, 60).expect("exactly at threshold");
        assert!(matches!(
            check_fresh(1_000, 1_061, 60).unwrap_err(),
            OracleError::StaleData {
                last_update: 1_000,
                current: 1_061,
                threshold: 60
            }
        ));
    }

    #[test]
    fn test_freshness_tolerates_future_timestamps() {
        // Clock skew: the update is ahead of the querying clock.
        check_fresh(2_000, 1_000, 60).expect("future update is fresh");
    }
}
