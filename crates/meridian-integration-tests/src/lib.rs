//! Integration test crate for the Meridian oracle.
//!
//! This crate ships no production code. The library target only carries
//! shared test plumbing; the actual scenarios live under `tests/` and
//! exercise end-to-end flows across the workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p meridian-integration-tests
//! ```

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a tracing subscriber for test runs, once per process.
///
/// Honors `RUST_LOG`, defaulting to `info`. Engine logs become visible
/// with `RUST_LOG=debug cargo test -p meridian-integration-tests -- --nocapture`.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
