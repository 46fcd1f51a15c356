//! Integration test: the thread-safe engine handle under contention.
//!
//! Exercises [`SharedOracle`] with concurrent writers and readers:
//! 1. Five reporters submit from five threads into one round
//! 2. Exactly one submission crosses the threshold and finalizes
//! 3. Query threads read consistent snapshots throughout
//! 4. Sequential contended rounds keep ids and the ledger coherent
//!
//! This test uses meridian-oracle (shared, engine), meridian-consensus
//! (config), meridian-types and rand.

use std::thread;

use meridian_consensus::config::ConsensusConfig;
use meridian_integration_tests::init_test_logging;
use meridian_oracle::auth::AllowAll;
use meridian_oracle::config::OracleConfig;
use meridian_oracle::engine::Oracle;
use meridian_oracle::feeds::FeedConfig;
use meridian_oracle::report::SubmitOutcome;
use meridian_oracle::round::Submission;
use meridian_oracle::shared::SharedOracle;
use meridian_types::{AccountId, FeedId, ReporterId, ValueSource};
use rand::Rng;

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

const ADMIN: AccountId = [0xAD; 32];
const FEED: FeedId = [0xF7; 16];

fn reporter(n: u8) -> ReporterId {
    [n; 32]
}

/// Helper: shared engine where a round needs all five reporters.
fn setup() -> SharedOracle {
    init_test_logging();
    let config = OracleConfig {
        consensus: ConsensusConfig {
            consensus_threshold: 5,
            ..ConsensusConfig::default()
        },
        ..OracleConfig::default()
    };
    let mut oracle =
        Oracle::new(config, Box::new(AllowAll)).expect("Engine construction should succeed");
    let feed_config = FeedConfig {
        min_update_interval: 60,
        max_deviation_bps: 2_000,
        heartbeat_interval: 300,
        stale_after: 3_600,
        weight: 100,
    };
    oracle
        .add_feed(&ADMIN, FEED, feed_config, BASE_TIME)
        .expect("Feed registration should succeed");
    for n in 1..=5 {
        oracle
            .add_reporter(&ADMIN, reporter(n), 100)
            .expect("Reporter registration should succeed");
    }
    SharedOracle::new(oracle)
}

/// Helper: submit a jittered honest value for reporter `n` at `now`.
fn jittered_submit(shared: &SharedOracle, n: u8, now: u64) -> SubmitOutcome {
    let value = rand::thread_rng().gen_range(100u64..=102);
    shared
        .submit(
            FEED,
            Submission {
                reporter: reporter(n),
                value,
                submitted_at: now,
                confidence: None,
            },
            now,
        )
        .expect("Concurrent submission should be accepted")
}

#[test]
fn shared_concurrent_round_finalizes_once() {
    let shared = setup();

    // =========================================================
    // Five writers race into the round while readers poll
    // =========================================================
    let writers: Vec<_> = (1..=5u8)
        .map(|n| {
            let shared = shared.clone();
            thread::spawn(move || jittered_submit(&shared, n, BASE_TIME))
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    // Reads may race the writers; they must never fail on
                    // the lock itself.
                    let _ = shared.final_value(&FEED, BASE_TIME);
                    let stats = shared.stats().expect("Stats should be readable");
                    assert!(
                        stats.submissions_accepted <= 5,
                        "Never more submissions than reporters"
                    );
                    assert!(stats.rounds_finalized <= 1, "At most one finalization");
                }
            })
        })
        .collect();

    let outcomes: Vec<SubmitOutcome> = writers
        .into_iter()
        .map(|handle| handle.join().expect("Writer thread should complete"))
        .collect();
    for handle in readers {
        handle.join().expect("Reader thread should complete");
    }

    // =========================================================
    // Exactly one writer observed the finalization
    // =========================================================
    let finalized = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Finalized(_)))
        .count();
    let pending = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Pending { .. }))
        .count();
    assert_eq!(finalized, 1, "The threshold crossing is unique");
    assert_eq!(pending, 4, "Every other writer saw a pending round");

    let report = outcomes
        .into_iter()
        .find_map(|o| match o {
            SubmitOutcome::Finalized(report) => Some(report),
            _ => None,
        })
        .expect("One outcome should carry the report");
    assert!(
        (100..=102).contains(&report.record.value),
        "The median stays inside the submitted band"
    );
    assert_eq!(report.record.source, ValueSource::Median);
    assert_eq!(report.record.accepted.len(), 5, "Jitter is inside the band");
    assert!(report.record.outliers.is_empty());

    let stats = shared.stats().expect("Stats should be readable");
    assert_eq!(stats.rounds_opened, 1);
    assert_eq!(stats.rounds_finalized, 1);
    assert_eq!(stats.submissions_accepted, 5);
    assert_eq!(stats.submissions_rejected, 0);

    let latest = shared
        .final_value(&FEED, BASE_TIME + 1)
        .expect("The finalized value should be readable");
    assert_eq!(latest.round_id, Some(1));
}

#[test]
fn shared_sequential_rounds_stay_coherent() {
    let shared = setup();

    // =========================================================
    // Three contended rounds, sixty seconds apart
    // =========================================================
    for round in 0..3u64 {
        let now = BASE_TIME + round * 60;
        let writers: Vec<_> = (1..=5u8)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || jittered_submit(&shared, n, now))
            })
            .collect();
        let outcomes: Vec<SubmitOutcome> = writers
            .into_iter()
            .map(|handle| handle.join().expect("Writer thread should complete"))
            .collect();
        let finalized = outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Finalized(_)))
            .count();
        assert_eq!(finalized, 1, "Each round finalizes exactly once");
    }

    // =========================================================
    // Ledger and counters reflect all three rounds
    // =========================================================
    let stats = shared.stats().expect("Stats should be readable");
    assert_eq!(stats.rounds_opened, 3);
    assert_eq!(stats.rounds_finalized, 3);
    assert_eq!(stats.submissions_accepted, 15);
    assert_eq!(stats.submissions_rejected, 0);

    let newest = shared
        .latest_record()
        .expect("Ledger should be readable")
        .expect("Three rounds should leave records");
    assert_eq!(newest.round_id, 3, "Round ids advance monotonically");

    for id in 1..=3 {
        let record = shared
            .round_record(id)
            .expect("Ledger should be readable")
            .expect("Every finalized round should be recorded");
        assert_eq!(record.round_id, id);
        assert!((100..=102).contains(&record.value));
    }

    // Honest jitter never costs reputation.
    let reporters = shared
        .active_reporters()
        .expect("Reporters should be readable");
    assert_eq!(reporters.len(), 5);
    for record in reporters {
        assert_eq!(record.reputation, 100);
        assert_eq!(record.error_count, 0);
    }
}
