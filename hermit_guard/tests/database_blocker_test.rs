//! Database blocker behavior. The in-memory embedded case is the one teams
//! argue about: it is still a stateful dependency and small tests are denied.

mod common;

use std::sync::Arc;

use hermit_guard::blocker::database::{DatabaseBlocker, DatabaseEngine, checked_db_connect};
use hermit_guard::blocker::{Access, ActivationContext, ResourceBlocker};
use hermit_guard::config::EnforcementMode;
use hermit_guard::error::HermeticityViolation;
use hermit_guard::size::TestSize;
use hermit_guard::violation::ViolationTracker;

fn activate(
    size: TestSize,
    mode: EnforcementMode,
    test_id: &str,
) -> (DatabaseBlocker, Arc<ViolationTracker>) {
    let tracker = Arc::new(ViolationTracker::new());
    let blocker = DatabaseBlocker::new();
    blocker
        .activate(&ActivationContext::new(
            size,
            mode,
            test_id,
            Arc::clone(&tracker),
        ))
        .unwrap();
    (blocker, tracker)
}

#[test]
fn small_strict_denies_embedded_in_memory_engine() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(
        TestSize::Small,
        EnforcementMode::Strict,
        "tests::db::embedded",
    );

    let err = checked_db_connect(DatabaseEngine::Embedded, ":memory:").unwrap_err();
    match &err {
        HermeticityViolation::Database { engine, target, .. } => {
            assert_eq!(*engine, DatabaseEngine::Embedded);
            assert_eq!(target, ":memory:");
        }
        other => panic!("expected database violation, got {other:?}"),
    }
    assert!(err.to_string().contains(":memory:"));
    assert_eq!(tracker.summary().database, 1);
    blocker.deactivate().unwrap();
}

#[test]
fn small_strict_denies_every_engine_family() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(
        TestSize::Small,
        EnforcementMode::Strict,
        "tests::db::families",
    );

    for engine in [
        DatabaseEngine::Relational,
        DatabaseEngine::Document,
        DatabaseEngine::KeyValue,
        DatabaseEngine::Embedded,
    ] {
        assert!(checked_db_connect(engine, "localhost:5432/app").is_err());
    }
    assert_eq!(tracker.summary().database, 4);
    blocker.deactivate().unwrap();
}

#[test]
fn warn_mode_suppresses_the_connection() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(TestSize::Small, EnforcementMode::Warn, "tests::db::warn");

    assert_eq!(
        checked_db_connect(DatabaseEngine::Relational, "localhost:5432/app").unwrap(),
        Access::Suppressed
    );
    assert_eq!(tracker.summary().database, 1);
    blocker.deactivate().unwrap();
}

#[test]
fn medium_allows_connections() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(TestSize::Medium, EnforcementMode::Strict, "tests::db::medium");

    assert_eq!(
        checked_db_connect(DatabaseEngine::Relational, "localhost:5432/app").unwrap(),
        Access::Allowed
    );
    assert_eq!(tracker.summary().total(), 0);
    blocker.deactivate().unwrap();
}
