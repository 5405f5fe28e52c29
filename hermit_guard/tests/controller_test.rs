//! Enforcement controller lifecycle: arming, fail-fast, warn diagnostics,
//! off-mode no-op, and mandatory cleanup.

mod common;

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hermit_guard::blocker::Access;
use hermit_guard::blocker::database::{DatabaseEngine, checked_db_connect};
use hermit_guard::blocker::filesystem::{FsOperation, checked_file_op};
use hermit_guard::blocker::network::checked_connect;
use hermit_guard::blocker::process::{SpawnKind, checked_spawn};
use hermit_guard::blocker::sleep::checked_sleep;
use hermit_guard::blocker::thread::{WorkerKind, note_worker_spawn};
use hermit_guard::config::EnforcementMode;
use hermit_guard::controller::{ControllerState, EnforcementController, TestContext};
use hermit_guard::error::{HermeticityViolation, StateError};
use hermit_guard::size::TestSize;
use hermit_guard::violation::{Severity, ViolationTracker};

#[test]
fn strict_fail_fast_stops_the_body_at_the_attempt() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::fail_fast", TestSize::Small);

    let mut reached_after_attempt = false;
    let (body_result, outcome) = controller
        .enforce(&ctx, || -> Result<(), HermeticityViolation> {
            checked_connect("api.example.com", 443)?;
            reached_after_attempt = true;
            Ok(())
        })
        .unwrap();

    assert!(body_result.is_err());
    assert!(!reached_after_attempt);
    assert_eq!(outcome.records.len(), 1);
    // The deny record already failed the test; no extra warning for it.
    assert!(outcome.warnings.is_empty());
}

#[test]
fn warn_mode_lets_the_test_complete_with_diagnostics() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Warn);
    let ctx = TestContext::new("tests::controller::warn", TestSize::Small);

    let (result, outcome) = controller
        .enforce(&ctx, || {
            let access = checked_file_op(Path::new("/tmp/out.txt"), FsOperation::Write).unwrap();
            assert_eq!(access, Access::Suppressed);
            "finished"
        })
        .unwrap();

    assert_eq!(result, "finished");
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, "filesystem");
    assert!(outcome.warnings[0].remediation.len() >= 2);
}

#[test]
fn off_mode_activates_nothing_and_records_nothing() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Off);
    let ctx = TestContext::new("tests::controller::off", TestSize::Small);

    let (_, outcome) = controller
        .enforce(&ctx, || {
            assert_eq!(
                checked_connect("api.example.com", 443).unwrap(),
                Access::Allowed
            );
            assert_eq!(
                checked_file_op(Path::new("/etc/hosts"), FsOperation::Read).unwrap(),
                Access::Allowed
            );
            assert_eq!(checked_sleep(Duration::from_secs(1)).unwrap(), Access::Allowed);
            note_worker_spawn(WorkerKind::Thread);
        })
        .unwrap();

    assert!(outcome.is_clean());
    assert!(outcome.warnings.is_empty());
    assert_eq!(controller.tracker().summary().total(), 0);
}

#[test]
fn small_strict_denied_database_scenario() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::db_scenario", TestSize::Small);

    let (result, _outcome) = controller
        .enforce(&ctx, || checked_db_connect(DatabaseEngine::Embedded, ":memory:"))
        .unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, HermeticityViolation::Database { .. }));
    assert!(err.to_string().contains(":memory:"));
}

#[test]
fn medium_strict_loopback_scenario_is_clean() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::medium_loopback", TestSize::Medium);

    let (result, outcome) = controller
        .enforce(&ctx, || checked_connect("127.0.0.1", 4317))
        .unwrap();

    assert_eq!(result.unwrap(), Access::Allowed);
    assert!(outcome.is_clean());
}

#[test]
fn strict_thread_monitoring_warns_but_does_not_fail() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::strict_threads", TestSize::Small);

    let (_, outcome) = controller
        .enforce(&ctx, || {
            note_worker_spawn(WorkerKind::Thread);
            note_worker_spawn(WorkerKind::Thread);
        })
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].severity, Severity::Monitor);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].descriptor.contains('2'));
}

#[test]
fn large_tests_skip_activation_entirely() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::large", TestSize::Large);

    let (_, outcome) = controller
        .enforce(&ctx, || {
            assert_eq!(
                checked_connect("api.example.com", 443).unwrap(),
                Access::Allowed
            );
            assert_eq!(
                checked_spawn("ls", &[], SpawnKind::Command).unwrap(),
                Access::Allowed
            );
        })
        .unwrap();
    assert!(outcome.is_clean());
}

#[test]
fn arming_twice_is_rejected() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Warn);
    let ctx = TestContext::new("tests::controller::nested", TestSize::Small);

    controller.arm(&ctx).unwrap();
    let err = controller
        .arm(&TestContext::new("tests::controller::other", TestSize::Small))
        .unwrap_err();
    assert!(matches!(err, StateError::AlreadyArmed { .. }));
    controller.disarm().unwrap();
}

#[test]
fn disarm_without_arm_is_rejected() {
    let controller = EnforcementController::new(EnforcementMode::Warn);
    assert!(matches!(controller.disarm(), Err(StateError::NotArmed)));
}

#[test]
fn panicking_body_still_restores_entry_points() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::panic", TestSize::Small);

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = controller.enforce(&ctx, || panic!("test body exploded"));
    }));
    assert!(result.is_err());

    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(
        checked_connect("api.example.com", 443).unwrap(),
        Access::Allowed
    );
}

#[test]
fn reset_recovers_a_leaked_window() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::leaked", TestSize::Small);

    controller.arm(&ctx).unwrap();
    // Teardown never reached disarm; the next test's setup resets instead.
    controller.reset();

    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(
        checked_connect("api.example.com", 443).unwrap(),
        Access::Allowed
    );

    // And a fresh window still works.
    let (_, outcome) = controller.enforce(&ctx, || ()).unwrap();
    assert!(outcome.is_clean());
}

#[test]
fn records_do_not_leak_across_tests() {
    let _guard = common::serial();
    let tracker = Arc::new(ViolationTracker::new());
    let controller = EnforcementController::with_tracker(EnforcementMode::Warn, tracker);

    let first = TestContext::new("tests::controller::first", TestSize::Small);
    let (_, first_outcome) = controller
        .enforce(&first, || {
            let _ = checked_connect("api.example.com", 443);
        })
        .unwrap();
    assert_eq!(first_outcome.records.len(), 1);

    let second = TestContext::new("tests::controller::second", TestSize::Small);
    let (_, second_outcome) = controller.enforce(&second, || ()).unwrap();
    assert!(second_outcome.is_clean());
}

#[test]
fn small_allow_list_context_is_ignored_by_design() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    // There is no escape hatch: handing a small test an allow-list changes
    // nothing.
    let ctx = TestContext::new("tests::controller::no_escape", TestSize::Small)
        .with_allowed_paths(vec![PathBuf::from("/work/fixtures")]);

    let (result, _) = controller
        .enforce(&ctx, || {
            checked_file_op(Path::new("/work/fixtures/data.json"), FsOperation::Read)
        })
        .unwrap();
    assert!(result.is_err());
}

#[test]
fn medium_allow_list_context_is_passed_through() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let ctx = TestContext::new("tests::controller::medium_paths", TestSize::Medium)
        .with_allowed_paths(vec![PathBuf::from("/var/data")]);

    // Medium filesystem policy is allow-everything, so this is moot in
    // practice, and the window stays clean either way.
    let (result, outcome) = controller
        .enforce(&ctx, || {
            checked_file_op(Path::new("/var/data/blob.bin"), FsOperation::Read)
        })
        .unwrap();
    assert_eq!(result.unwrap(), Access::Allowed);
    assert!(outcome.is_clean());
}
