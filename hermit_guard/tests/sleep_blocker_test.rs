//! Sleep blocker behavior: presence of the call is the violation, not its
//! cost.

mod common;

use std::sync::Arc;
use std::time::Duration;

use hermit_guard::blocker::sleep::{SleepBlocker, checked_sleep};
use hermit_guard::blocker::{Access, ActivationContext, ResourceBlocker};
use hermit_guard::config::EnforcementMode;
use hermit_guard::error::HermeticityViolation;
use hermit_guard::size::TestSize;
use hermit_guard::violation::ViolationTracker;

fn activate(
    size: TestSize,
    mode: EnforcementMode,
    test_id: &str,
) -> (SleepBlocker, Arc<ViolationTracker>) {
    let tracker = Arc::new(ViolationTracker::new());
    let blocker = SleepBlocker::new();
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
fn small_strict_denies_a_timed_sleep() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(
        TestSize::Small,
        EnforcementMode::Strict,
        "tests::sleep::timed",
    );

    let err = checked_sleep(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, HermeticityViolation::Sleep { .. }));
    assert_eq!(tracker.summary().sleep, 1);
    blocker.deactivate().unwrap();
}

#[test]
fn zero_duration_sleep_is_still_a_violation() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(
        TestSize::Small,
        EnforcementMode::Strict,
        "tests::sleep::zero",
    );

    assert!(checked_sleep(Duration::ZERO).is_err());
    assert_eq!(tracker.summary().sleep, 1);
    blocker.deactivate().unwrap();
}

#[test]
fn warn_mode_suppresses_the_sleep() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(
        TestSize::Small,
        EnforcementMode::Warn,
        "tests::sleep::warn",
    );

    assert_eq!(
        checked_sleep(Duration::from_secs(2)).unwrap(),
        Access::Suppressed
    );
    assert_eq!(tracker.summary().sleep, 1);
    blocker.deactivate().unwrap();
}

#[test]
fn medium_allows_sleeps() {
    let _guard = common::serial();
    let (blocker, tracker) = activate(
        TestSize::Medium,
        EnforcementMode::Strict,
        "tests::sleep::medium",
    );

    assert_eq!(
        checked_sleep(Duration::from_secs(1)).unwrap(),
        Access::Allowed
    );
    assert_eq!(tracker.summary().total(), 0);
    blocker.deactivate().unwrap();
}
