//! Timing validation wrapping an enforcement window.
//!
//! The timer is independent of the resource blockers: it measures the same
//! window and is evaluated after the body completes, never preemptively.

mod common;

use std::time::Duration;

use hermit_guard::config::EnforcementMode;
use hermit_guard::controller::{EnforcementController, TestContext};
use hermit_guard::error::HermeticityViolation;
use hermit_guard::size::TestSize;
use hermit_guard::timing::{TimeLimits, TimingValidator, WallTimer};

#[test]
fn clean_fast_test_passes_both_validators() {
    let _guard = common::serial();
    let controller = EnforcementController::new(EnforcementMode::Strict);
    let validator = TimingValidator::new(TimeLimits::default(), EnforcementMode::Strict);
    let ctx = TestContext::new("tests::timing::fast", TestSize::Small);
    let timer = WallTimer::new();

    timer.start();
    let (_, outcome) = controller.enforce(&ctx, || 2 + 2).unwrap();
    timer.stop().unwrap();

    assert!(outcome.is_clean());
    let elapsed = timer.duration().unwrap();
    assert!(
        validator
            .check(&ctx.test_id, ctx.size, elapsed)
            .unwrap()
            .is_none()
    );
}

#[test]
fn overrun_is_detected_after_completion_not_preemptively() {
    let limits = TimeLimits {
        small: Duration::from_millis(10),
        medium: Duration::from_millis(20),
        large: Duration::from_millis(30),
        xlarge: Duration::from_millis(30),
    };
    assert!(limits.validate().is_ok());
    let validator = TimingValidator::new(limits, EnforcementMode::Strict);

    let timer = WallTimer::new();
    timer.start();
    // The body runs to completion even though it blows the 10ms budget.
    std::thread::sleep(Duration::from_millis(30));
    timer.stop().unwrap();

    let err = validator
        .check("tests::timing::overrun", TestSize::Small, timer.duration().unwrap())
        .unwrap_err();
    match err {
        HermeticityViolation::Timing { elapsed, limit, .. } => {
            assert!(elapsed >= Duration::from_millis(30));
            assert_eq!(limit, Duration::from_millis(10));
        }
        other => panic!("expected timing violation, got {other:?}"),
    }
}

#[test]
fn warn_mode_overrun_produces_payload_with_duration() {
    let limits = TimeLimits {
        small: Duration::from_millis(1),
        ..TimeLimits::default()
    };
    let validator = TimingValidator::new(limits, EnforcementMode::Warn);

    let payload = validator
        .check("tests::timing::warned", TestSize::Small, Duration::from_millis(8))
        .unwrap()
        .unwrap();
    assert_eq!(payload.kind, "timing");
    assert!(payload.descriptor.contains("limit"));
    assert!(payload.remediation.len() >= 2);
}

#[test]
fn timer_reuse_across_windows() {
    let timer = WallTimer::new();
    for _ in 0..3 {
        timer.start();
        timer.stop().unwrap();
        assert!(timer.duration().unwrap() < Duration::from_secs(1));
    }
}
