//! Wall-clock timing validation for the enforcement window.
//!
//! The timer wraps the same Armed window as the resource blockers but is
//! independent of them: it measures with a monotonic clock and compares
//! against the size's limit only after the test body has finished. Unlike
//! resource violations, which fail at the moment of attempted access, a
//! timing overrun never aborts the body.

use std::time::{Duration, Instant};

use hermit_common::state_machine::StateMachine;

use crate::config::EnforcementMode;
use crate::error::{ConfigError, HermeticityViolation, StateError};
use crate::size::TestSize;
use crate::violation::WarningPayload;

/// Timer lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Ready,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct TimerInner {
    state: TimerState,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

/// Monotonic wall-clock timer with a Ready/Running/Stopped state machine.
///
/// `start` is reusable: starting a non-ready timer resets it first, so one
/// timer instance serves many activate/deactivate cycles.
#[derive(Debug)]
pub struct WallTimer {
    inner: StateMachine<TimerInner>,
}

impl WallTimer {
    pub fn new() -> Self {
        Self {
            inner: StateMachine::new(TimerInner {
                state: TimerState::Ready,
                started: None,
                elapsed: None,
            }),
        }
    }

    pub fn state(&self) -> TimerState {
        self.inner.lock().state
    }

    /// Begin timing, resetting first if the timer was already used.
    pub fn start(&self) {
        self.inner.transition(|inner| {
            inner.state = TimerState::Running;
            inner.started = Some(Instant::now());
            inner.elapsed = None;
        });
    }

    /// Stop timing. Precondition: the timer is running.
    pub fn stop(&self) -> Result<(), StateError> {
        self.inner.transition(|inner| match inner.state {
            TimerState::Running => {
                let started = inner.started.ok_or(StateError::TimerNotRunning)?;
                inner.elapsed = Some(started.elapsed());
                inner.state = TimerState::Stopped;
                Ok(())
            }
            _ => Err(StateError::TimerNotRunning),
        })
    }

    /// Measured duration. Precondition: the timer is stopped.
    pub fn duration(&self) -> Result<Duration, StateError> {
        self.inner.transition(|inner| match inner.state {
            TimerState::Stopped => inner.elapsed.ok_or(StateError::TimerNotStopped),
            _ => Err(StateError::TimerNotStopped),
        })
    }

    /// Force the timer back to Ready.
    pub fn reset(&self) {
        self.inner.transition(|inner| {
            inner.state = TimerState::Ready;
            inner.started = None;
            inner.elapsed = None;
        });
    }
}

impl Default for WallTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated per-size wall-clock budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    pub small: Duration,
    pub medium: Duration,
    pub large: Duration,
    pub xlarge: Duration,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            small: TestSize::Small.default_time_limit(),
            medium: TestSize::Medium.default_time_limit(),
            large: TestSize::Large.default_time_limit(),
            xlarge: TestSize::XLarge.default_time_limit(),
        }
    }
}

impl TimeLimits {
    pub(crate) fn from_secs_f64(small: f64, medium: f64, large: f64, xlarge: f64) -> Self {
        Self {
            small: Duration::from_secs_f64(small),
            medium: Duration::from_secs_f64(medium),
            large: Duration::from_secs_f64(large),
            xlarge: Duration::from_secs_f64(xlarge),
        }
    }

    pub fn limit_for(&self, size: TestSize) -> Duration {
        match size {
            TestSize::Small => self.small,
            TestSize::Medium => self.medium,
            TestSize::Large => self.large,
            TestSize::XLarge => self.xlarge,
        }
    }

    /// The `small < medium < large <= xlarge` ordering invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small < self.medium && self.medium < self.large && self.large <= self.xlarge {
            Ok(())
        } else {
            Err(ConfigError::TimeLimitOrdering {
                small: self.small,
                medium: self.medium,
                large: self.large,
                xlarge: self.xlarge,
            })
        }
    }
}

/// Compares a measured window against the per-size budget.
#[derive(Debug, Clone)]
pub struct TimingValidator {
    limits: TimeLimits,
    mode: EnforcementMode,
}

impl TimingValidator {
    pub fn new(limits: TimeLimits, mode: EnforcementMode) -> Self {
        Self { limits, mode }
    }

    pub fn limits(&self) -> &TimeLimits {
        &self.limits
    }

    /// Evaluate a completed window.
    ///
    /// Within budget (or mode Off): `Ok(None)`. Overrun in warn mode:
    /// `Ok(Some(payload))`, with a diagnostic emitted. Overrun in strict
    /// mode: a typed timing error carrying the measured duration and limit.
    pub fn check(
        &self,
        test_id: &str,
        size: TestSize,
        elapsed: Duration,
    ) -> Result<Option<WarningPayload>, HermeticityViolation> {
        if self.mode == EnforcementMode::Off {
            return Ok(None);
        }
        let limit = self.limits.limit_for(size);
        if elapsed <= limit {
            return Ok(None);
        }

        let violation = HermeticityViolation::Timing {
            test_id: test_id.to_string(),
            size,
            elapsed,
            limit,
        };
        match self.mode {
            EnforcementMode::Strict => Err(violation),
            _ => {
                let payload = violation.warning_payload();
                tracing::warn!(
                    test_id,
                    size = %size,
                    elapsed_seconds = elapsed.as_secs_f64(),
                    limit_seconds = limit.as_secs_f64(),
                    "test exceeded its time limit"
                );
                Ok(Some(payload))
            }
        }
    }
}
