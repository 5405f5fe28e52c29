//! Sleep blocker: calls that voluntarily suspend the calling thread for a
//! duration.
//!
//! A zero-duration sleep is still a violation for small tests: the presence
//! of the call signals a timing-dependent design, whatever it actually
//! costs. A wait on a condition or event with a timeout is a synchronization
//! primitive, not a sleep, and must not be routed through this entry point.

use std::sync::Arc;
use std::time::Duration;

use crate::blocker::{
    Access, ActivationContext, BlockerCore, BlockerState, HookSlot, ResourceBlocker,
};
use crate::config::EnforcementMode;
use crate::error::{HermeticityViolation, StateError};
use crate::policy::{AccessRule, ResourceClass, policy_for};
use crate::size::TestSize;
use crate::violation::{Severity, ViolationRecord, ViolationTracker};

static SLOT: HookSlot<SleepHook> = HookSlot::new();

struct SleepHook {
    size: TestSize,
    mode: EnforcementMode,
    test_id: String,
    tracker: Arc<ViolationTracker>,
}

impl SleepHook {
    fn deny(&self, requested: Duration) -> Result<Access, HermeticityViolation> {
        match self.mode {
            EnforcementMode::Off => Ok(Access::Allowed),
            EnforcementMode::Warn => {
                self.record(requested);
                tracing::debug!(
                    seconds = requested.as_secs_f64(),
                    test_id = %self.test_id,
                    "suppressed sleep"
                );
                Ok(Access::Suppressed)
            }
            EnforcementMode::Strict => {
                self.record(requested);
                Err(HermeticityViolation::Sleep {
                    test_id: self.test_id.clone(),
                    size: self.size,
                    requested,
                })
            }
        }
    }

    fn record(&self, requested: Duration) {
        self.tracker.record(ViolationRecord {
            class: ResourceClass::Sleep,
            operation: format!("sleep for {:.3}s", requested.as_secs_f64()),
            test_id: self.test_id.clone(),
            severity: Severity::Deny,
        });
    }
}

/// Pure decision: may a test of `size` sleep at all? Duration is irrelevant.
pub fn sleep_allowed(size: TestSize) -> bool {
    policy_for(size).sleep == AccessRule::Allow
}

/// Interposed sleep entry point.
pub fn checked_sleep(requested: Duration) -> Result<Access, HermeticityViolation> {
    let Some(hook) = SLOT.snapshot() else {
        return Ok(Access::Allowed);
    };
    if sleep_allowed(hook.size) {
        return Ok(Access::Allowed);
    }
    hook.deny(requested)
}

/// Interposition adapter for timed sleeps.
pub struct SleepBlocker {
    core: BlockerCore,
}

impl SleepBlocker {
    pub fn new() -> Self {
        Self {
            core: BlockerCore::new(ResourceClass::Sleep),
        }
    }

    /// Precondition: state is Active. Pure decision, no recording.
    pub fn check_sleep_allowed(&self, _requested: Duration) -> Result<bool, StateError> {
        let hook = self.active_hook()?;
        Ok(sleep_allowed(hook.size))
    }

    fn active_hook(&self) -> Result<Arc<SleepHook>, StateError> {
        if self.core.state() != BlockerState::Active {
            return Err(StateError::NotActive {
                class: ResourceClass::Sleep,
            });
        }
        SLOT.snapshot().ok_or(StateError::NotActive {
            class: ResourceClass::Sleep,
        })
    }
}

impl Default for SleepBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBlocker for SleepBlocker {
    fn class(&self) -> ResourceClass {
        self.core.class()
    }

    fn state(&self) -> BlockerState {
        self.core.state()
    }

    fn activate(&self, ctx: &ActivationContext) -> Result<(), StateError> {
        self.core.begin_activation()?;
        SLOT.install(Arc::new(SleepHook {
            size: ctx.size,
            mode: ctx.mode,
            test_id: ctx.test_id.clone(),
            tracker: Arc::clone(&ctx.tracker),
        }));
        Ok(())
    }

    fn deactivate(&self) -> Result<(), StateError> {
        self.core.begin_deactivation()?;
        SLOT.clear();
        Ok(())
    }

    fn reset(&self) {
        self.core.force_inactive();
        SLOT.clear();
    }
}
