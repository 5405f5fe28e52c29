//! Thread/process-pool monitor: creation of concurrent workers.
//!
//! Unlike the other blockers this one is observational. Worker creation is
//! never denied — logging and runtime machinery legitimately spawn threads —
//! so small tests get exactly one monitor-severity record naming how many
//! workers appeared during the window, and no record at all when none did.
//! The record is finalized at deactivation, not per spawn.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::blocker::{ActivationContext, BlockerCore, BlockerState, HookSlot, ResourceBlocker};
use crate::config::EnforcementMode;
use crate::error::StateError;
use crate::policy::{MonitorRule, ResourceClass, policy_for};
use crate::size::TestSize;
use crate::violation::{Severity, ViolationRecord, ViolationTracker};

static SLOT: HookSlot<ThreadHook> = HookSlot::new();

/// The kinds of concurrent worker the monitor observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerKind {
    Thread,
    TimerThread,
    ThreadPool,
    ProcessPool,
}

impl WorkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerKind::Thread => "thread",
            WorkerKind::TimerThread => "timer-thread",
            WorkerKind::ThreadPool => "thread-pool",
            WorkerKind::ProcessPool => "process-pool",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ThreadHook {
    size: TestSize,
    mode: EnforcementMode,
    test_id: String,
    tracker: Arc<ViolationTracker>,
    spawned: AtomicU64,
}

impl ThreadHook {
    fn finalize(&self) {
        if self.mode == EnforcementMode::Off {
            return;
        }
        let count = self.spawned.load(Ordering::SeqCst);
        if count == 0 {
            return;
        }
        self.tracker.record(ViolationRecord {
            class: ResourceClass::Thread,
            operation: format!("{count} concurrent worker(s) created"),
            test_id: self.test_id.clone(),
            severity: Severity::Monitor,
        });
    }
}

/// True when worker creation is observed (never denied) for `size`.
pub fn is_monitored(size: TestSize) -> bool {
    policy_for(size).thread == MonitorRule::Monitor
}

/// Interposed worker-creation entry point. Always lets the creation proceed.
pub fn note_worker_spawn(kind: WorkerKind) {
    let Some(hook) = SLOT.snapshot() else {
        return;
    };
    if !is_monitored(hook.size) {
        return;
    }
    hook.spawned.fetch_add(1, Ordering::SeqCst);
    tracing::debug!(worker = %kind, test_id = %hook.test_id, "worker creation observed");
}

/// Observational adapter for concurrent worker creation.
pub struct ThreadMonitor {
    core: BlockerCore,
}

impl ThreadMonitor {
    pub fn new() -> Self {
        Self {
            core: BlockerCore::new(ResourceClass::Thread),
        }
    }

    /// Workers observed so far in the current window.
    ///
    /// Precondition: state is Active.
    pub fn observed_count(&self) -> Result<u64, StateError> {
        if self.core.state() != BlockerState::Active {
            return Err(StateError::NotActive {
                class: ResourceClass::Thread,
            });
        }
        let hook = SLOT.snapshot().ok_or(StateError::NotActive {
            class: ResourceClass::Thread,
        })?;
        Ok(hook.spawned.load(Ordering::SeqCst))
    }
}

impl Default for ThreadMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBlocker for ThreadMonitor {
    fn class(&self) -> ResourceClass {
        self.core.class()
    }

    fn state(&self) -> BlockerState {
        self.core.state()
    }

    fn activate(&self, ctx: &ActivationContext) -> Result<(), StateError> {
        self.core.begin_activation()?;
        SLOT.install(Arc::new(ThreadHook {
            size: ctx.size,
            mode: ctx.mode,
            test_id: ctx.test_id.clone(),
            tracker: Arc::clone(&ctx.tracker),
            spawned: AtomicU64::new(0),
        }));
        Ok(())
    }

    fn deactivate(&self) -> Result<(), StateError> {
        self.core.begin_deactivation()?;
        let hook = SLOT.snapshot();
        SLOT.clear();
        if let Some(hook) = hook {
            hook.finalize();
        }
        Ok(())
    }

    fn reset(&self) {
        self.core.force_inactive();
        SLOT.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_small_is_monitored() {
        assert!(is_monitored(TestSize::Small));
        assert!(!is_monitored(TestSize::Medium));
        assert!(!is_monitored(TestSize::Large));
        assert!(!is_monitored(TestSize::XLarge));
    }
}
