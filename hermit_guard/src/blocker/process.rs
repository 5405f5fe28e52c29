//! Process blocker: spawning a new OS process via direct creation, shell
//! command execution, or a multi-process worker pool.
//!
//! Small tests may not spawn anything; every other size is unrestricted and
//! the blocker is not activated for them.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::blocker::{
    Access, ActivationContext, BlockerCore, BlockerState, HookSlot, ResourceBlocker,
};
use crate::config::EnforcementMode;
use crate::error::{HermeticityViolation, StateError};
use crate::policy::{AccessRule, ResourceClass, policy_for};
use crate::size::TestSize;
use crate::violation::{Severity, ViolationRecord, ViolationTracker};

static SLOT: HookSlot<ProcessHook> = HookSlot::new();

/// How the spawn was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnKind {
    /// Direct process creation (`Command::spawn` and friends).
    Command,
    /// A command line handed to a shell.
    Shell,
    /// A multi-process worker abstraction.
    WorkerPool,
}

impl SpawnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SpawnKind::Command => "command",
            SpawnKind::Shell => "shell",
            SpawnKind::WorkerPool => "worker-pool",
        }
    }
}

impl fmt::Display for SpawnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ProcessHook {
    size: TestSize,
    mode: EnforcementMode,
    test_id: String,
    tracker: Arc<ViolationTracker>,
}

impl ProcessHook {
    fn deny(&self, command: &str) -> Result<Access, HermeticityViolation> {
        match self.mode {
            EnforcementMode::Off => Ok(Access::Allowed),
            EnforcementMode::Warn => {
                self.record(command);
                tracing::debug!(command, test_id = %self.test_id, "suppressed process spawn");
                Ok(Access::Suppressed)
            }
            EnforcementMode::Strict => {
                self.record(command);
                Err(HermeticityViolation::Process {
                    test_id: self.test_id.clone(),
                    size: self.size,
                    command: command.to_string(),
                })
            }
        }
    }

    fn record(&self, command: &str) {
        self.tracker.record(ViolationRecord {
            class: ResourceClass::Process,
            operation: command.to_string(),
            test_id: self.test_id.clone(),
            severity: Severity::Deny,
        });
    }
}

/// Pure decision: may a test of `size` spawn a process at all?
pub fn spawn_allowed(size: TestSize) -> bool {
    policy_for(size).process == AccessRule::Allow
}

fn render_command(program: &str, args: &[&str], kind: SpawnKind) -> String {
    let mut command = format!("{kind}: {program}");
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

/// Interposed spawn entry point.
pub fn checked_spawn(
    program: &str,
    args: &[&str],
    kind: SpawnKind,
) -> Result<Access, HermeticityViolation> {
    let Some(hook) = SLOT.snapshot() else {
        return Ok(Access::Allowed);
    };
    if spawn_allowed(hook.size) {
        return Ok(Access::Allowed);
    }
    hook.deny(&render_command(program, args, kind))
}

/// Interposition adapter for process spawning.
pub struct ProcessBlocker {
    core: BlockerCore,
}

impl ProcessBlocker {
    pub fn new() -> Self {
        Self {
            core: BlockerCore::new(ResourceClass::Process),
        }
    }

    /// Precondition: state is Active. Pure decision, no recording.
    pub fn check_spawn_allowed(&self, _program: &str, _args: &[&str]) -> Result<bool, StateError> {
        let hook = self.active_hook()?;
        Ok(spawn_allowed(hook.size))
    }

    fn active_hook(&self) -> Result<Arc<ProcessHook>, StateError> {
        if self.core.state() != BlockerState::Active {
            return Err(StateError::NotActive {
                class: ResourceClass::Process,
            });
        }
        SLOT.snapshot().ok_or(StateError::NotActive {
            class: ResourceClass::Process,
        })
    }
}

impl Default for ProcessBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBlocker for ProcessBlocker {
    fn class(&self) -> ResourceClass {
        self.core.class()
    }

    fn state(&self) -> BlockerState {
        self.core.state()
    }

    fn activate(&self, ctx: &ActivationContext) -> Result<(), StateError> {
        self.core.begin_activation()?;
        SLOT.install(Arc::new(ProcessHook {
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
