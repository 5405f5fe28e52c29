//! # Resource Blockers
//!
//! Capability-interposition adapters, one per resource class. Each blocker
//! follows the same contract:
//!
//! - `activate`: Inactive -> Active; installs the blocker's decision state
//!   into its class's process-wide hook slot, so the crate's guarded entry
//!   points route through it for the duration of the window.
//! - `check_*`: pure decision against the current policy; no recording.
//! - `deactivate`: Active -> Inactive; clears the hook slot, restoring the
//!   entry points to their pre-activation behavior whether or not they were
//!   invoked during the window.
//! - `reset`: forces Inactive unconditionally; the controller's recovery
//!   path when a prior test's teardown never reached `deactivate`.
//!
//! The guarded entry points (`checked_connect`, `checked_file_op`,
//! `checked_spawn`, `checked_db_connect`, `note_worker_spawn`,
//! `checked_sleep`) are the interposed surface: with an empty slot they
//! always allow, so code paths wired through them cost one `RwLock` read
//! outside an enforcement window.
//!
//! Enforcement is advisory and cooperative: a caller that captured a raw
//! resource handle before activation is not stopped. Kernel-level isolation
//! is out of scope.

pub mod database;
pub mod filesystem;
pub mod network;
pub mod process;
pub mod sleep;
pub mod thread;

mod slot;

use std::path::PathBuf;
use std::sync::Arc;

use hermit_common::state_machine::StateMachine;

use crate::config::EnforcementMode;
use crate::error::StateError;
use crate::policy::ResourceClass;
use crate::size::TestSize;
use crate::violation::ViolationTracker;

pub(crate) use slot::HookSlot;

/// Two-state lifecycle for every blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockerState {
    Inactive,
    Active,
}

/// What the caller of a guarded entry point should do next.
///
/// `Allowed` means perform the real call. `Suppressed` means the attempt was
/// denied in warn mode and recorded; the caller must skip the underlying
/// operation, since partially executing a blocked side effect defeats the
/// purpose. Strict-mode denials never return — they are an `Err` at the point
/// of attempted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Suppressed,
}

/// Per-activation parameters handed to every blocker by the controller.
#[derive(Clone)]
pub struct ActivationContext {
    pub size: TestSize,
    pub mode: EnforcementMode,
    pub test_id: String,
    /// Filesystem allow-list. Always empty for small tests by design.
    pub allowed_paths: Vec<PathBuf>,
    pub tracker: Arc<ViolationTracker>,
}

impl ActivationContext {
    pub fn new(
        size: TestSize,
        mode: EnforcementMode,
        test_id: impl Into<String>,
        tracker: Arc<ViolationTracker>,
    ) -> Self {
        Self {
            size,
            mode,
            test_id: test_id.into(),
            allowed_paths: Vec::new(),
            tracker,
        }
    }

    pub fn with_allowed_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.allowed_paths = paths;
        self
    }
}

/// The uniform activate/deactivate/reset contract over the six variants.
pub trait ResourceBlocker {
    fn class(&self) -> ResourceClass;

    fn state(&self) -> BlockerState;

    /// Precondition: state is Inactive.
    fn activate(&self, ctx: &ActivationContext) -> Result<(), StateError>;

    /// Precondition: state is Active. Restores the interposed entry points.
    fn deactivate(&self) -> Result<(), StateError>;

    /// Unconditional forced recovery to Inactive.
    fn reset(&self);
}

/// State machine and activation bookkeeping shared by all six blockers.
pub(crate) struct BlockerCore {
    class: ResourceClass,
    state: StateMachine<BlockerState>,
}

impl BlockerCore {
    pub(crate) fn new(class: ResourceClass) -> Self {
        Self {
            class,
            state: StateMachine::new(BlockerState::Inactive),
        }
    }

    pub(crate) fn class(&self) -> ResourceClass {
        self.class
    }

    pub(crate) fn state(&self) -> BlockerState {
        self.state.current()
    }

    /// Inactive -> Active, or `StateError::AlreadyActive`.
    pub(crate) fn begin_activation(&self) -> Result<(), StateError> {
        let class = self.class;
        self.state.transition(|state| match state {
            BlockerState::Inactive => {
                *state = BlockerState::Active;
                Ok(())
            }
            BlockerState::Active => Err(StateError::AlreadyActive { class }),
        })
    }

    /// Active -> Inactive, or `StateError::NotActive`.
    pub(crate) fn begin_deactivation(&self) -> Result<(), StateError> {
        let class = self.class;
        self.state.transition(|state| match state {
            BlockerState::Active => {
                *state = BlockerState::Inactive;
                Ok(())
            }
            BlockerState::Inactive => Err(StateError::NotActive { class }),
        })
    }

    pub(crate) fn force_inactive(&self) {
        self.state.transition(|state| *state = BlockerState::Inactive);
    }
}
