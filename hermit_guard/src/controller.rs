//! # Enforcement Controller
//!
//! Orchestrates the six blockers around one test's execution window. The
//! controller cycles Idle -> Armed -> Idle per test: arming resolves the
//! test's size and the run-wide mode, activates exactly the blockers whose
//! policy for that size is not a no-op, and records the activation order;
//! disarming deactivates them in reverse order and converts the accumulated
//! records into warn-mode diagnostics.
//!
//! Strict-mode deny violations never reach disarm evaluation: the first one
//! already failed the test at the point of attempted access. Monitor-only
//! records (thread monitor) surface as warnings in both warn and strict mode
//! and never fail a test.
//!
//! Disarming is mandatory cleanup. The [`EnforcementController::enforce`]
//! runner holds a drop guard so that a panicking test body still restores
//! every interposed entry point via [`EnforcementController::reset`], and the
//! host can call `reset` itself if a prior teardown never reached `disarm`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use hermit_common::state_machine::StateMachine;

use crate::blocker::database::DatabaseBlocker;
use crate::blocker::filesystem::FilesystemBlocker;
use crate::blocker::network::NetworkBlocker;
use crate::blocker::process::ProcessBlocker;
use crate::blocker::sleep::SleepBlocker;
use crate::blocker::thread::ThreadMonitor;
use crate::blocker::{ActivationContext, ResourceBlocker};
use crate::config::EnforcementMode;
use crate::error::{StateError, class_remediation};
use crate::policy::{ResourceClass, policy_for};
use crate::size::TestSize;
use crate::violation::{Severity, ViolationRecord, ViolationTracker, WarningPayload};

/// Controller lifecycle: one Armed window per test, strictly non-overlapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Armed { test_id: String, size: TestSize },
}

/// Per-test inbound parameters from the host runner.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub test_id: String,
    pub size: TestSize,
    /// Extra allow-listed filesystem paths. Ignored for small tests, whose
    /// allow-list is empty by design.
    pub allowed_paths: Vec<PathBuf>,
}

impl TestContext {
    pub fn new(test_id: impl Into<String>, size: TestSize) -> Self {
        Self {
            test_id: test_id.into(),
            size,
            allowed_paths: Vec::new(),
        }
    }

    pub fn with_allowed_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.allowed_paths = paths;
        self
    }
}

/// What one enforcement window produced.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub test_id: String,
    pub size: TestSize,
    /// Every record detected in the window, in detection order.
    pub records: Vec<ViolationRecord>,
    /// Non-fatal diagnostics surfaced for this test.
    pub warnings: Vec<WarningPayload>,
}

impl TestOutcome {
    /// A window with no records of any kind.
    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }
}

/// Owns the six blockers of one worker and drives their shared lifecycle.
pub struct EnforcementController {
    mode: EnforcementMode,
    network: NetworkBlocker,
    filesystem: FilesystemBlocker,
    process: ProcessBlocker,
    database: DatabaseBlocker,
    thread: ThreadMonitor,
    sleep: SleepBlocker,
    tracker: Arc<ViolationTracker>,
    state: StateMachine<ControllerState>,
    activated: Mutex<Vec<ResourceClass>>,
}

impl EnforcementController {
    pub fn new(mode: EnforcementMode) -> Self {
        Self::with_tracker(mode, Arc::new(ViolationTracker::new()))
    }

    /// Share an existing tracker, e.g. one feeding the run report.
    pub fn with_tracker(mode: EnforcementMode, tracker: Arc<ViolationTracker>) -> Self {
        Self {
            mode,
            network: NetworkBlocker::new(),
            filesystem: FilesystemBlocker::new(),
            process: ProcessBlocker::new(),
            database: DatabaseBlocker::new(),
            thread: ThreadMonitor::new(),
            sleep: SleepBlocker::new(),
            tracker,
            state: StateMachine::new(ControllerState::Idle),
            activated: Mutex::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> EnforcementMode {
        self.mode
    }

    pub fn state(&self) -> ControllerState {
        self.state.current()
    }

    pub fn tracker(&self) -> Arc<ViolationTracker> {
        Arc::clone(&self.tracker)
    }

    /// Arm the window for one test. Precondition: Idle.
    ///
    /// With mode Off no blocker is activated; the window is tracked but the
    /// controller stays functionally idle for this test.
    pub fn arm(&self, ctx: &TestContext) -> Result<(), StateError> {
        self.state.transition(|state| match state {
            ControllerState::Idle => {
                *state = ControllerState::Armed {
                    test_id: ctx.test_id.clone(),
                    size: ctx.size,
                };
                Ok(())
            }
            ControllerState::Armed { test_id, .. } => Err(StateError::AlreadyArmed {
                test_id: test_id.clone(),
            }),
        })?;

        if self.mode == EnforcementMode::Off {
            return Ok(());
        }

        let allowed_paths = if ctx.size == TestSize::Small {
            Vec::new()
        } else {
            ctx.allowed_paths.clone()
        };
        let activation =
            ActivationContext::new(ctx.size, self.mode, ctx.test_id.clone(), self.tracker())
                .with_allowed_paths(allowed_paths);

        let policy = policy_for(ctx.size);
        for class in ResourceClass::ALL {
            if policy.is_noop(class) {
                continue;
            }
            if let Err(err) = self.blocker(class).activate(&activation) {
                self.rollback_activation();
                self.state
                    .transition(|state| *state = ControllerState::Idle);
                return Err(err);
            }
            self.activated_lock().push(class);
        }

        tracing::debug!(
            test_id = %ctx.test_id,
            size = %ctx.size,
            mode = %self.mode,
            "enforcement window armed"
        );
        Ok(())
    }

    /// Disarm the window. Precondition: Armed. Runs even when the test body
    /// failed; deactivation order is the reverse of activation order.
    pub fn disarm(&self) -> Result<TestOutcome, StateError> {
        let (test_id, size) = self.state.transition(|state| match state {
            ControllerState::Armed { test_id, size } => {
                let armed = (test_id.clone(), *size);
                *state = ControllerState::Idle;
                Ok(armed)
            }
            ControllerState::Idle => Err(StateError::NotArmed),
        })?;

        let mut activated = std::mem::take(&mut *self.activated_lock());
        activated.reverse();
        for class in activated {
            if let Err(err) = self.blocker(class).deactivate() {
                tracing::error!(%class, %err, "blocker failed to deactivate");
            }
        }

        let records = self.tracker.test_records(&test_id);
        let warnings = self.collect_warnings(size, &records);
        for warning in &warnings {
            tracing::warn!(
                kind = %warning.kind,
                test_id = %warning.test_id,
                descriptor = %warning.descriptor,
                "hermeticity violation"
            );
        }

        Ok(TestOutcome {
            test_id,
            size,
            records,
            warnings,
        })
    }

    /// Forced recovery: every blocker back to Inactive, the controller back
    /// to Idle, regardless of current state. For teardown paths that never
    /// reached `disarm`.
    pub fn reset(&self) {
        self.network.reset();
        self.filesystem.reset();
        self.process.reset();
        self.database.reset();
        self.thread.reset();
        self.sleep.reset();
        self.activated_lock().clear();
        self.state
            .transition(|state| *state = ControllerState::Idle);
    }

    /// Run `body` inside an enforcement window.
    ///
    /// Equivalent to `arm`, the body, then `disarm`, with the guarantee that
    /// a panicking body still restores every interposed entry point before
    /// the panic propagates.
    pub fn enforce<R>(
        &self,
        ctx: &TestContext,
        body: impl FnOnce() -> R,
    ) -> Result<(R, TestOutcome), StateError> {
        self.arm(ctx)?;
        let mut guard = ResetOnDrop {
            controller: self,
            armed: true,
        };
        let result = body();
        guard.armed = false;
        let outcome = self.disarm()?;
        Ok((result, outcome))
    }

    fn blocker(&self, class: ResourceClass) -> &dyn ResourceBlocker {
        match class {
            ResourceClass::Network => &self.network,
            ResourceClass::Filesystem => &self.filesystem,
            ResourceClass::Process => &self.process,
            ResourceClass::Database => &self.database,
            ResourceClass::Thread => &self.thread,
            ResourceClass::Sleep => &self.sleep,
        }
    }

    fn rollback_activation(&self) {
        let mut activated = std::mem::take(&mut *self.activated_lock());
        activated.reverse();
        for class in activated {
            if let Err(err) = self.blocker(class).deactivate() {
                tracing::error!(%class, %err, "blocker failed to deactivate during rollback");
            }
        }
    }

    fn collect_warnings(
        &self,
        size: TestSize,
        records: &[ViolationRecord],
    ) -> Vec<WarningPayload> {
        records
            .iter()
            .filter(|record| match self.mode {
                EnforcementMode::Off => false,
                EnforcementMode::Warn => true,
                // Deny records already failed the test at the access point.
                EnforcementMode::Strict => record.severity == Severity::Monitor,
            })
            .map(|record| WarningPayload {
                kind: record.class.as_str().to_string(),
                test_id: record.test_id.clone(),
                size,
                descriptor: record.operation.clone(),
                remediation: class_remediation(record.class, size),
            })
            .collect()
    }

    fn activated_lock(&self) -> std::sync::MutexGuard<'_, Vec<ResourceClass>> {
        self.activated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct ResetOnDrop<'a> {
    controller: &'a EnforcementController,
    armed: bool,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.reset();
        }
    }
}
