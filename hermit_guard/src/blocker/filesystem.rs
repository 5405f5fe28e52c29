//! Filesystem blocker: read, write, create, delete, modify, stat, and
//! directory-list operations against a path.
//!
//! Small tests are denied every operation, including read-only metadata
//! queries: any dependency on ambient filesystem state breaks hermeticity,
//! so there is no temp-directory exception and the small allow-list is empty
//! by design. Medium and larger sizes allow everything and the blocker is not
//! activated for them.

use std::fmt;
use std::path::{Path, PathBuf};
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

static SLOT: HookSlot<FilesystemHook> = HookSlot::new();

/// The kinds of filesystem operation the blocker distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FsOperation {
    Read,
    Write,
    Create,
    Delete,
    Modify,
    Stat,
    List,
}

impl FsOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            FsOperation::Read => "read",
            FsOperation::Write => "write",
            FsOperation::Create => "create",
            FsOperation::Delete => "delete",
            FsOperation::Modify => "modify",
            FsOperation::Stat => "stat",
            FsOperation::List => "list",
        }
    }
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct FilesystemHook {
    size: TestSize,
    mode: EnforcementMode,
    test_id: String,
    allowed_paths: Vec<PathBuf>,
    tracker: Arc<ViolationTracker>,
}

impl FilesystemHook {
    fn deny(&self, path: &Path, operation: FsOperation) -> Result<Access, HermeticityViolation> {
        match self.mode {
            EnforcementMode::Off => Ok(Access::Allowed),
            EnforcementMode::Warn => {
                self.record(path, operation);
                tracing::debug!(
                    path = %path.display(),
                    %operation,
                    test_id = %self.test_id,
                    "suppressed filesystem access"
                );
                Ok(Access::Suppressed)
            }
            EnforcementMode::Strict => {
                self.record(path, operation);
                Err(HermeticityViolation::Filesystem {
                    test_id: self.test_id.clone(),
                    size: self.size,
                    path: path.to_path_buf(),
                    operation,
                })
            }
        }
    }

    fn record(&self, path: &Path, operation: FsOperation) {
        self.tracker.record(ViolationRecord {
            class: ResourceClass::Filesystem,
            operation: format!("{operation} {}", path.display()),
            test_id: self.test_id.clone(),
            severity: Severity::Deny,
        });
    }
}

/// Pure decision: may a test of `size` perform `operation` on `path` given
/// the activation allow-list?
pub fn file_access_allowed(
    size: TestSize,
    path: &Path,
    _operation: FsOperation,
    allowed_paths: &[PathBuf],
) -> bool {
    match policy_for(size).filesystem {
        AccessRule::Allow => true,
        AccessRule::Deny => is_path_under_allowed(path, allowed_paths),
    }
}

fn is_path_under_allowed(path: &Path, allowed_paths: &[PathBuf]) -> bool {
    allowed_paths.iter().any(|root| path.starts_with(root))
}

/// Interposed filesystem entry point.
pub fn checked_file_op(
    path: &Path,
    operation: FsOperation,
) -> Result<Access, HermeticityViolation> {
    let Some(hook) = SLOT.snapshot() else {
        return Ok(Access::Allowed);
    };
    if file_access_allowed(hook.size, path, operation, &hook.allowed_paths) {
        return Ok(Access::Allowed);
    }
    hook.deny(path, operation)
}

/// Interposition adapter for filesystem operations.
pub struct FilesystemBlocker {
    core: BlockerCore,
}

impl FilesystemBlocker {
    pub fn new() -> Self {
        Self {
            core: BlockerCore::new(ResourceClass::Filesystem),
        }
    }

    /// Precondition: state is Active. Pure decision, no recording.
    pub fn check_access_allowed(
        &self,
        path: &Path,
        operation: FsOperation,
    ) -> Result<bool, StateError> {
        let hook = self.active_hook()?;
        Ok(file_access_allowed(
            hook.size,
            path,
            operation,
            &hook.allowed_paths,
        ))
    }

    fn active_hook(&self) -> Result<Arc<FilesystemHook>, StateError> {
        if self.core.state() != BlockerState::Active {
            return Err(StateError::NotActive {
                class: ResourceClass::Filesystem,
            });
        }
        SLOT.snapshot().ok_or(StateError::NotActive {
            class: ResourceClass::Filesystem,
        })
    }
}

impl Default for FilesystemBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBlocker for FilesystemBlocker {
    fn class(&self) -> ResourceClass {
        self.core.class()
    }

    fn state(&self) -> BlockerState {
        self.core.state()
    }

    fn activate(&self, ctx: &ActivationContext) -> Result<(), StateError> {
        self.core.begin_activation()?;
        SLOT.install(Arc::new(FilesystemHook {
            size: ctx.size,
            mode: ctx.mode,
            test_id: ctx.test_id.clone(),
            allowed_paths: ctx.allowed_paths.clone(),
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
