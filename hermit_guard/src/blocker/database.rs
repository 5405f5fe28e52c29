//! Database blocker: opening a connection handle to any database engine.
//!
//! Small tests are denied every engine kind, including embedded in-memory
//! ones — an in-process database is still an implicit, stateful dependency.
//! Every other size is unrestricted and the blocker is not activated.

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

static SLOT: HookSlot<DatabaseHook> = HookSlot::new();

/// The engine families the blocker distinguishes in descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseEngine {
    Relational,
    Document,
    KeyValue,
    /// In-process embedded engine, in-memory included.
    Embedded,
}

impl DatabaseEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseEngine::Relational => "relational",
            DatabaseEngine::Document => "document",
            DatabaseEngine::KeyValue => "key-value",
            DatabaseEngine::Embedded => "embedded",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct DatabaseHook {
    size: TestSize,
    mode: EnforcementMode,
    test_id: String,
    tracker: Arc<ViolationTracker>,
}

impl DatabaseHook {
    fn deny(
        &self,
        engine: DatabaseEngine,
        target: &str,
    ) -> Result<Access, HermeticityViolation> {
        match self.mode {
            EnforcementMode::Off => Ok(Access::Allowed),
            EnforcementMode::Warn => {
                self.record(engine, target);
                tracing::debug!(
                    %engine,
                    endpoint = target,
                    test_id = %self.test_id,
                    "suppressed database connection"
                );
                Ok(Access::Suppressed)
            }
            EnforcementMode::Strict => {
                self.record(engine, target);
                Err(HermeticityViolation::Database {
                    test_id: self.test_id.clone(),
                    size: self.size,
                    engine,
                    target: target.to_string(),
                })
            }
        }
    }

    fn record(&self, engine: DatabaseEngine, target: &str) {
        self.tracker.record(ViolationRecord {
            class: ResourceClass::Database,
            operation: format!("{engine} connection to {target}"),
            test_id: self.test_id.clone(),
            severity: Severity::Deny,
        });
    }
}

/// Pure decision: may a test of `size` open a database connection?
pub fn connection_allowed(size: TestSize) -> bool {
    policy_for(size).database == AccessRule::Allow
}

/// Interposed connection entry point.
pub fn checked_db_connect(
    engine: DatabaseEngine,
    target: &str,
) -> Result<Access, HermeticityViolation> {
    let Some(hook) = SLOT.snapshot() else {
        return Ok(Access::Allowed);
    };
    if connection_allowed(hook.size) {
        return Ok(Access::Allowed);
    }
    hook.deny(engine, target)
}

/// Interposition adapter for database connections.
pub struct DatabaseBlocker {
    core: BlockerCore,
}

impl DatabaseBlocker {
    pub fn new() -> Self {
        Self {
            core: BlockerCore::new(ResourceClass::Database),
        }
    }

    /// Precondition: state is Active. Pure decision, no recording.
    pub fn check_connection_allowed(&self, _engine: DatabaseEngine) -> Result<bool, StateError> {
        let hook = self.active_hook()?;
        Ok(connection_allowed(hook.size))
    }

    fn active_hook(&self) -> Result<Arc<DatabaseHook>, StateError> {
        if self.core.state() != BlockerState::Active {
            return Err(StateError::NotActive {
                class: ResourceClass::Database,
            });
        }
        SLOT.snapshot().ok_or(StateError::NotActive {
            class: ResourceClass::Database,
        })
    }
}

impl Default for DatabaseBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBlocker for DatabaseBlocker {
    fn class(&self) -> ResourceClass {
        self.core.class()
    }

    fn state(&self) -> BlockerState {
        self.core.state()
    }

    fn activate(&self, ctx: &ActivationContext) -> Result<(), StateError> {
        self.core.begin_activation()?;
        SLOT.install(Arc::new(DatabaseHook {
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
