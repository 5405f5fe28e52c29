//! Network blocker: outbound connection attempts by host and port.
//!
//! Small tests get no network at all. Medium tests may talk to loopback only
//! (IPv4 `127.0.0.0/8`, IPv6 `::1`, or the literal name `localhost`). Large
//! and XLarge tests are never interposed — the controller does not even
//! activate this blocker for them.

use std::net::IpAddr;
use std::sync::Arc;

use crate::blocker::{
    Access, ActivationContext, BlockerCore, BlockerState, HookSlot, ResourceBlocker,
};
use crate::config::EnforcementMode;
use crate::error::{HermeticityViolation, StateError};
use crate::policy::{NetworkRule, ResourceClass, policy_for};
use crate::size::TestSize;
use crate::violation::{Severity, ViolationRecord, ViolationTracker};

static SLOT: HookSlot<NetworkHook> = HookSlot::new();

struct NetworkHook {
    size: TestSize,
    mode: EnforcementMode,
    test_id: String,
    tracker: Arc<ViolationTracker>,
}

impl NetworkHook {
    fn deny(&self, host: &str, port: u16) -> Result<Access, HermeticityViolation> {
        match self.mode {
            EnforcementMode::Off => Ok(Access::Allowed),
            EnforcementMode::Warn => {
                self.record(host, port);
                tracing::debug!(host, port, test_id = %self.test_id, "suppressed network access");
                Ok(Access::Suppressed)
            }
            EnforcementMode::Strict => {
                self.record(host, port);
                Err(HermeticityViolation::Network {
                    test_id: self.test_id.clone(),
                    size: self.size,
                    host: host.to_string(),
                    port,
                })
            }
        }
    }

    fn record(&self, host: &str, port: u16) {
        self.tracker.record(ViolationRecord {
            class: ResourceClass::Network,
            operation: format!("{host}:{port}"),
            test_id: self.test_id.clone(),
            severity: Severity::Deny,
        });
    }
}

/// Pure decision: may a test of `size` connect to `host:port`?
pub fn connection_allowed(size: TestSize, host: &str, _port: u16) -> bool {
    match policy_for(size).network {
        NetworkRule::Allow => true,
        NetworkRule::Deny => false,
        NetworkRule::LoopbackOnly => is_loopback_host(host),
    }
}

/// Both IPv4 and IPv6 loopback forms, plus the literal name.
fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// Interposed connect entry point.
///
/// With no active window this always allows. Inside a window, a denied
/// attempt is recorded and either suppressed (warn) or returned as an error
/// at the point of the attempt (strict).
pub fn checked_connect(host: &str, port: u16) -> Result<Access, HermeticityViolation> {
    let Some(hook) = SLOT.snapshot() else {
        return Ok(Access::Allowed);
    };
    if connection_allowed(hook.size, host, port) {
        return Ok(Access::Allowed);
    }
    hook.deny(host, port)
}

/// Interposition adapter for outbound connections.
pub struct NetworkBlocker {
    core: BlockerCore,
}

impl NetworkBlocker {
    pub fn new() -> Self {
        Self {
            core: BlockerCore::new(ResourceClass::Network),
        }
    }

    /// Precondition: state is Active. Pure decision, no recording.
    pub fn check_access_allowed(&self, host: &str, port: u16) -> Result<bool, StateError> {
        let hook = self.active_hook()?;
        Ok(connection_allowed(hook.size, host, port))
    }

    fn active_hook(&self) -> Result<Arc<NetworkHook>, StateError> {
        if self.core.state() != BlockerState::Active {
            return Err(StateError::NotActive {
                class: ResourceClass::Network,
            });
        }
        SLOT.snapshot().ok_or(StateError::NotActive {
            class: ResourceClass::Network,
        })
    }
}

impl Default for NetworkBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBlocker for NetworkBlocker {
    fn class(&self) -> ResourceClass {
        self.core.class()
    }

    fn state(&self) -> BlockerState {
        self.core.state()
    }

    fn activate(&self, ctx: &ActivationContext) -> Result<(), StateError> {
        self.core.begin_activation()?;
        SLOT.install(Arc::new(NetworkHook {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_forms_are_recognized() {
        assert!(is_loopback_host("localhost"));
        assert!(is_loopback_host("127.0.0.1"));
        assert!(is_loopback_host("127.8.4.2"));
        assert!(is_loopback_host("::1"));
        assert!(is_loopback_host("[::1]"));
        assert!(!is_loopback_host("10.0.0.1"));
        assert!(!is_loopback_host("api.example.com"));
    }

    #[test]
    fn small_denies_even_loopback() {
        assert!(!connection_allowed(TestSize::Small, "127.0.0.1", 8080));
    }

    #[test]
    fn medium_allows_loopback_only() {
        assert!(connection_allowed(TestSize::Medium, "localhost", 5432));
        assert!(connection_allowed(TestSize::Medium, "::1", 443));
        assert!(!connection_allowed(TestSize::Medium, "api.example.com", 443));
    }

    #[test]
    fn large_allows_everything() {
        assert!(connection_allowed(TestSize::Large, "api.example.com", 443));
        assert!(connection_allowed(TestSize::XLarge, "10.1.2.3", 7000));
    }
}
