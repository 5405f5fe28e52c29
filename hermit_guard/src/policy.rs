//! The per-size resource policy table.
//!
//! This is a pure, total mapping from [`TestSize`] to a decision for each of
//! the six resource classes. Nothing here records or raises; blockers consult
//! the table and the enforcement controller uses it to skip activating
//! blockers that could never produce a record for the current size.

use std::fmt;

use serde::Serialize;

use crate::size::TestSize;

/// The closed set of resource classes this crate interposes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Network,
    Filesystem,
    Process,
    Database,
    Thread,
    Sleep,
}

impl ResourceClass {
    /// All classes, in the controller's activation order.
    pub const ALL: [ResourceClass; 6] = [
        ResourceClass::Network,
        ResourceClass::Filesystem,
        ResourceClass::Process,
        ResourceClass::Database,
        ResourceClass::Thread,
        ResourceClass::Sleep,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceClass::Network => "network",
            ResourceClass::Filesystem => "filesystem",
            ResourceClass::Process => "process",
            ResourceClass::Database => "database",
            ResourceClass::Thread => "thread",
            ResourceClass::Sleep => "sleep",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network decision: richer than binary because medium tests get loopback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRule {
    Deny,
    LoopbackOnly,
    Allow,
}

/// Binary allow/deny decision for filesystem, process, database and sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    Deny,
    Allow,
}

/// Thread/pool creation is never denied, only observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorRule {
    Monitor,
    Ignore,
}

/// Resource policy for one test size, covering all six classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePolicy {
    pub network: NetworkRule,
    pub filesystem: AccessRule,
    pub process: AccessRule,
    pub database: AccessRule,
    pub thread: MonitorRule,
    pub sleep: AccessRule,
}

impl ResourcePolicy {
    /// True when the blocker for `class` could never produce a record under
    /// this policy, so the controller need not activate it at all.
    pub fn is_noop(&self, class: ResourceClass) -> bool {
        match class {
            ResourceClass::Network => self.network == NetworkRule::Allow,
            ResourceClass::Filesystem => self.filesystem == AccessRule::Allow,
            ResourceClass::Process => self.process == AccessRule::Allow,
            ResourceClass::Database => self.database == AccessRule::Allow,
            ResourceClass::Thread => self.thread == MonitorRule::Ignore,
            ResourceClass::Sleep => self.sleep == AccessRule::Allow,
        }
    }
}

/// The policy table. Total over all four sizes.
pub fn policy_for(size: TestSize) -> ResourcePolicy {
    match size {
        TestSize::Small => ResourcePolicy {
            network: NetworkRule::Deny,
            filesystem: AccessRule::Deny,
            process: AccessRule::Deny,
            database: AccessRule::Deny,
            thread: MonitorRule::Monitor,
            sleep: AccessRule::Deny,
        },
        TestSize::Medium => ResourcePolicy {
            network: NetworkRule::LoopbackOnly,
            filesystem: AccessRule::Allow,
            process: AccessRule::Allow,
            database: AccessRule::Allow,
            thread: MonitorRule::Ignore,
            sleep: AccessRule::Allow,
        },
        TestSize::Large | TestSize::XLarge => ResourcePolicy {
            network: NetworkRule::Allow,
            filesystem: AccessRule::Allow,
            process: AccessRule::Allow,
            database: AccessRule::Allow,
            thread: MonitorRule::Ignore,
            sleep: AccessRule::Allow,
        },
    }
}
