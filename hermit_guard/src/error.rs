//! Typed errors for enforcement, configuration, and lifecycle preconditions.
//!
//! [`HermeticityViolation`] is raised synchronously at the point of attempted
//! access (strict mode only); its message names the resource class, the exact
//! target, the test's size, and concrete remediation actions. Remediation is
//! per-class policy data, not boilerplate, and is also reused for warn-mode
//! payloads. Configuration errors are always fatal; there is no warn form.

use std::path::PathBuf;
use std::time::Duration;

use crate::blocker::database::DatabaseEngine;
use crate::blocker::filesystem::FsOperation;
use crate::policy::ResourceClass;
use crate::size::TestSize;
use crate::violation::WarningPayload;

/// A resource or timing violation attributable to a single test.
#[derive(Debug, thiserror::Error)]
pub enum HermeticityViolation {
    #[error("{}", network_message(.test_id, .size, .host, .port))]
    Network {
        test_id: String,
        size: TestSize,
        host: String,
        port: u16,
    },

    #[error("{}", filesystem_message(.test_id, .size, .path, .operation))]
    Filesystem {
        test_id: String,
        size: TestSize,
        path: PathBuf,
        operation: FsOperation,
    },

    #[error("{}", process_message(.test_id, .size, .command))]
    Process {
        test_id: String,
        size: TestSize,
        command: String,
    },

    #[error("{}", database_message(.test_id, .size, .engine, .target))]
    Database {
        test_id: String,
        size: TestSize,
        engine: DatabaseEngine,
        target: String,
    },

    #[error("{}", sleep_message(.test_id, .size, .requested))]
    Sleep {
        test_id: String,
        size: TestSize,
        requested: Duration,
    },

    #[error("{}", timing_message(.test_id, .size, .elapsed, .limit))]
    Timing {
        test_id: String,
        size: TestSize,
        elapsed: Duration,
        limit: Duration,
    },
}

impl HermeticityViolation {
    /// Resource class, or `None` for timing violations.
    pub fn class(&self) -> Option<ResourceClass> {
        match self {
            HermeticityViolation::Network { .. } => Some(ResourceClass::Network),
            HermeticityViolation::Filesystem { .. } => Some(ResourceClass::Filesystem),
            HermeticityViolation::Process { .. } => Some(ResourceClass::Process),
            HermeticityViolation::Database { .. } => Some(ResourceClass::Database),
            HermeticityViolation::Sleep { .. } => Some(ResourceClass::Sleep),
            HermeticityViolation::Timing { .. } => None,
        }
    }

    /// Payload kind: the resource class name, or `"timing"`.
    pub fn kind(&self) -> &'static str {
        match self.class() {
            Some(class) => class.as_str(),
            None => "timing",
        }
    }

    pub fn test_id(&self) -> &str {
        match self {
            HermeticityViolation::Network { test_id, .. }
            | HermeticityViolation::Filesystem { test_id, .. }
            | HermeticityViolation::Process { test_id, .. }
            | HermeticityViolation::Database { test_id, .. }
            | HermeticityViolation::Sleep { test_id, .. }
            | HermeticityViolation::Timing { test_id, .. } => test_id,
        }
    }

    pub fn size(&self) -> TestSize {
        match self {
            HermeticityViolation::Network { size, .. }
            | HermeticityViolation::Filesystem { size, .. }
            | HermeticityViolation::Process { size, .. }
            | HermeticityViolation::Database { size, .. }
            | HermeticityViolation::Sleep { size, .. }
            | HermeticityViolation::Timing { size, .. } => *size,
        }
    }

    /// The attempted operation (or measured duration) in display form.
    pub fn descriptor(&self) -> String {
        match self {
            HermeticityViolation::Network { host, port, .. } => format!("{host}:{port}"),
            HermeticityViolation::Filesystem {
                path, operation, ..
            } => format!("{operation} {}", path.display()),
            HermeticityViolation::Process { command, .. } => command.clone(),
            HermeticityViolation::Database { engine, target, .. } => {
                format!("{engine} connection to {target}")
            }
            HermeticityViolation::Sleep { requested, .. } => {
                format!("sleep for {}", fmt_duration(requested))
            }
            HermeticityViolation::Timing { elapsed, limit, .. } => {
                format!("took {} (limit {})", fmt_duration(elapsed), fmt_duration(limit))
            }
        }
    }

    /// Ordered remediation suggestions for this violation.
    pub fn remediation(&self) -> Vec<String> {
        match self {
            HermeticityViolation::Network { size, .. } => network_remediation(*size),
            HermeticityViolation::Filesystem {
                size, operation, ..
            } => filesystem_remediation(*size, Some(*operation)),
            HermeticityViolation::Process { size, .. } => process_remediation(*size),
            HermeticityViolation::Database { size, .. } => database_remediation(*size),
            HermeticityViolation::Sleep { size, .. } => sleep_remediation(*size),
            HermeticityViolation::Timing { size, .. } => timing_remediation(*size),
        }
    }

    /// The warn-mode payload with the same shape as this error.
    pub fn warning_payload(&self) -> WarningPayload {
        WarningPayload {
            kind: self.kind().to_string(),
            test_id: self.test_id().to_string(),
            size: self.size(),
            descriptor: self.descriptor(),
            remediation: self.remediation(),
        }
    }
}

/// Remediation suggestions for warn-mode payloads built from records, where
/// only the resource class is known.
pub fn class_remediation(class: ResourceClass, size: TestSize) -> Vec<String> {
    match class {
        ResourceClass::Network => network_remediation(size),
        ResourceClass::Filesystem => filesystem_remediation(size, None),
        ResourceClass::Process => process_remediation(size),
        ResourceClass::Database => database_remediation(size),
        ResourceClass::Thread => thread_remediation(size),
        ResourceClass::Sleep => sleep_remediation(size),
    }
}

fn network_remediation(size: TestSize) -> Vec<String> {
    match size {
        TestSize::Small => to_strings(&[
            "Mock the network call behind a trait and inject a fake transport",
            "Use an in-memory duplex stream instead of a real socket",
            "Change the test size to medium if loopback networking is required",
        ]),
        TestSize::Medium => to_strings(&[
            "Run the service under test on loopback and connect to 127.0.0.1",
            "Mock the external service call",
            "Change the test size to large if external network access is required",
        ]),
        TestSize::Large | TestSize::XLarge => Vec::new(),
    }
}

fn filesystem_remediation(size: TestSize, operation: Option<FsOperation>) -> Vec<String> {
    match size {
        TestSize::Small => {
            let mut suggestions = to_strings(&[
                "Hold test data in memory (Vec<u8>, Cursor) instead of on disk",
                "Mock the filesystem seam behind a trait and inject a fake",
            ]);
            if matches!(operation, Some(FsOperation::Read) | Some(FsOperation::Stat)) {
                suggestions.push(
                    "Embed fixture data in the test binary with include_str!/include_bytes!"
                        .to_string(),
                );
            }
            suggestions
                .push("Change the test size to medium if filesystem access is required".to_string());
            suggestions
        }
        _ => Vec::new(),
    }
}

fn process_remediation(size: TestSize) -> Vec<String> {
    match size {
        TestSize::Small => to_strings(&[
            "Call the code under test in-process instead of spawning a child",
            "Mock the process seam behind a trait and assert on the command it receives",
            "Change the test size to medium if a real subprocess is required",
        ]),
        _ => Vec::new(),
    }
}

fn database_remediation(size: TestSize) -> Vec<String> {
    match size {
        TestSize::Small => to_strings(&[
            "Use a fake repository implementation instead of a real connection",
            "An embedded in-memory engine is still a stateful dependency; stub the storage trait",
            "Change the test size to medium if a real database is required",
        ]),
        _ => Vec::new(),
    }
}

fn sleep_remediation(size: TestSize) -> Vec<String> {
    match size {
        TestSize::Small => to_strings(&[
            "Inject a clock abstraction and advance it manually",
            "Wait on a condition or channel with a timeout instead of sleeping",
            "Change the test size to medium if real elapsed time is required",
        ]),
        _ => Vec::new(),
    }
}

fn thread_remediation(size: TestSize) -> Vec<String> {
    match size {
        TestSize::Small => to_strings(&[
            "Drive the concurrent code deterministically on the test thread",
            "Change the test size to medium if real worker threads are required",
        ]),
        _ => Vec::new(),
    }
}

fn timing_remediation(size: TestSize) -> Vec<String> {
    to_strings(&[
        "Split the test into smaller, faster cases",
        "Replace real waits with injected clocks or notified conditions",
        match size {
            TestSize::Small => "Change the test size to medium if the work is inherently slow",
            _ => "Change the test size upward if the work is inherently slow",
        },
    ])
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn render(header: String, size: &TestSize, remediation: &[String]) -> String {
    let mut message = header;
    if !remediation.is_empty() {
        message.push_str(&format!(
            "\n{} tests have restricted resource access. Options:",
            size.name()
        ));
        for (i, suggestion) in remediation.iter().enumerate() {
            message.push_str(&format!("\n  {}. {suggestion}", i + 1));
        }
    }
    message
}

fn network_message(test_id: &str, size: &TestSize, host: &str, port: &u16) -> String {
    render(
        format!(
            "network access attempted by {size} test '{test_id}': connection to {host}:{port}"
        ),
        size,
        &network_remediation(*size),
    )
}

fn filesystem_message(
    test_id: &str,
    size: &TestSize,
    path: &PathBuf,
    operation: &FsOperation,
) -> String {
    render(
        format!(
            "filesystem access attempted by {size} test '{test_id}': {operation} on {}",
            path.display()
        ),
        size,
        &filesystem_remediation(*size, Some(*operation)),
    )
}

fn process_message(test_id: &str, size: &TestSize, command: &str) -> String {
    render(
        format!("process spawn attempted by {size} test '{test_id}': {command}"),
        size,
        &process_remediation(*size),
    )
}

fn database_message(
    test_id: &str,
    size: &TestSize,
    engine: &DatabaseEngine,
    target: &str,
) -> String {
    render(
        format!(
            "database connection attempted by {size} test '{test_id}': {engine} connection to {target}"
        ),
        size,
        &database_remediation(*size),
    )
}

fn sleep_message(test_id: &str, size: &TestSize, requested: &Duration) -> String {
    render(
        format!(
            "timed sleep attempted by {size} test '{test_id}': sleep for {}",
            fmt_duration(requested)
        ),
        size,
        &sleep_remediation(*size),
    )
}

fn timing_message(test_id: &str, size: &TestSize, elapsed: &Duration, limit: &Duration) -> String {
    format!(
        "{size} test '{test_id}' exceeded its time limit of {} (took {})",
        fmt_duration(limit),
        fmt_duration(elapsed)
    )
}

fn fmt_duration(duration: &Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}

/// Configuration errors. Always fatal; the run aborts before any test runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown enforcement mode '{value}' (expected one of: off, warn, strict)")]
    InvalidMode { value: String },

    #[error("unknown test size '{value}' (expected one of: small, medium, large, xlarge)")]
    InvalidSize { value: String },

    #[error(
        "time limits must satisfy small < medium < large <= xlarge \
         (got small={small:?}, medium={medium:?}, large={large:?}, xlarge={xlarge:?})"
    )]
    TimeLimitOrdering {
        small: Duration,
        medium: Duration,
        large: Duration,
        xlarge: Duration,
    },

    #[error("time limit for {size} tests must be positive")]
    NonPositiveTimeLimit { size: TestSize },

    #[error("test '{test_id}' declares conflicting size markers: {}", .markers.join(", "))]
    ConflictingSizeMarkers {
        test_id: String,
        markers: Vec<String>,
    },

    #[error(
        "filesystem allow-list entries cannot target small tests; \
         small tests have no allow-listed paths"
    )]
    AllowListForSmall,

    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Lifecycle precondition violations for blockers, controller, and timer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("{class} blocker must be inactive to activate")]
    AlreadyActive { class: ResourceClass },

    #[error("{class} blocker must be active to deactivate")]
    NotActive { class: ResourceClass },

    #[error("enforcement controller is already armed for test '{test_id}'")]
    AlreadyArmed { test_id: String },

    #[error("enforcement controller is not armed")]
    NotArmed,

    #[error("timer must be running to stop")]
    TimerNotRunning,

    #[error("timer must be stopped to read a duration")]
    TimerNotStopped,
}

/// Raised by the distribution validator in strict distribution mode.
#[derive(Debug, thiserror::Error)]
#[error("test distribution does not meet targets: {}", .failures.join("; "))]
pub struct DistributionError {
    pub failures: Vec<String>,
}
