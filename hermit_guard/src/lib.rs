//! # hermit_guard
//!
//! Resource-isolation enforcement for size-categorized test suites.
//!
//! Tests declare a size (small, medium, large, xlarge). Each size maps to a
//! policy over six resource classes — network, filesystem, process spawning,
//! database connections, concurrent workers, and timed sleeps — plus a
//! wall-clock budget. During a test's execution window the enforcement
//! controller activates one interposition adapter per restricted class; the
//! crate's guarded entry points then route every access attempt through the
//! active blocker, which allows it, records and suppresses it (warn mode), or
//! fails the test at the point of the attempt (strict mode). A separate
//! validator checks the size distribution of the whole suite against test
//! pyramid targets once the run is known.
//!
//! Enforcement is in-process, advisory, and cooperative — this is not a
//! sandbox, and a test that captured raw OS handles before the window opened
//! is not stopped.
//!
//! ## Typical flow
//!
//! ```rust
//! use hermit_guard::blocker::network::checked_connect;
//! use hermit_guard::config::EnforcementMode;
//! use hermit_guard::controller::{EnforcementController, TestContext};
//! use hermit_guard::size::TestSize;
//!
//! let controller = EnforcementController::new(EnforcementMode::Warn);
//! let ctx = TestContext::new("tests::api::fetch_user", TestSize::Small);
//!
//! let (_, outcome) = controller
//!     .enforce(&ctx, || {
//!         // The test body. A real suite routes its network seam through
//!         // checked_connect; under warn mode this records and suppresses.
//!         checked_connect("api.example.com", 443)
//!     })
//!     .unwrap();
//!
//! assert_eq!(outcome.warnings.len(), 1);
//! ```

pub mod blocker;
pub mod config;
pub mod controller;
pub mod distribution;
pub mod error;
pub mod policy;
pub mod report;
pub mod size;
pub mod timing;
pub mod utils;
pub mod violation;

pub use blocker::{Access, ActivationContext, BlockerState, ResourceBlocker};
pub use config::{EnforcementMode, GuardConfig};
pub use controller::{EnforcementController, TestContext, TestOutcome};
pub use distribution::{DistributionStats, DistributionValidator};
pub use error::{ConfigError, DistributionError, HermeticityViolation, StateError};
pub use policy::{ResourceClass, ResourcePolicy, policy_for};
pub use report::RunReport;
pub use size::{TestSize, resolve_size};
pub use timing::{TimeLimits, TimingValidator, WallTimer};
pub use violation::{Severity, ViolationRecord, ViolationTracker, WarningPayload};
