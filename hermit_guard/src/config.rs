//! # Enforcement Configuration
//!
//! Layered configuration for the enforcement engine, loaded from a
//! `hermit.toml` file. The surface is deliberately small:
//!
//! - **`enforcement_mode`**: run-wide `off` / `warn` / `strict` for resource
//!   and timing enforcement. There are no per-test overrides — that is a
//!   policy decision, not a gap.
//! - **`distribution_mode`**: independent `off` / `warn` / `strict` for the
//!   end-of-run distribution check.
//! - **`[time_limits]`**: per-size wall-clock budgets in seconds. The
//!   ordering invariant `small < medium < large <= xlarge` is checked at load
//!   time; violating it is a configuration error, never a runtime one.
//! - **`[filesystem]`**: extra allow-listed paths per size. Entries for
//!   `small` are rejected — small tests have no allow-list by design.
//!
//! Every error raised here is fatal and aborts the run before any test
//! executes; there is no warn form of a configuration error.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::size::TestSize;
use crate::timing::TimeLimits;

/// Run-wide enforcement mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// No blocker is activated and no record of any kind is produced.
    Off,
    /// Violations are recorded and surfaced as diagnostics; tests pass.
    #[default]
    Warn,
    /// The first denied access fails the test at the point of the attempt.
    Strict,
}

impl EnforcementMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementMode::Off => "off",
            EnforcementMode::Warn => "warn",
            EnforcementMode::Strict => "strict",
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(EnforcementMode::Off),
            "warn" => Ok(EnforcementMode::Warn),
            "strict" => Ok(EnforcementMode::Strict),
            _ => Err(ConfigError::InvalidMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Per-size wall-clock budgets, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct TimeLimitsConfig {
    pub small_seconds: f64,
    pub medium_seconds: f64,
    pub large_seconds: f64,
    pub xlarge_seconds: f64,
}

impl Default for TimeLimitsConfig {
    fn default() -> Self {
        Self {
            small_seconds: 1.0,
            medium_seconds: 300.0,
            large_seconds: 900.0,
            xlarge_seconds: 900.0,
        }
    }
}

impl TimeLimitsConfig {
    /// Convert to validated [`TimeLimits`], enforcing positivity and the
    /// `small < medium < large <= xlarge` ordering invariant.
    pub fn to_limits(&self) -> Result<TimeLimits, ConfigError> {
        for (size, seconds) in [
            (TestSize::Small, self.small_seconds),
            (TestSize::Medium, self.medium_seconds),
            (TestSize::Large, self.large_seconds),
            (TestSize::XLarge, self.xlarge_seconds),
        ] {
            if !(seconds > 0.0) {
                return Err(ConfigError::NonPositiveTimeLimit { size });
            }
        }
        let limits = TimeLimits::from_secs_f64(
            self.small_seconds,
            self.medium_seconds,
            self.large_seconds,
            self.xlarge_seconds,
        );
        limits.validate()?;
        Ok(limits)
    }
}

/// Extra filesystem allow-list entries, keyed by size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct FilesystemConfig {
    /// Paths the filesystem blocker treats as allowed for the keyed size.
    /// Only meaningful for sizes whose policy would otherwise deny; a `small`
    /// key is a configuration error.
    pub extra_allowed_paths: BTreeMap<TestSize, Vec<PathBuf>>,
}

/// The complete configuration consumed by the enforcement engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct GuardConfig {
    pub enforcement_mode: EnforcementMode,
    pub distribution_mode: EnforcementMode,
    pub time_limits: TimeLimitsConfig,
    pub filesystem: FilesystemConfig,
}

impl GuardConfig {
    /// Load and validate a configuration file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GuardConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GuardConfig =
            toml::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every load-time invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.time_limits.to_limits()?;
        if self
            .filesystem
            .extra_allowed_paths
            .contains_key(&TestSize::Small)
        {
            return Err(ConfigError::AllowListForSmall);
        }
        Ok(())
    }

    /// Validated per-size time limits.
    pub fn limits(&self) -> Result<TimeLimits, ConfigError> {
        self.time_limits.to_limits()
    }

    /// Allow-listed paths for `size`. Always empty for small.
    pub fn allowed_paths_for(&self, size: TestSize) -> &[PathBuf] {
        if size == TestSize::Small {
            return &[];
        }
        self.filesystem
            .extra_allowed_paths
            .get(&size)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
