//! Test size categories and their derived properties.
//!
//! A test's size is the single input to every policy decision in this crate:
//! it determines the network rule, the binary resource rules, the thread
//! monitoring rule, and the default wall-clock budget. Sizes are ordered
//! (`Small < Medium < Large < XLarge`) so configured time limits can be
//! checked against the `small < medium < large <= xlarge` invariant at load
//! time.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Test size categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TestSize {
    Small,
    Medium,
    Large,
    XLarge,
}

impl TestSize {
    /// All sizes, in ascending order.
    pub const ALL: [TestSize; 4] = [
        TestSize::Small,
        TestSize::Medium,
        TestSize::Large,
        TestSize::XLarge,
    ];

    /// Uppercase name as shown in labels and error messages.
    pub fn name(self) -> &'static str {
        match self {
            TestSize::Small => "SMALL",
            TestSize::Medium => "MEDIUM",
            TestSize::Large => "LARGE",
            TestSize::XLarge => "XLARGE",
        }
    }

    /// The marker name a test declares to claim this size.
    pub fn marker_name(self) -> &'static str {
        match self {
            TestSize::Small => "small",
            TestSize::Medium => "medium",
            TestSize::Large => "large",
            TestSize::XLarge => "xlarge",
        }
    }

    /// Label shown next to a test in run output, e.g. `[SMALL]`.
    pub fn label(self) -> String {
        format!("[{}]", self.name())
    }

    /// Human-readable description for marker registration.
    pub fn description(self) -> String {
        format!("mark test as {} size", self.name())
    }

    /// Default wall-clock budget for this size.
    pub fn default_time_limit(self) -> Duration {
        match self {
            TestSize::Small => Duration::from_secs(1),
            TestSize::Medium => Duration::from_secs(300),
            TestSize::Large | TestSize::XLarge => Duration::from_secs(900),
        }
    }
}

impl fmt::Display for TestSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker_name())
    }
}

impl FromStr for TestSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(TestSize::Small),
            "medium" => Ok(TestSize::Medium),
            "large" => Ok(TestSize::Large),
            "xlarge" => Ok(TestSize::XLarge),
            _ => Err(ConfigError::InvalidSize {
                value: s.to_string(),
            }),
        }
    }
}

/// Resolve a test's declared size from its marker list.
///
/// Returns `Ok(None)` when no size marker is present. A test declaring more
/// than one distinct size marker is a collection-time configuration error;
/// repeating the same marker (e.g. inherited from a base class and declared
/// again on the test) is not a conflict.
pub fn resolve_size<'a, I>(test_id: &str, markers: I) -> Result<Option<TestSize>, ConfigError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut declared: Vec<TestSize> = Vec::new();
    for marker in markers {
        if let Ok(size) = marker.parse::<TestSize>()
            && !declared.contains(&size)
        {
            declared.push(size);
        }
    }

    match declared.as_slice() {
        [] => Ok(None),
        [size] => Ok(Some(*size)),
        conflicting => Err(ConfigError::ConflictingSizeMarkers {
            test_id: test_id.to_string(),
            markers: conflicting.iter().map(|s| s.marker_name().to_string()).collect(),
        }),
    }
}
