//! End-of-run report for CI integration.
//!
//! Aggregates what the rest of the engine produced over a session — counts by
//! size, the violation summary, per-test records, timing overruns, and the
//! distribution outcome — into one serializable structure. Rendering is the
//! sink's concern; this module only assembles and serializes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EnforcementMode;
use crate::distribution::DistributionOutcome;
use crate::size::TestSize;
use crate::violation::{ViolationCounts, ViolationRecord, ViolationTracker, WarningPayload};

/// One test's line in the report.
#[derive(Debug, Clone, Serialize)]
pub struct TestEntry {
    pub test_id: String,
    pub size: TestSize,
    /// Wall-clock duration in seconds, when the host measured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub violations: Vec<ViolationRecord>,
}

/// The complete session report.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub created: DateTime<Utc>,
    pub enforcement_mode: EnforcementMode,
    pub distribution_mode: EnforcementMode,
    pub total_tests: u64,
    pub violations: ViolationCounts,
    pub timing_overruns: Vec<WarningPayload>,
    pub distribution: DistributionOutcome,
    pub tests: Vec<TestEntry>,
}

impl RunReport {
    /// Assemble the report from the session's collaborators.
    pub fn assemble(
        enforcement_mode: EnforcementMode,
        distribution_mode: EnforcementMode,
        tests: &[(String, TestSize)],
        durations: &BTreeMap<String, f64>,
        tracker: &ViolationTracker,
        timing_overruns: Vec<WarningPayload>,
        distribution: DistributionOutcome,
    ) -> Self {
        let records = tracker.all_records();
        let entries = tests
            .iter()
            .map(|(test_id, size)| TestEntry {
                test_id: test_id.clone(),
                size: *size,
                duration_seconds: durations.get(test_id).copied(),
                violations: records
                    .iter()
                    .filter(|record| &record.test_id == test_id)
                    .cloned()
                    .collect(),
            })
            .collect();

        Self {
            created: Utc::now(),
            enforcement_mode,
            distribution_mode,
            total_tests: tests.len() as u64,
            violations: tracker.summary(),
            timing_overruns,
            distribution,
            tests: entries,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionValidator;
    use crate::policy::ResourceClass;
    use crate::violation::Severity;

    #[test]
    fn report_collates_per_test_violations() {
        let tracker = ViolationTracker::new();
        tracker.record(ViolationRecord {
            class: ResourceClass::Network,
            operation: "api.example.com:443".to_string(),
            test_id: "tests::api::fetch".to_string(),
            severity: Severity::Deny,
        });

        let tests = vec![
            ("tests::api::fetch".to_string(), TestSize::Small),
            ("tests::math::add".to_string(), TestSize::Small),
        ];
        let distribution = DistributionValidator::new(EnforcementMode::Off)
            .validate(tests.iter().map(|(_, size)| *size))
            .unwrap();

        let report = RunReport::assemble(
            EnforcementMode::Warn,
            EnforcementMode::Off,
            &tests,
            &BTreeMap::new(),
            &tracker,
            Vec::new(),
            distribution,
        );

        assert_eq!(report.total_tests, 2);
        assert_eq!(report.violations.network, 1);
        assert_eq!(report.tests[0].violations.len(), 1);
        assert!(report.tests[1].violations.is_empty());

        let json = report.to_json().unwrap();
        assert_eq!(json["violations"]["network"], 1);
        assert_eq!(json["tests"][0]["size"], "small");
    }
}
