//! Test distribution statistics and validation.
//!
//! Runs once per session, after collection is complete, over the full list of
//! declared sizes. Band targets follow the test pyramid: 80%±5 small, 15%±5
//! medium, 5%±3 large and xlarge combined. On top of the tolerance bands sit
//! unconditional escalation thresholds (small below 50%, medium above 20%,
//! large/xlarge above 8%) that flag pyramid inversion even when the
//! configured bands pass. The validator has its own off/warn/strict mode,
//! independent of resource enforcement.

use serde::Serialize;

use crate::config::EnforcementMode;
use crate::error::DistributionError;
use crate::size::TestSize;

const ONE_HUNDRED_PERCENT: f64 = 100.0;

/// Small tests below this share is always at least a critical warning.
const SMALL_FLOOR_PERCENT: f64 = 50.0;
/// Medium tests above this share is always at least a warning.
const MEDIUM_CEILING_PERCENT: f64 = 20.0;
/// Large/xlarge tests above this share is always at least a warning.
const LARGE_XLARGE_CEILING_PERCENT: f64 = 8.0;

/// Target share and tolerance for one band, both in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionRange {
    pub target: f64,
    pub tolerance: f64,
}

impl DistributionRange {
    pub fn min_value(&self) -> f64 {
        (self.target - self.tolerance).max(0.0)
    }

    pub fn max_value(&self) -> f64 {
        (self.target + self.tolerance).min(ONE_HUNDRED_PERCENT)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_value() && value <= self.max_value()
    }
}

pub const SMALL_TARGET: DistributionRange = DistributionRange {
    target: 80.0,
    tolerance: 5.0,
};
pub const MEDIUM_TARGET: DistributionRange = DistributionRange {
    target: 15.0,
    tolerance: 5.0,
};
pub const LARGE_XLARGE_TARGET: DistributionRange = DistributionRange {
    target: 5.0,
    tolerance: 3.0,
};

/// Count of tests by size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SizeCounts {
    pub small: u64,
    pub medium: u64,
    pub large: u64,
    pub xlarge: u64,
}

impl SizeCounts {
    /// Tally the declared sizes of a full run.
    pub fn tally(sizes: impl IntoIterator<Item = TestSize>) -> Self {
        let mut counts = Self::default();
        for size in sizes {
            counts.bump(size);
        }
        counts
    }

    pub fn bump(&mut self, size: TestSize) {
        match size {
            TestSize::Small => self.small += 1,
            TestSize::Medium => self.medium += 1,
            TestSize::Large => self.large += 1,
            TestSize::XLarge => self.xlarge += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.small + self.medium + self.large + self.xlarge
    }
}

/// Percentage distribution by size, rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SizePercentages {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
    pub xlarge: f64,
}

impl SizePercentages {
    pub fn from_counts(counts: &SizeCounts) -> Self {
        let total = counts.total();
        if total == 0 {
            return Self::default();
        }
        let percent = |count: u64| round2(count as f64 * ONE_HUNDRED_PERCENT / total as f64);
        Self {
            small: percent(counts.small),
            medium: percent(counts.medium),
            large: percent(counts.large),
            xlarge: percent(counts.xlarge),
        }
    }

    /// Combined large + xlarge share, the third band.
    pub fn large_xlarge(&self) -> f64 {
        round2(self.large + self.xlarge)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Verdict for one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandVerdict {
    Pass,
    /// Within the tolerance band but flagged by an escalation threshold.
    Warn,
    /// Outside the tolerance band.
    Fail,
}

/// Observed share of one band against its target range.
#[derive(Debug, Clone, Serialize)]
pub struct BandReport {
    pub name: &'static str,
    pub observed: f64,
    pub range: DistributionRange,
    pub verdict: BandVerdict,
}

/// Everything the session-end distribution check produced.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionStats {
    pub counts: SizeCounts,
    pub percentages: SizePercentages,
    pub bands: Vec<BandReport>,
    /// Escalation flags, present in every mode.
    pub escalations: Vec<String>,
}

impl DistributionStats {
    /// Compute stats for a completed run. An empty run produces all-pass
    /// bands and no escalations: there is nothing to validate.
    pub fn from_counts(counts: SizeCounts) -> Self {
        let percentages = SizePercentages::from_counts(&counts);
        if counts.total() == 0 {
            return Self {
                counts,
                percentages,
                bands: [
                    ("small", SMALL_TARGET),
                    ("medium", MEDIUM_TARGET),
                    ("large_xlarge", LARGE_XLARGE_TARGET),
                ]
                .into_iter()
                .map(|(name, range)| BandReport {
                    name,
                    observed: 0.0,
                    range,
                    verdict: BandVerdict::Pass,
                })
                .collect(),
                escalations: Vec::new(),
            };
        }

        let escalations = escalations_for(&percentages);
        let bands = vec![
            band_report("small", percentages.small, SMALL_TARGET, &escalations),
            band_report("medium", percentages.medium, MEDIUM_TARGET, &escalations),
            band_report(
                "large_xlarge",
                percentages.large_xlarge(),
                LARGE_XLARGE_TARGET,
                &escalations,
            ),
        ];
        Self {
            counts,
            percentages,
            bands,
            escalations,
        }
    }

    /// Band failure messages, empty when every band passes its range.
    pub fn failures(&self) -> Vec<String> {
        self.bands
            .iter()
            .filter(|band| band.verdict == BandVerdict::Fail)
            .map(|band| {
                format!(
                    "{} test percentage ({:.2}%) outside target range {:.2}%-{:.2}%",
                    band.name,
                    band.observed,
                    band.range.min_value(),
                    band.range.max_value()
                )
            })
            .collect()
    }
}

fn band_report(
    name: &'static str,
    observed: f64,
    range: DistributionRange,
    escalations: &[String],
) -> BandReport {
    let verdict = if !range.contains(observed) {
        BandVerdict::Fail
    } else if escalations.iter().any(|flag| flag.starts_with(name)) {
        BandVerdict::Warn
    } else {
        BandVerdict::Pass
    };
    BandReport {
        name,
        observed,
        range,
        verdict,
    }
}

fn escalations_for(percentages: &SizePercentages) -> Vec<String> {
    let mut flags = Vec::new();
    if percentages.small < SMALL_FLOOR_PERCENT {
        flags.push(format!(
            "small test share critically low: {:.2}% (expected at least {SMALL_FLOOR_PERCENT:.0}%); \
             the test pyramid is inverted",
            percentages.small
        ));
    }
    if percentages.medium > MEDIUM_CEILING_PERCENT {
        flags.push(format!(
            "medium test share high: {:.2}% (expected at most {MEDIUM_CEILING_PERCENT:.0}%)",
            percentages.medium
        ));
    }
    if percentages.large_xlarge() > LARGE_XLARGE_CEILING_PERCENT {
        flags.push(format!(
            "large_xlarge test share high: {:.2}% (expected at most {LARGE_XLARGE_CEILING_PERCENT:.0}%)",
            percentages.large_xlarge()
        ));
    }
    flags
}

/// Validated distribution outcome for the session.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionOutcome {
    pub stats: DistributionStats,
    /// Band failures and escalation flags surfaced as warnings (warn and
    /// strict modes; strict promotes band failures to an error instead).
    pub warnings: Vec<String>,
}

/// Session-end distribution check with its own enforcement mode.
#[derive(Debug, Clone)]
pub struct DistributionValidator {
    mode: EnforcementMode,
}

impl DistributionValidator {
    pub fn new(mode: EnforcementMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> EnforcementMode {
        self.mode
    }

    /// Validate the declared sizes of a completed run.
    ///
    /// Off: stats are computed and reported silently. Warn: band failures and
    /// escalation flags become warnings. Strict: any band failure is a
    /// [`DistributionError`]; escalation-only findings stay warnings.
    pub fn validate(
        &self,
        sizes: impl IntoIterator<Item = TestSize>,
    ) -> Result<DistributionOutcome, DistributionError> {
        let stats = DistributionStats::from_counts(SizeCounts::tally(sizes));
        let failures = stats.failures();

        match self.mode {
            EnforcementMode::Off => Ok(DistributionOutcome {
                stats,
                warnings: Vec::new(),
            }),
            EnforcementMode::Warn => {
                let mut warnings = failures;
                warnings.extend(stats.escalations.iter().cloned());
                for warning in &warnings {
                    tracing::warn!(%warning, "test distribution check");
                }
                Ok(DistributionOutcome { stats, warnings })
            }
            EnforcementMode::Strict => {
                if !failures.is_empty() {
                    return Err(DistributionError { failures });
                }
                let warnings: Vec<String> = stats.escalations.clone();
                for warning in &warnings {
                    tracing::warn!(%warning, "test distribution check");
                }
                Ok(DistributionOutcome { stats, warnings })
            }
        }
    }
}
