//! Violation records and the per-run tracker.
//!
//! A [`ViolationRecord`] is an immutable description of one denied or flagged
//! access attempt. Records are appended in detection order, keyed by the
//! owning test, and never mutated. The [`ViolationTracker`] is shared between
//! the blockers (writers) and the enforcement controller / report sink
//! (readers) for the lifetime of one worker.

use std::sync::Mutex;

use serde::Serialize;

use crate::policy::ResourceClass;
use crate::size::TestSize;

/// Whether a record denotes a denied access or a monitor-only observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The attempted call was denied (or suppressed in warn mode).
    Deny,
    /// The attempt was allowed to proceed and only flagged (thread monitor).
    Monitor,
}

/// One denied or flagged access attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    pub class: ResourceClass,
    /// Class-specific operation descriptor: `host:port`, `write /etc/hosts`,
    /// a command line, an engine + connection target, a worker count, or a
    /// sleep duration.
    pub operation: String,
    pub test_id: String,
    pub severity: Severity,
}

/// Violation counts by resource class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViolationCounts {
    pub network: u64,
    pub filesystem: u64,
    pub process: u64,
    pub database: u64,
    pub thread: u64,
    pub sleep: u64,
}

impl ViolationCounts {
    pub fn total(&self) -> u64 {
        self.network + self.filesystem + self.process + self.database + self.thread + self.sleep
    }

    fn bump(&mut self, class: ResourceClass) {
        match class {
            ResourceClass::Network => self.network += 1,
            ResourceClass::Filesystem => self.filesystem += 1,
            ResourceClass::Process => self.process += 1,
            ResourceClass::Database => self.database += 1,
            ResourceClass::Thread => self.thread += 1,
            ResourceClass::Sleep => self.sleep += 1,
        }
    }
}

/// A non-fatal diagnostic with the same shape as the typed violation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningPayload {
    /// Resource class name, or `"timing"`.
    pub kind: String,
    pub test_id: String,
    pub size: TestSize,
    pub descriptor: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    records: Vec<ViolationRecord>,
    counts: ViolationCounts,
}

/// Thread-safe tracker of violations across a test run.
///
/// One instance per worker; blockers record into it while active, the
/// controller reads a test's records back at disarm time, and the run report
/// consumes the whole sequence at session end.
#[derive(Debug, Default)]
pub struct ViolationTracker {
    inner: Mutex<TrackerInner>,
}

impl ViolationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Insertion order is detection order.
    pub fn record(&self, record: ViolationRecord) {
        let mut inner = self.lock();
        inner.counts.bump(record.class);
        inner.records.push(record);
    }

    /// Snapshot of the aggregate counts by class.
    pub fn summary(&self) -> ViolationCounts {
        self.lock().counts
    }

    /// Records owned by one test, in detection order.
    pub fn test_records(&self, test_id: &str) -> Vec<ViolationRecord> {
        self.lock()
            .records
            .iter()
            .filter(|r| r.test_id == test_id)
            .cloned()
            .collect()
    }

    /// Every record of the run, in detection order.
    pub fn all_records(&self) -> Vec<ViolationRecord> {
        self.lock().records.clone()
    }

    /// Clear all recorded violations and counts.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.records.clear();
        inner.counts = ViolationCounts::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
