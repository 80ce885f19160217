//! Storage layer: compliance records, observed practices, and read-side aggregates.
//!
//! [`ComplianceStore`] is the narrow interface the analyzer writes through.
//! [`MemoryStore`] backs tests and one-shot runs; `DuckStore` (feature
//! `duckdb`) persists across process restarts.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use std::collections::HashMap;

use quorum_core::{MeetingComplianceRecord, ObservedPractice, PracticeKey};

/// Outcome of [`ComplianceStore::observe_practice`].
#[derive(Debug, Clone, PartialEq)]
pub enum PracticeUpdate {
    /// The observation was new and the practice was updated.
    Recorded(ObservedPractice),
    /// This meeting was already counted for the key; state is unchanged.
    AlreadyObserved(ObservedPractice),
}

impl PracticeUpdate {
    pub fn practice(&self) -> &ObservedPractice {
        match self {
            Self::Recorded(p) | Self::AlreadyObserved(p) => p,
        }
    }
}

/// Read-modify-write closure applied to the current state of one practice key.
pub type PracticeApply<'a> = dyn FnMut(Option<ObservedPractice>) -> ObservedPractice + 'a;

/// Persistence for analyzer output and shared learning state.
///
/// Implementations must apply [`observe_practice`](Self::observe_practice)
/// atomically per key: the read, the closure, the write, and the ledger
/// entry happen under one lock.
pub trait ComplianceStore: Send + Sync {
    /// Insert or replace the record for `(meeting_id, process_type)`.
    fn upsert_record(&self, record: &MeetingComplianceRecord) -> Result<(), StoreError>;

    fn get_record(
        &self,
        meeting_id: &str,
        process_type: &str,
    ) -> Result<Option<MeetingComplianceRecord>, StoreError>;

    /// All records ordered by `(meeting_id, process_type)`.
    fn records(&self) -> Result<Vec<MeetingComplianceRecord>, StoreError>;

    /// Update `key` with `apply` unless `meeting_id` was already counted for it.
    fn observe_practice(
        &self,
        key: &PracticeKey,
        meeting_id: &str,
        apply: &mut PracticeApply<'_>,
    ) -> Result<PracticeUpdate, StoreError>;

    fn get_practice(&self, key: &PracticeKey) -> Result<Option<ObservedPractice>, StoreError>;

    /// Practices for a process type, most frequent first.
    fn practices(&self, process_type: &str) -> Result<Vec<ObservedPractice>, StoreError>;

    /// Mean compliance score over all records; `None` when there are none.
    fn average_compliance_score(&self) -> Result<Option<f64>, StoreError> {
        Ok(mean(self.records()?.iter().map(|r| r.compliance_score)))
    }

    /// Mean timeline score over all records; `None` when there are none.
    fn average_timeline_score(&self) -> Result<Option<f64>, StoreError> {
        Ok(mean(self.records()?.iter().map(|r| r.timeline_score)))
    }

    /// The `n` most frequent flags with counts, ties broken alphabetically.
    fn top_flags(&self, n: usize) -> Result<Vec<(String, u64)>, StoreError> {
        Ok(count_flags(&self.records()?, n))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Count flag occurrences across records and keep the top `n`.
pub fn count_flags(records: &[MeetingComplianceRecord], n: usize) -> Vec<(String, u64)> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for flag in records.iter().flat_map(|r| r.flags.iter()) {
        *counts.entry(flag.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(flag, count)| (flag.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Order practices for display: most frequent first, then by pattern.
pub(crate) fn rank_practices(practices: &mut [ObservedPractice]) {
    practices.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.pattern.cmp(&b.pattern))
    });
}
