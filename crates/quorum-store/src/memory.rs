//! In-process store guarded by a single global lock.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use quorum_core::{MeetingComplianceRecord, ObservedPractice, PracticeKey};
use tracing::debug;

use crate::{rank_practices, ComplianceStore, PracticeApply, PracticeUpdate, StoreError};

#[derive(Default)]
struct Inner {
    records: BTreeMap<(String, String), MeetingComplianceRecord>,
    practices: BTreeMap<PracticeKey, ObservedPractice>,
    ledger: HashSet<(PracticeKey, String)>,
}

/// Ephemeral store; all state is lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ComplianceStore for MemoryStore {
    fn upsert_record(&self, record: &MeetingComplianceRecord) -> Result<(), StoreError> {
        let key = (record.meeting_id.clone(), record.process_type.clone());
        self.lock()?.records.insert(key, record.clone());
        Ok(())
    }

    fn get_record(
        &self,
        meeting_id: &str,
        process_type: &str,
    ) -> Result<Option<MeetingComplianceRecord>, StoreError> {
        let key = (meeting_id.to_string(), process_type.to_string());
        Ok(self.lock()?.records.get(&key).cloned())
    }

    fn records(&self) -> Result<Vec<MeetingComplianceRecord>, StoreError> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    fn observe_practice(
        &self,
        key: &PracticeKey,
        meeting_id: &str,
        apply: &mut PracticeApply<'_>,
    ) -> Result<PracticeUpdate, StoreError> {
        let mut inner = self.lock()?;
        let ledger_key = (key.clone(), meeting_id.to_string());
        let existing = inner.practices.get(key).cloned();

        if let Some(practice) = &existing
            && inner.ledger.contains(&ledger_key)
        {
            debug!(key = %key, meeting_id, "practice already observed for meeting");
            return Ok(PracticeUpdate::AlreadyObserved(practice.clone()));
        }

        let updated = apply(existing);
        inner.practices.insert(key.clone(), updated.clone());
        inner.ledger.insert(ledger_key);
        Ok(PracticeUpdate::Recorded(updated))
    }

    fn get_practice(&self, key: &PracticeKey) -> Result<Option<ObservedPractice>, StoreError> {
        Ok(self.lock()?.practices.get(key).cloned())
    }

    fn practices(&self, process_type: &str) -> Result<Vec<ObservedPractice>, StoreError> {
        let mut out: Vec<ObservedPractice> = self
            .lock()?
            .practices
            .values()
            .filter(|p| p.process_type == process_type)
            .cloned()
            .collect();
        rank_practices(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn record(
        meeting_id: &str,
        compliance: f64,
        timeline: f64,
        flags: &[&str],
    ) -> MeetingComplianceRecord {
        MeetingComplianceRecord {
            meeting_id: meeting_id.into(),
            process_type: "ABC Review".into(),
            steps_completed: vec![],
            steps_skipped: vec![],
            steps_added: vec![],
            expected_days: 20,
            actual_days: 20,
            variance_days: 0,
            compliance_score: compliance,
            timeline_score: timeline,
            overall_score: 0.6 * compliance + 0.4 * timeline,
            deviation: !flags.is_empty(),
            flags: flags.iter().map(|s| s.to_string()).collect(),
            insight: None,
            recommendations: vec![],
            analyzed_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn bump(existing: Option<ObservedPractice>) -> ObservedPractice {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        match existing {
            Some(mut p) => {
                p.frequency += 1;
                p
            }
            None => ObservedPractice {
                process_type: "ABC Review".into(),
                pattern: "step:abc-review.001".into(),
                description: String::new(),
                frequency: 1,
                first_observed: t,
                last_observed: t,
                confidence: 0.1,
                average_duration_days: None,
                deviates: false,
                deviation_rationale: None,
                examples: vec![],
            },
        }
    }

    fn key() -> PracticeKey {
        PracticeKey::new("ABC Review", "step:abc-review.001")
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let store = MemoryStore::new();
        store.upsert_record(&record("m1", 0.5, 1.0, &[])).unwrap();
        store.upsert_record(&record("m1", 1.0, 1.0, &[])).unwrap();

        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].compliance_score, 1.0);
        assert!(store.get_record("m1", "ABC Review").unwrap().is_some());
        assert!(store.get_record("m1", "Other").unwrap().is_none());
    }

    #[test]
    fn aggregates_over_records() {
        let store = MemoryStore::new();
        assert_eq!(store.average_compliance_score().unwrap(), None);

        store
            .upsert_record(&record("m1", 0.5, 1.0, &["minimal_documentation"]))
            .unwrap();
        store
            .upsert_record(&record(
                "m2",
                1.0,
                0.5,
                &["minimal_documentation", "significant_timeline_delay"],
            ))
            .unwrap();
        store
            .upsert_record(&record("m3", 0.0, 0.0, &["missing_2_required_steps"]))
            .unwrap();

        assert_eq!(store.average_compliance_score().unwrap(), Some(0.5));
        assert_eq!(store.average_timeline_score().unwrap(), Some(0.5));

        let top = store.top_flags(2).unwrap();
        assert_eq!(top[0], ("minimal_documentation".to_string(), 2));
        assert_eq!(top[1], ("missing_2_required_steps".to_string(), 1));
    }

    #[test]
    fn observe_is_idempotent_per_meeting() {
        let store = MemoryStore::new();
        let first = store.observe_practice(&key(), "m1", &mut bump).unwrap();
        assert!(matches!(first, PracticeUpdate::Recorded(_)));

        let again = store.observe_practice(&key(), "m1", &mut bump).unwrap();
        assert!(matches!(again, PracticeUpdate::AlreadyObserved(_)));
        assert_eq!(again.practice().frequency, 1);

        store.observe_practice(&key(), "m2", &mut bump).unwrap();
        assert_eq!(store.get_practice(&key()).unwrap().unwrap().frequency, 2);
    }

    #[test]
    fn concurrent_observations_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let meeting = format!("m{t}-{i}");
                        store.observe_practice(&key(), &meeting, &mut bump).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get_practice(&key()).unwrap().unwrap().frequency, 200);
    }

    #[test]
    fn practices_ranked_by_frequency() {
        let store = MemoryStore::new();
        let other = PracticeKey::new("ABC Review", "added:workshop");
        let mut make_other = |existing: Option<ObservedPractice>| {
            let mut p = bump(existing);
            p.pattern = "added:workshop".into();
            p
        };
        store.observe_practice(&other, "m1", &mut make_other).unwrap();
        store.observe_practice(&key(), "m1", &mut bump).unwrap();
        store.observe_practice(&key(), "m2", &mut bump).unwrap();

        let listed = store.practices("ABC Review").unwrap();
        let patterns: Vec<&str> = listed.iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["step:abc-review.001", "added:workshop"]);
        assert!(store.practices("Stock Assessment Review").unwrap().is_empty());
    }
}
