//! Analysis pipeline for one meeting against one process type.
//!
//! Evidence → detection → timeline → scoring → persisted record → learner
//! update → best-effort insight. Only store failures reach the caller;
//! everything upstream of persistence degrades instead of failing.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use quorum_ai::{InsightRequestor, InsightSummary};
use quorum_core::detect::{detect_match, identify_additional_practices};
use quorum_core::evidence::collect_evidence;
use quorum_core::learner::{observe, plan_observations};
use quorum_core::score::{recommendations, score};
use quorum_core::step_key::slugify;
use quorum_core::timeline::{self, TimelineAnalysis};
use quorum_core::{
    AnalyzerConfig, DocumentSource, Meeting, MeetingComplianceRecord, ProcessStep,
    ProcessStepRegistry, TextExtractor,
};
use quorum_store::{ComplianceStore, PracticeUpdate, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("meeting {meeting_id} could not be analyzed: {source}")]
    Persistence {
        meeting_id: String,
        source: StoreError,
    },
}

impl AnalysisError {
    pub fn meeting_id(&self) -> &str {
        match self {
            Self::Persistence { meeting_id, .. } => meeting_id,
        }
    }
}

/// Wires the step catalog, the store, and the optional collaborators.
pub struct Analyzer {
    registry: ProcessStepRegistry,
    store: Arc<dyn ComplianceStore>,
    extractor: Option<Arc<dyn TextExtractor>>,
    documents: Option<Arc<dyn DocumentSource>>,
    insight: Option<InsightRequestor>,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(registry: ProcessStepRegistry, store: Arc<dyn ComplianceStore>) -> Self {
        Self {
            registry,
            store,
            extractor: None,
            documents: None,
            insight: None,
            config: AnalyzerConfig::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Used to list documents for meetings that arrive without any.
    pub fn with_document_source(mut self, documents: Arc<dyn DocumentSource>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_insight(mut self, insight: InsightRequestor) -> Self {
        self.insight = Some(insight);
        self
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ProcessStepRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ComplianceStore> {
        &self.store
    }

    /// Analyze `meeting` against `process_type`, persist the record, and
    /// feed the observed-practice learner.
    ///
    /// Re-analyzing an unchanged meeting replaces its record and leaves
    /// practice counters untouched. Records and practices are keyed by the
    /// catalog's spelling of the process type, whatever the caller passed.
    pub async fn analyze(
        &self,
        meeting: &Meeting,
        process_type: &str,
    ) -> Result<MeetingComplianceRecord, AnalysisError> {
        let process_type = self.registry.canonical_name(process_type);
        let formal = self.registry.get_steps(process_type);
        if formal.is_empty() {
            warn!(
                meeting_id = %meeting.id,
                process_type,
                "no formal steps for process type; scoring as vacuously compliant"
            );
        }

        let meeting = self.with_documents(meeting).await;
        let corpus = collect_evidence(&meeting, self.extractor.as_deref()).await;

        let mut completed: Vec<&ProcessStep> = Vec::new();
        let mut skipped: Vec<&ProcessStep> = Vec::new();
        for step in formal {
            match detect_match(step, &corpus) {
                Some(matched) => {
                    debug!(step = %step.id(), ?matched, "step detected");
                    completed.push(step);
                }
                None if step.required => skipped.push(step),
                None => {}
            }
        }
        let added = identify_additional_practices(&corpus, formal);

        let timeline = timeline::analyze(&meeting, formal);
        let completed_ids: Vec<String> = completed.iter().map(|s| s.id()).collect();
        let scored = score(&completed_ids, formal, &timeline, corpus.document_count);
        let recommendations = recommendations(&skipped, &scored.flags, &timeline);

        let analyzed_at = Utc::now();
        let mut record = MeetingComplianceRecord {
            meeting_id: meeting.id.clone(),
            process_type: process_type.to_string(),
            steps_completed: completed_ids,
            steps_skipped: skipped.iter().map(|s| s.id()).collect(),
            steps_added: added.iter().map(|label| slugify(label)).collect(),
            expected_days: timeline.expected_days,
            actual_days: timeline.actual_days,
            variance_days: timeline.variance_days,
            compliance_score: scored.compliance_score,
            timeline_score: scored.timeline_score,
            overall_score: scored.overall_score,
            deviation: scored.deviation(),
            flags: scored.flags,
            insight: None,
            recommendations,
            analyzed_at,
        };

        self.persist(&record)?;
        self.learn(&meeting, process_type, &completed, &skipped, &added, &timeline)?;

        if self.config.insights_enabled
            && let Some(requestor) = &self.insight
        {
            let summary = InsightSummary {
                meeting_id: meeting.id.clone(),
                meeting_title: meeting.title.clone(),
                process_type: process_type.to_string(),
                formal_step_count: formal.len(),
                completed_count: completed.len(),
                skipped_count: skipped.len(),
                skipped_steps: skipped.iter().map(|s| s.name.clone()).collect(),
                added_practices: added.iter().map(|l| l.to_string()).collect(),
                variance_days: timeline.variance_days,
            };
            record.insight = Some(requestor.request(&summary).await);
            self.persist(&record)?;
        }

        info!(
            meeting_id = %record.meeting_id,
            process_type,
            compliance = record.compliance_score,
            timeline = record.timeline_score,
            overall = record.overall_score,
            flags = record.flags.len(),
            "meeting analyzed"
        );
        Ok(record)
    }

    /// Analyze many `(meeting, process_type)` jobs with at most
    /// `concurrency` in flight. Results come back in completion order.
    pub async fn analyze_batch(
        &self,
        jobs: Vec<(Meeting, String)>,
        concurrency: usize,
    ) -> Vec<Result<MeetingComplianceRecord, AnalysisError>> {
        stream::iter(jobs)
            .map(|(meeting, process_type)| async move {
                self.analyze(&meeting, &process_type).await
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }

    async fn with_documents(&self, meeting: &Meeting) -> Meeting {
        let mut meeting = meeting.clone();
        if !meeting.documents.is_empty() {
            return meeting;
        }
        let Some(source) = &self.documents else {
            return meeting;
        };

        match source.documents(&meeting.id).await {
            Ok(docs) => {
                debug!(meeting_id = %meeting.id, count = docs.len(), "documents listed");
                meeting.documents = docs;
            }
            Err(e) => {
                warn!(meeting_id = %meeting.id, error = %e, "document listing failed");
            }
        }
        meeting
    }

    fn persist(&self, record: &MeetingComplianceRecord) -> Result<(), AnalysisError> {
        self.store
            .upsert_record(record)
            .map_err(|source| AnalysisError::Persistence {
                meeting_id: record.meeting_id.clone(),
                source,
            })
    }

    fn learn(
        &self,
        meeting: &Meeting,
        process_type: &str,
        completed: &[&ProcessStep],
        skipped: &[&ProcessStep],
        added: &[&str],
        timeline: &TimelineAnalysis,
    ) -> Result<(), AnalysisError> {
        let history = self.config.example_history;
        let observations = plan_observations(
            meeting,
            process_type,
            completed,
            skipped,
            added,
            timeline,
            Utc::now(),
        );

        let mut recorded = 0usize;
        for (key, obs) in &observations {
            let update = self
                .store
                .observe_practice(key, &meeting.id, &mut |existing| {
                    observe(existing, key, obs, history)
                })
                .map_err(|source| AnalysisError::Persistence {
                    meeting_id: meeting.id.clone(),
                    source,
                })?;
            if let PracticeUpdate::Recorded(practice) = update {
                debug!(
                    key = %key,
                    frequency = practice.frequency,
                    confidence = practice.confidence,
                    "practice observed"
                );
                recorded += 1;
            }
        }

        if recorded < observations.len() {
            debug!(
                meeting_id = %meeting.id,
                skipped = observations.len() - recorded,
                "meeting already counted for some practices"
            );
        }
        Ok(())
    }
}
