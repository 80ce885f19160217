//! Shared data model for meetings, formal process steps, and compliance output.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::step_key;

/// A formally defined step within a named process type.
///
/// Extracted from policy documents by ingestion and read-only to the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub process_type: String,
    /// 1-based position within the process.
    pub step_number: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_deliverables: Vec<String>,
    #[serde(default)]
    pub typical_duration_days: Option<u32>,
    #[serde(default)]
    pub responsible_parties: Vec<String>,
    /// Step identifiers (see [`step_key::step_id`]) that must precede this one.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub source_document: Option<String>,
}

fn default_required() -> bool {
    true
}

impl ProcessStep {
    /// Stable identifier, e.g. `abc-review.002`.
    pub fn id(&self) -> String {
        step_key::step_id(&self.process_type, self.step_number)
    }
}

/// A document attached to a meeting (agenda, briefing book, report, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub type_label: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub upload_date: Option<DateTime<Utc>>,
}

/// One recorded meeting of the committee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub type_label: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Key for the shared observed-practice state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PracticeKey {
    pub process_type: String,
    pub pattern: String,
}

impl PracticeKey {
    pub fn new(process_type: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            process_type: process_type.into(),
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for PracticeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.process_type, self.pattern)
    }
}

/// A meeting in which a practice was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeExample {
    pub meeting_id: String,
    pub meeting_title: String,
    pub observed_on: DateTime<Utc>,
}

/// A learned record of how often a pattern actually occurs for a process type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedPractice {
    pub process_type: String,
    pub pattern: String,
    pub description: String,
    /// Never decreases.
    pub frequency: u64,
    pub first_observed: DateTime<Utc>,
    pub last_observed: DateTime<Utc>,
    /// Bounded to `[0, 1]`.
    pub confidence: f64,
    pub average_duration_days: Option<f64>,
    pub deviates: bool,
    pub deviation_rationale: Option<String>,
    /// Most recent observations, oldest first.
    pub examples: Vec<PracticeExample>,
}

impl ObservedPractice {
    pub fn key(&self) -> PracticeKey {
        PracticeKey::new(&self.process_type, &self.pattern)
    }
}

/// Result of analysing one meeting against one process type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingComplianceRecord {
    pub meeting_id: String,
    pub process_type: String,
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
    pub steps_added: Vec<String>,
    pub expected_days: i64,
    pub actual_days: i64,
    pub variance_days: i64,
    pub compliance_score: f64,
    pub timeline_score: f64,
    pub overall_score: f64,
    pub deviation: bool,
    pub flags: Vec<String>,
    pub insight: Option<String>,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}
