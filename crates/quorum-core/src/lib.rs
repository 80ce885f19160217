//! Core of the process compliance analyzer: data model, step catalog,
//! evidence aggregation, heuristic step detection, scoring, and the pure
//! observed-practice learning rules.

pub mod config;
pub mod detect;
mod error;
pub mod evidence;
pub mod learner;
pub mod model;
pub mod registry;
pub mod schema;
pub mod score;
pub mod step_key;
pub mod timeline;

pub use config::AnalyzerConfig;
pub use error::CoreError;
pub use evidence::{DocumentSource, EvidenceCorpus, ExtractedText, TextExtractor};
pub use model::{
    Document, Meeting, MeetingComplianceRecord, ObservedPractice, PracticeExample, PracticeKey,
    ProcessStep,
};
pub use registry::ProcessStepRegistry;
