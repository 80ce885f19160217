//! Process step registry: the formal step catalog per process type.
//!
//! Lookups are keyed by the process-type slug, so "ABC Review" and
//! "abc review" resolve to the same catalog. An unknown process type yields
//! an empty slice, which the scorer treats as vacuously compliant.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::step_key::slugify;
use crate::{CoreError, ProcessStep};

/// Ordered step catalogs keyed by process-type slug.
#[derive(Debug, Clone, Default)]
pub struct ProcessStepRegistry {
    catalogs: BTreeMap<String, Vec<ProcessStep>>,
}

impl ProcessStepRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a flat list of steps, grouping by process type.
    pub fn from_steps(steps: impl IntoIterator<Item = ProcessStep>) -> Self {
        let mut catalogs: BTreeMap<String, Vec<ProcessStep>> = BTreeMap::new();
        for step in steps {
            catalogs
                .entry(slugify(&step.process_type))
                .or_default()
                .push(step);
        }
        for steps in catalogs.values_mut() {
            steps.sort_by_key(|s| s.step_number);
        }
        Self { catalogs }
    }

    /// Registry preloaded with the catalogs shipped with Quorum.
    pub fn builtin() -> Self {
        Self::from_steps(builtin_steps())
    }

    /// Load a JSON array of [`ProcessStep`] from disk.
    pub fn load_json(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(CoreError::CatalogNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let steps: Vec<ProcessStep> = serde_json::from_slice(&bytes)?;
        let registry = Self::from_steps(steps);
        info!(
            path = %path.display(),
            process_types = registry.catalogs.len(),
            "loaded step catalog"
        );
        Ok(registry)
    }

    /// Replace or add every process type present in `other`.
    pub fn merge(&mut self, other: ProcessStepRegistry) {
        for (slug, steps) in other.catalogs {
            debug!(process_type = %slug, steps = steps.len(), "catalog replaced");
            self.catalogs.insert(slug, steps);
        }
    }

    /// Ordered steps for a process type; empty if the type is unknown.
    pub fn get_steps(&self, process_type: &str) -> &[ProcessStep] {
        self.catalogs
            .get(&slugify(process_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The catalog's own spelling of `process_type`, or the input itself
    /// when the type is unknown.
    pub fn canonical_name<'a>(&'a self, process_type: &'a str) -> &'a str {
        self.get_steps(process_type)
            .first()
            .map(|s| s.process_type.as_str())
            .unwrap_or(process_type)
    }

    /// Display names of all known process types.
    pub fn process_types(&self) -> Vec<&str> {
        self.catalogs
            .values()
            .filter_map(|steps| steps.first().map(|s| s.process_type.as_str()))
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn step(
    process_type: &str,
    step_number: u32,
    name: &str,
    description: &str,
    deliverables: &[&str],
    duration: u32,
    parties: &[&str],
    prerequisites: &[u32],
    required: bool,
) -> ProcessStep {
    ProcessStep {
        process_type: process_type.to_string(),
        step_number,
        name: name.to_string(),
        description: description.to_string(),
        required_deliverables: deliverables.iter().map(|s| s.to_string()).collect(),
        typical_duration_days: Some(duration),
        responsible_parties: parties.iter().map(|s| s.to_string()).collect(),
        prerequisites: prerequisites
            .iter()
            .map(|&n| crate::step_key::step_id(process_type, n))
            .collect(),
        required,
        source_document: Some("Council Operating Procedures".to_string()),
    }
}

fn builtin_steps() -> Vec<ProcessStep> {
    const ABC: &str = "ABC Review";
    const SAR: &str = "Stock Assessment Review";

    vec![
        step(
            ABC,
            1,
            "Plan Team Review",
            "Plan Team reviews stock assessments and proposes catch levels.",
            &["SAFE report"],
            14,
            &["Plan Team"],
            &[],
            true,
        ),
        step(
            ABC,
            2,
            "SSC Recommendation",
            "Scientific and Statistical Committee sets ABC and OFL recommendations.",
            &["SSC report", "ABC recommendation"],
            7,
            &["SSC"],
            &[1],
            true,
        ),
        step(
            ABC,
            3,
            "Advisory Panel Discussion",
            "Advisory Panel discusses specifications and forwards motions.",
            &["AP motion"],
            3,
            &["Advisory Panel"],
            &[2],
            false,
        ),
        step(
            ABC,
            4,
            "Council Final Action",
            "Council adopts harvest specifications.",
            &["harvest specifications"],
            2,
            &["Council"],
            &[2],
            true,
        ),
        step(
            SAR,
            1,
            "Data Compilation",
            "Survey and fishery data are compiled for the assessment.",
            &["data report"],
            30,
            &["Assessment Authors"],
            &[],
            true,
        ),
        step(
            SAR,
            2,
            "Assessment Presentation",
            "Authors present the assessment model and results.",
            &["stock assessment"],
            1,
            &["Assessment Authors"],
            &[1],
            true,
        ),
        step(
            SAR,
            3,
            "Independent Peer Review",
            "External reviewers evaluate the assessment.",
            &["CIE review report"],
            60,
            &["Center for Independent Experts"],
            &[2],
            false,
        ),
        step(
            SAR,
            4,
            "Plan Team Review",
            "Plan Team reviews the assessment and endorses a model.",
            &["SAFE chapter"],
            14,
            &["Plan Team"],
            &[2],
            true,
        ),
        step(
            SAR,
            5,
            "SSC Review",
            "SSC accepts the assessment for management use.",
            &["SSC minutes"],
            7,
            &["SSC"],
            &[4],
            true,
        ),
    ]
}
