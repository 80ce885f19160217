//! Analyzer tunables that are not part of the scoring contract.

use serde::{Deserialize, Serialize};

/// Runtime configuration for the analysis pipeline.
///
/// Scoring thresholds are fixed constants in [`crate::score`] and
/// [`crate::learner`]; only collaborator budgets and history length live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Upper bound on the insight-generation round trip.
    pub insight_timeout_secs: u64,
    /// Token budget passed to the text-generation service.
    pub insight_max_tokens: u32,
    /// Number of example meetings kept per observed practice.
    pub example_history: usize,
    /// Skip the insight step entirely when false.
    pub insights_enabled: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            insight_timeout_secs: 30,
            insight_max_tokens: 300,
            example_history: 10,
            insights_enabled: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn insight_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.insight_timeout_secs)
    }
}
