//! Heuristic step detection over an evidence corpus.
//!
//! A formal step counts as completed on the first of:
//!
//! 1. any required deliverable label appears in the corpus
//! 2. the step name itself appears in the corpus
//! 3. the step name contains a category word (see [`CATEGORY_INDICATORS`])
//!    and the corpus contains one of that category's indicator phrases
//!
//! The rules favour recall: a stray keyword is enough to mark a step done.
//! The indicator tables are data, so new categories need no new branches.

use crate::evidence::EvidenceCorpus;
use crate::step_key::slugify;
use crate::ProcessStep;

/// Category word in a step name → phrases that indicate the activity happened.
pub const CATEGORY_INDICATORS: &[(&str, &[&str])] = &[
    ("review", &["reviewed", "review of", "evaluated", "evaluation"]),
    (
        "recommendation",
        &["recommend", "recommended", "recommendations", "advice"],
    ),
    ("presentation", &["presented", "presentation", "slides"]),
    ("discussion", &["discussed", "discussion", "deliberation"]),
    ("vote", &["vote", "voted", "motion passed", "roll call"]),
    ("action", &["final action", "took action", "adopted", "approved"]),
    ("comment", &["public comment", "comments received", "testimony"]),
];

/// Informal activities that committees commonly add, with their indicators.
pub const INFORMAL_PRACTICES: &[(&str, &[&str])] = &[
    (
        "Public Comment Period",
        &["public comment", "public testimony", "comment period"],
    ),
    (
        "Webinar Presentation",
        &["webinar", "virtual presentation", "online presentation"],
    ),
    (
        "Expert Testimony",
        &["expert testimony", "invited expert", "guest speaker"],
    ),
    ("Joint Session", &["joint session", "joint meeting"]),
    ("Workshop", &["workshop"]),
];

/// Which rule marked a step as completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMatch {
    Deliverable(String),
    StepName,
    Category {
        category: &'static str,
        indicator: &'static str,
    },
}

/// Return the first rule that marks `step` as completed, if any.
pub fn detect_match(step: &ProcessStep, corpus: &EvidenceCorpus) -> Option<StepMatch> {
    if let Some(deliverable) = step
        .required_deliverables
        .iter()
        .find(|d| corpus.contains(d))
    {
        return Some(StepMatch::Deliverable(deliverable.clone()));
    }

    if corpus.contains(&step.name) {
        return Some(StepMatch::StepName);
    }

    let name = step.name.to_lowercase();
    CATEGORY_INDICATORS
        .iter()
        .filter(|(category, _)| name.contains(category))
        .find_map(|(category, indicators)| {
            indicators
                .iter()
                .find(|phrase| corpus.contains(phrase))
                .map(|&indicator| StepMatch::Category {
                    category: *category,
                    indicator,
                })
        })
}

/// Whether the corpus indicates `step` was completed.
pub fn detect(step: &ProcessStep, corpus: &EvidenceCorpus) -> bool {
    detect_match(step, corpus).is_some()
}

/// Informal practices evidenced in the corpus that are not formal steps.
///
/// Returns practice labels in catalog order.
pub fn identify_additional_practices(
    corpus: &EvidenceCorpus,
    formal_steps: &[ProcessStep],
) -> Vec<&'static str> {
    let formal: Vec<String> = formal_steps.iter().map(|s| slugify(&s.name)).collect();

    INFORMAL_PRACTICES
        .iter()
        .filter(|(label, _)| !formal.contains(&slugify(label)))
        .filter(|(_, indicators)| indicators.iter().any(|p| corpus.contains(p)))
        .map(|(label, _)| *label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::normalize;

    fn corpus(text: &str) -> EvidenceCorpus {
        EvidenceCorpus {
            text: normalize(text),
            ..Default::default()
        }
    }

    fn step(name: &str, deliverables: &[&str]) -> ProcessStep {
        ProcessStep {
            process_type: "ABC Review".into(),
            step_number: 1,
            name: name.into(),
            description: String::new(),
            required_deliverables: deliverables.iter().map(|s| s.to_string()).collect(),
            typical_duration_days: None,
            responsible_parties: vec![],
            prerequisites: vec![],
            required: true,
            source_document: None,
        }
    }

    #[test]
    fn deliverable_match_wins_first() {
        let s = step("Plan Team Review", &["SAFE report"]);
        let c = corpus("Attached: 2024 SAFE Report. The Plan Team Review concluded.");
        assert_eq!(
            detect_match(&s, &c),
            Some(StepMatch::Deliverable("SAFE report".into()))
        );
    }

    #[test]
    fn step_name_match() {
        let s = step("Plan Team Review", &["SAFE report"]);
        let c = corpus("agenda item c2 plan team review");
        assert_eq!(detect_match(&s, &c), Some(StepMatch::StepName));
    }

    #[test]
    fn category_indicator_match() {
        let s = step("SSC Recommendation", &["SSC report"]);
        let c = corpus("The committee recommended an ABC of 12,000 t.");
        assert_eq!(
            detect_match(&s, &c),
            Some(StepMatch::Category {
                category: "recommendation",
                indicator: "recommend",
            })
        );
    }

    #[test]
    fn category_needs_category_word_in_name() {
        let s = step("Data Compilation", &[]);
        let c = corpus("The committee recommended and reviewed everything.");
        assert!(!detect(&s, &c));
    }

    #[test]
    fn nothing_matches_empty_corpus() {
        let s = step("Council Final Action", &["harvest specifications"]);
        assert!(!detect(&s, &EvidenceCorpus::default()));
    }

    #[test]
    fn additional_practices_found() {
        let c = corpus("Public testimony was taken. A joint meeting with the Board followed.");
        let found = identify_additional_practices(&c, &[]);
        assert_eq!(found, vec!["Public Comment Period", "Joint Session"]);
    }

    #[test]
    fn additional_practices_exclude_formal_steps() {
        let c = corpus("public comment period opened; workshop held");
        let formal = vec![step("Public Comment Period", &[])];
        let found = identify_additional_practices(&c, &formal);
        assert_eq!(found, vec!["Workshop"]);
    }
}
