//! Compliance and timeline scoring, deviation flags, and recommendations.

use crate::timeline::TimelineAnalysis;
use crate::ProcessStep;

pub const COMPLIANCE_WEIGHT: f64 = 0.6;
pub const TIMELINE_WEIGHT: f64 = 0.4;
/// Fraction of the expected duration tolerated without penalty.
pub const TIMELINE_TOLERANCE: f64 = 0.2;
/// Variance (days) beyond which a delay or rush is flagged.
pub const TIMELINE_FLAG_DAYS: i64 = 30;
/// Below this many detected steps, documentation counts as minimal.
pub const MIN_DOCUMENTED_STEPS: usize = 3;
/// Below this many documents, documentation counts as minimal.
pub const MIN_DOCUMENTS: usize = 3;

pub const FLAG_TIMELINE_DELAY: &str = "significant_timeline_delay";
pub const FLAG_FAST_COMPLETION: &str = "unusually_fast_completion";
pub const FLAG_MINIMAL_DOCUMENTATION: &str = "minimal_documentation";

/// Flag for `n` skipped required steps, e.g. `missing_2_required_steps`.
pub fn missing_steps_flag(n: usize) -> String {
    format!("missing_{n}_required_steps")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceScore {
    pub compliance_score: f64,
    pub timeline_score: f64,
    pub overall_score: f64,
    pub flags: Vec<String>,
}

impl ComplianceScore {
    pub fn deviation(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// Fraction of required steps completed; 1.0 when nothing is required.
pub fn compliance_score(completed_required: usize, required: usize) -> f64 {
    if required == 0 {
        return 1.0;
    }
    completed_required as f64 / required as f64
}

/// 1.0 inside the 20 % tolerance band, then a linear decline to 0.
pub fn timeline_score(timeline: &TimelineAnalysis) -> f64 {
    if timeline.expected_days <= 0 {
        return 1.0;
    }
    let expected = timeline.expected_days as f64;
    let variance = timeline.variance_days.abs() as f64;
    let tolerance = TIMELINE_TOLERANCE * expected;
    if variance <= tolerance {
        return 1.0;
    }
    (1.0 - (variance - tolerance) / expected).max(0.0)
}

/// Score a meeting.
///
/// `completed` holds the identifiers of every detected formal step;
/// only the required ones in `formal_steps` count toward compliance.
/// `document_count` is the number of documents behind the evidence corpus.
pub fn score(
    completed: &[String],
    formal_steps: &[ProcessStep],
    timeline: &TimelineAnalysis,
    document_count: usize,
) -> ComplianceScore {
    let required: Vec<&ProcessStep> = formal_steps.iter().filter(|s| s.required).collect();
    let completed_required = required
        .iter()
        .filter(|s| completed.contains(&s.id()))
        .count();
    let skipped = required.len() - completed_required;

    let compliance_score = compliance_score(completed_required, required.len());
    let timeline_score = timeline_score(timeline);
    let overall_score = (COMPLIANCE_WEIGHT * compliance_score + TIMELINE_WEIGHT * timeline_score)
        .clamp(0.0, 1.0);

    let mut flags = Vec::new();
    if skipped > 0 {
        flags.push(missing_steps_flag(skipped));
    }
    if timeline.variance_days > TIMELINE_FLAG_DAYS {
        flags.push(FLAG_TIMELINE_DELAY.to_string());
    }
    if timeline.variance_days < -TIMELINE_FLAG_DAYS {
        flags.push(FLAG_FAST_COMPLETION.to_string());
    }
    if completed.len() < MIN_DOCUMENTED_STEPS && document_count < MIN_DOCUMENTS {
        flags.push(FLAG_MINIMAL_DOCUMENTATION.to_string());
    }

    ComplianceScore {
        compliance_score,
        timeline_score,
        overall_score,
        flags,
    }
}

/// Human-readable follow-ups for skipped steps and raised flags.
pub fn recommendations(
    skipped: &[&ProcessStep],
    flags: &[String],
    timeline: &TimelineAnalysis,
) -> Vec<String> {
    let mut out: Vec<String> = skipped
        .iter()
        .map(|step| {
            if step.required_deliverables.is_empty() {
                format!("Document completion of required step '{}'.", step.name)
            } else {
                format!(
                    "Document completion of required step '{}' (deliverables: {}).",
                    step.name,
                    step.required_deliverables.join(", ")
                )
            }
        })
        .collect();

    for flag in flags {
        match flag.as_str() {
            FLAG_TIMELINE_DELAY => out.push(format!(
                "Process ran {} days past the expected {} days; review scheduling.",
                timeline.variance_days, timeline.expected_days
            )),
            FLAG_FAST_COMPLETION => out.push(format!(
                "Process finished {} days ahead of the expected {} days; confirm no steps were compressed.",
                -timeline.variance_days, timeline.expected_days
            )),
            FLAG_MINIMAL_DOCUMENTATION => out.push(
                "Publish agenda, briefing materials, and a final report for this meeting."
                    .to_string(),
            ),
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: u32, duration: u32, required: bool) -> ProcessStep {
        ProcessStep {
            process_type: "ABC Review".into(),
            step_number: n,
            name: format!("Step {n}"),
            description: String::new(),
            required_deliverables: vec![format!("deliverable {n}")],
            typical_duration_days: Some(duration),
            responsible_parties: vec![],
            prerequisites: vec![],
            required,
            source_document: None,
        }
    }

    fn timeline(expected: i64, actual: i64) -> TimelineAnalysis {
        TimelineAnalysis {
            expected_days: expected,
            actual_days: actual,
            variance_days: actual - expected,
        }
    }

    fn ids(steps: &[ProcessStep]) -> Vec<String> {
        steps.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn abc_review_scenario() {
        let steps = vec![step(1, 5, true), step(2, 10, true), step(3, 5, true)];
        let completed = ids(&steps[..2]);
        let s = score(&completed, &steps, &timeline(20, 25), 3);

        assert!((s.compliance_score - 2.0 / 3.0).abs() < 1e-9);
        assert!((s.timeline_score - 0.95).abs() < 1e-9);
        assert!((s.overall_score - 0.78).abs() < 1e-9);
        assert_eq!(s.flags, vec!["missing_1_required_steps".to_string()]);
        assert!(s.deviation());
    }

    #[test]
    fn fully_compliant_on_time() {
        let steps = vec![step(1, 5, true), step(2, 10, true), step(3, 5, true)];
        let s = score(&ids(&steps), &steps, &timeline(20, 20), 3);
        assert_eq!(s.overall_score, 1.0);
        assert!(s.flags.is_empty());
        assert!(!s.deviation());
    }

    #[test]
    fn no_required_steps_is_vacuously_compliant() {
        let steps = vec![step(1, 5, false)];
        let s = score(&[], &steps, &timeline(5, 5), 0);
        assert_eq!(s.compliance_score, 1.0);

        let s = score(&[], &[], &timeline(0, 1), 0);
        assert_eq!(s.compliance_score, 1.0);
        assert_eq!(s.timeline_score, 1.0);
    }

    #[test]
    fn optional_steps_do_not_inflate_compliance() {
        let steps = vec![step(1, 1, true), step(2, 1, false)];
        let s = score(&ids(&steps[1..]), &steps, &timeline(2, 2), 3);
        assert_eq!(s.compliance_score, 0.0);
    }

    #[test]
    fn empty_evidence_five_required_steps() {
        let steps: Vec<ProcessStep> = (1..=5).map(|n| step(n, 4, true)).collect();
        let s = score(&[], &steps, &timeline(20, 20), 0);
        assert_eq!(s.compliance_score, 0.0);
        assert!((s.overall_score - TIMELINE_WEIGHT * s.timeline_score).abs() < 1e-12);
        assert!(s.flags.contains(&FLAG_MINIMAL_DOCUMENTATION.to_string()));
        assert!(s.flags.contains(&missing_steps_flag(5)));
    }

    #[test]
    fn timeline_score_within_tolerance_is_one() {
        for actual in 16..=24 {
            assert_eq!(timeline_score(&timeline(20, actual)), 1.0, "actual={actual}");
        }
    }

    #[test]
    fn timeline_score_non_increasing_beyond_band() {
        let mut prev = 1.0;
        for v in 4..80 {
            let s = timeline_score(&timeline(20, 20 + v));
            assert!(s <= prev, "score rose at variance {v}");
            assert!((0.0..=1.0).contains(&s));
            prev = s;
        }
        assert_eq!(timeline_score(&timeline(20, 100)), 0.0);
        assert_eq!(
            timeline_score(&timeline(20, 10)),
            timeline_score(&timeline(20, 30))
        );
    }

    #[test]
    fn zero_expectation_timeline_is_one() {
        assert_eq!(timeline_score(&timeline(0, 400)), 1.0);
    }

    #[test]
    fn delay_and_rush_flags() {
        let steps = vec![step(1, 40, true), step(2, 40, true), step(3, 40, true)];
        let done = ids(&steps);

        let slow = score(&done, &steps, &timeline(120, 151), 3);
        assert_eq!(slow.flags, vec![FLAG_TIMELINE_DELAY.to_string()]);

        let fast = score(&done, &steps, &timeline(120, 89), 3);
        assert_eq!(fast.flags, vec![FLAG_FAST_COMPLETION.to_string()]);

        let edge = score(&done, &steps, &timeline(120, 150), 3);
        assert!(edge.flags.is_empty());
    }

    #[test]
    fn recommendations_cover_skips_and_flags() {
        let s1 = step(1, 5, true);
        let tl = timeline(20, 60);
        let flags = vec![
            missing_steps_flag(1),
            FLAG_TIMELINE_DELAY.to_string(),
            FLAG_MINIMAL_DOCUMENTATION.to_string(),
        ];
        let recs = recommendations(&[&s1], &flags, &tl);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("Step 1"));
        assert!(recs[0].contains("deliverable 1"));
        assert!(recs[1].contains("40 days past"));
    }
}
