//! Observed-practice learning: frequency, confidence, and running averages.
//!
//! Each `(process_type, pattern)` key moves through two states:
//!
//! - first observation: frequency 1, confidence [`INITIAL_CONFIDENCE`]
//! - repeat observation: frequency + 1, confidence + [`CONFIDENCE_STEP`]
//!   capped at 1.0, example history truncated to the most recent N
//!
//! The duration pattern additionally keeps a cumulative (never decaying)
//! average of observed durations.
//!
//! These functions are pure. Callers must apply them under a per-key lock
//! so concurrent analyses cannot lose updates.

use chrono::{DateTime, Utc};

use crate::score::TIMELINE_TOLERANCE;
use crate::step_key::slugify;
use crate::timeline::TimelineAnalysis;
use crate::{Meeting, ObservedPractice, PracticeExample, PracticeKey, ProcessStep};

pub const INITIAL_CONFIDENCE: f64 = 0.1;
pub const CONFIDENCE_STEP: f64 = 0.05;
pub const MAX_CONFIDENCE: f64 = 1.0;
pub const DURATION_PATTERN: &str = "typical_duration";

pub fn step_pattern(step_id: &str) -> String {
    format!("step:{step_id}")
}

pub fn skipped_pattern(step_id: &str) -> String {
    format!("skipped:{step_id}")
}

pub fn added_pattern(label: &str) -> String {
    format!("added:{}", slugify(label))
}

/// A duration measurement for the [`DURATION_PATTERN`] key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationSample {
    pub observed_days: f64,
    pub expected_days: f64,
}

/// One sighting of a pattern in one meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub meeting_id: String,
    pub meeting_title: String,
    pub observed_at: DateTime<Utc>,
    pub description: String,
    /// Rationale when the pattern departs from formal policy.
    pub deviation: Option<String>,
    pub duration: Option<DurationSample>,
}

impl Observation {
    fn example(&self) -> PracticeExample {
        PracticeExample {
            meeting_id: self.meeting_id.clone(),
            meeting_title: self.meeting_title.clone(),
            observed_on: self.observed_at,
        }
    }
}

/// Apply `obs` to the current state of `key` and return the new state.
pub fn observe(
    existing: Option<ObservedPractice>,
    key: &PracticeKey,
    obs: &Observation,
    history: usize,
) -> ObservedPractice {
    let mut practice = match existing {
        None => ObservedPractice {
            process_type: key.process_type.clone(),
            pattern: key.pattern.clone(),
            description: obs.description.clone(),
            frequency: 1,
            first_observed: obs.observed_at,
            last_observed: obs.observed_at,
            confidence: INITIAL_CONFIDENCE,
            average_duration_days: obs.duration.map(|d| d.observed_days),
            deviates: false,
            deviation_rationale: None,
            examples: vec![obs.example()],
        },
        Some(mut p) => {
            if let Some(sample) = obs.duration {
                let old_count = p.frequency as f64;
                p.average_duration_days = Some(match p.average_duration_days {
                    Some(avg) => (avg * old_count + sample.observed_days) / (old_count + 1.0),
                    None => sample.observed_days,
                });
            }
            p.frequency += 1;
            p.confidence = (p.confidence + CONFIDENCE_STEP).min(MAX_CONFIDENCE);
            p.last_observed = obs.observed_at;
            p.examples.push(obs.example());
            p
        }
    };

    if practice.examples.len() > history {
        let excess = practice.examples.len() - history;
        practice.examples.drain(..excess);
    }

    match (obs.duration, practice.average_duration_days) {
        (Some(sample), Some(avg)) => {
            let band = TIMELINE_TOLERANCE * sample.expected_days;
            practice.deviates =
                sample.expected_days > 0.0 && (avg - sample.expected_days).abs() > band;
            practice.deviation_rationale = practice.deviates.then(|| {
                format!(
                    "average observed duration {avg:.1} days vs formal {:.0} days",
                    sample.expected_days
                )
            });
        }
        _ => {
            practice.deviates = obs.deviation.is_some();
            practice.deviation_rationale = obs.deviation.clone();
        }
    }

    practice
}

/// Everything the learner should record for one analysed meeting.
pub fn plan_observations(
    meeting: &Meeting,
    process_type: &str,
    completed: &[&ProcessStep],
    skipped: &[&ProcessStep],
    added: &[&str],
    timeline: &TimelineAnalysis,
    observed_at: DateTime<Utc>,
) -> Vec<(PracticeKey, Observation)> {
    let base = |description: String, deviation: Option<String>| Observation {
        meeting_id: meeting.id.clone(),
        meeting_title: meeting.title.clone(),
        observed_at,
        description,
        deviation,
        duration: None,
    };

    let mut out = Vec::with_capacity(completed.len() + skipped.len() + added.len() + 1);

    for step in completed {
        out.push((
            PracticeKey::new(process_type, step_pattern(&step.id())),
            base(format!("'{}' is carried out", step.name), None),
        ));
    }
    for step in skipped {
        out.push((
            PracticeKey::new(process_type, skipped_pattern(&step.id())),
            base(
                format!("required step '{}' is skipped", step.name),
                Some("required by formal process but not evidenced".to_string()),
            ),
        ));
    }
    for label in added {
        out.push((
            PracticeKey::new(process_type, added_pattern(label)),
            base(
                format!("'{label}' is held although not a formal step"),
                Some("practice not in formal process".to_string()),
            ),
        ));
    }

    let mut duration = base(
        format!("process takes about {} days", timeline.actual_days),
        None,
    );
    duration.duration = Some(DurationSample {
        observed_days: timeline.actual_days as f64,
        expected_days: timeline.expected_days as f64,
    });
    out.push((PracticeKey::new(process_type, DURATION_PATTERN), duration));

    out
}
