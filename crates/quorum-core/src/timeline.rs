//! Expected vs. observed meeting duration.

use crate::{Meeting, ProcessStep};

/// Days assumed when a meeting lacks a start or end timestamp.
pub const DEFAULT_ACTUAL_DAYS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineAnalysis {
    /// Sum of the formal steps' typical durations.
    pub expected_days: i64,
    pub actual_days: i64,
    /// `actual_days - expected_days`; positive means slower than policy.
    pub variance_days: i64,
}

/// Compare the meeting's observed duration with the formal expectation.
pub fn analyze(meeting: &Meeting, formal_steps: &[ProcessStep]) -> TimelineAnalysis {
    let expected_days: i64 = formal_steps
        .iter()
        .map(|s| i64::from(s.typical_duration_days.unwrap_or(0)))
        .sum();

    let actual_days = match (meeting.start, meeting.end) {
        (Some(start), Some(end)) => (end - start).num_days(),
        _ => DEFAULT_ACTUAL_DAYS,
    };

    TimelineAnalysis {
        expected_days,
        actual_days,
        variance_days: actual_days - expected_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn steps(durations: &[Option<u32>]) -> Vec<ProcessStep> {
        durations
            .iter()
            .enumerate()
            .map(|(i, &d)| ProcessStep {
                process_type: "ABC Review".into(),
                step_number: i as u32 + 1,
                name: format!("Step {}", i + 1),
                description: String::new(),
                required_deliverables: vec![],
                typical_duration_days: d,
                responsible_parties: vec![],
                prerequisites: vec![],
                required: true,
                source_document: None,
            })
            .collect()
    }

    fn meeting(start_day: Option<u32>, end_day: Option<u32>) -> Meeting {
        Meeting {
            id: "m".into(),
            title: "t".into(),
            type_label: String::new(),
            start: start_day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 9, 0, 0).unwrap()),
            end: end_day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 17, 0, 0).unwrap()),
            documents: vec![],
        }
    }

    #[test]
    fn expected_is_sum_of_durations() {
        let t = analyze(&meeting(Some(1), Some(26)), &steps(&[Some(5), Some(10), Some(5)]));
        assert_eq!(t.expected_days, 20);
        assert_eq!(t.actual_days, 25);
        assert_eq!(t.variance_days, 5);
    }

    #[test]
    fn missing_durations_contribute_zero() {
        let t = analyze(&meeting(Some(1), Some(4)), &steps(&[Some(2), None]));
        assert_eq!(t.expected_days, 2);
        assert_eq!(t.variance_days, 1);
    }

    #[test]
    fn missing_timestamp_defaults_to_one_day() {
        let t = analyze(&meeting(Some(1), None), &steps(&[Some(3)]));
        assert_eq!(t.actual_days, DEFAULT_ACTUAL_DAYS);
        assert_eq!(t.variance_days, -2);
    }

    #[test]
    fn no_steps_zero_expectation() {
        let t = analyze(&meeting(None, None), &[]);
        assert_eq!(t.expected_days, 0);
        assert_eq!(t.actual_days, 1);
    }
}
