//! Vertical card display for compliance records and step catalogs.
//!
//! Renders one row of a records RecordBatch as a grouped, human-readable
//! card with type-aware formatting for scalars and `List<Utf8>` columns.

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use quorum_core::ProcessStep;

const MAX_LIST_ITEMS: usize = 10;

// ── Schema section groupings ──

const SCORES: &[&str] = &[
    "compliance_score",
    "timeline_score",
    "overall_score",
    "deviation",
];

const TIMELINE: &[&str] = &["expected_days", "actual_days", "variance_days"];

const STEPS: &[&str] = &["steps_completed", "steps_skipped", "steps_added"];

const FINDINGS: &[&str] = &["flags", "insight"];

const TIMESTAMPS: &[&str] = &["analyzed_at"];

// ── Public API ──

/// Print one compliance record as a vertical card grouped by schema section.
pub fn print_record_card(
    batch: &RecordBatch,
    row: usize,
    recommendations: &[String],
) -> anyhow::Result<()> {
    anyhow::ensure!(
        row < batch.num_rows(),
        "row {row} out of range ({} rows)",
        batch.num_rows()
    );
    let meeting = get_utf8(batch, "meeting_id", row).unwrap_or_default();
    let process_type = get_utf8(batch, "process_type", row).unwrap_or_default();

    println!("=== {meeting} ===");
    println!("{process_type}");
    println!();

    print_section(batch, row, "Scores", SCORES);
    print_section(batch, row, "Timeline (days)", TIMELINE);
    print_section(batch, row, "Steps", STEPS);
    print_section(batch, row, "Findings", FINDINGS);

    if !recommendations.is_empty() {
        println!("Recommendations");
        for rec in recommendations {
            println!("  - {rec}");
        }
        println!();
    }

    print_section(batch, row, "Timestamps", TIMESTAMPS);
    Ok(())
}

/// Print a process type's formal step catalog.
pub fn print_steps(process_type: &str, steps: &[ProcessStep]) {
    println!("=== {process_type} ===");
    if steps.is_empty() {
        println!("  (no formal steps)");
        println!();
        return;
    }

    for step in steps {
        let duration = step
            .typical_duration_days
            .map(|d| format!("{d}d"))
            .unwrap_or_else(|| "-".to_string());
        let required = if step.required { "required" } else { "optional" };
        println!(
            "  {:<24} {:<32} {:>5}  {}",
            step.id(),
            step.name,
            duration,
            required
        );
        if !step.required_deliverables.is_empty() {
            println!(
                "      deliverables: {}",
                join_truncated(&step.required_deliverables)
            );
        }
        if !step.prerequisites.is_empty() {
            println!("      after: {}", join_truncated(&step.prerequisites));
        }
    }
    println!();
}

// ── Section rendering ──

fn print_section(batch: &RecordBatch, row: usize, header: &str, cols: &[&str]) {
    let schema = batch.schema();
    let present: Vec<(usize, &str)> = cols
        .iter()
        .filter_map(|&col| schema.index_of(col).ok().map(|i| (i, col)))
        .filter(|&(i, _)| !batch.column(i).is_null(row))
        .collect();
    if present.is_empty() {
        return;
    }

    println!("{header}");
    for (idx, col_name) in present {
        let col = batch.column(idx);
        match col.data_type() {
            DataType::Boolean => {
                if let Some(arr) = col.as_boolean_opt() {
                    let value = if arr.value(row) { "yes" } else { "no" };
                    println!("  {:<20} {}", col_name, value);
                }
            }
            DataType::Float64 => {
                if let Some(arr) = col.as_primitive_opt::<Float64Type>() {
                    println!("  {:<20} {:.3}", col_name, arr.value(row));
                }
            }
            DataType::List(_) => print_list_utf8(col.as_ref(), row, col_name),
            _ => match ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default()) {
                Ok(fmt) => println!("  {:<20} {}", col_name, fmt.value(row)),
                Err(_) => println!("  {:<20} ({})", col_name, col.data_type()),
            },
        }
    }
    println!();
}

// ── List<Utf8> ──

fn print_list_utf8(col: &dyn Array, row: usize, col_name: &str) {
    let Some(list) = col.as_list_opt::<i32>() else {
        return;
    };
    let values = list.value(row);
    let Some(strings) = values.as_string_opt::<i32>() else {
        return;
    };
    let items: Vec<String> = strings.iter().flatten().map(str::to_string).collect();
    if items.is_empty() {
        println!("  {:<20} -", col_name);
    } else {
        println!("  {:<20} {}", col_name, join_truncated(&items));
    }
}

// ── Helpers ──

fn join_truncated(items: &[String]) -> String {
    let shown = items.len().min(MAX_LIST_ITEMS);
    let mut out = items[..shown].join(", ");
    if items.len() > MAX_LIST_ITEMS {
        out.push_str(&format!(" ... and {} more", items.len() - MAX_LIST_ITEMS));
    }
    out
}

fn get_utf8(batch: &RecordBatch, col_name: &str, row: usize) -> Option<String> {
    let idx = batch.schema().index_of(col_name).ok()?;
    let col = batch.column(idx);
    if col.is_null(row) {
        return None;
    }
    col.as_string_opt::<i32>().map(|arr| arr.value(row).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quorum_core::schema::records_to_batch;
    use quorum_core::MeetingComplianceRecord;

    fn record() -> MeetingComplianceRecord {
        MeetingComplianceRecord {
            meeting_id: "mtg-2024-06".into(),
            process_type: "ABC Review".into(),
            steps_completed: vec!["abc-review.001".into()],
            steps_skipped: vec!["abc-review.004".into()],
            steps_added: vec![],
            expected_days: 23,
            actual_days: 25,
            variance_days: 2,
            compliance_score: 1.0 / 3.0,
            timeline_score: 1.0,
            overall_score: 0.6,
            deviation: true,
            flags: vec!["missing_2_required_steps".into()],
            insight: None,
            recommendations: vec![],
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn join_truncates_long_lists() {
        let items: Vec<String> = (0..12).map(|i| format!("s{i}")).collect();
        let joined = join_truncated(&items);
        assert!(joined.starts_with("s0, s1"));
        assert!(joined.ends_with("... and 2 more"));
        assert_eq!(join_truncated(&items[..2]), "s0, s1");
    }

    #[test]
    fn reads_identity_columns() {
        let batch = records_to_batch(&[record()]).unwrap();
        assert_eq!(get_utf8(&batch, "meeting_id", 0).as_deref(), Some("mtg-2024-06"));
        assert_eq!(get_utf8(&batch, "insight", 0), None);
        assert_eq!(get_utf8(&batch, "no_such_column", 0), None);
    }

    #[test]
    fn card_rejects_out_of_range_row() {
        let batch = records_to_batch(&[record()]).unwrap();
        assert!(print_record_card(&batch, 0, &["Publish the SSC report.".into()]).is_ok());
        assert!(print_record_card(&batch, 1, &[]).is_err());
    }
}
