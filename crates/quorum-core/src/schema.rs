//! Arrow schemas for tabular export of compliance output.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, ListBuilder, StringArray, StringBuilder,
    TimestampMicrosecondArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::{MeetingComplianceRecord, ObservedPractice};

fn utf8_list() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

fn utc_micros() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Schema for one row per (meeting, process type) compliance record.
pub fn compliance_records_schema() -> Schema {
    Schema::new(vec![
        Field::new("meeting_id", DataType::Utf8, false),
        Field::new("process_type", DataType::Utf8, false),
        Field::new("steps_completed", utf8_list(), false),
        Field::new("steps_skipped", utf8_list(), false),
        Field::new("steps_added", utf8_list(), false),
        Field::new("expected_days", DataType::Int64, false),
        Field::new("actual_days", DataType::Int64, false),
        Field::new("variance_days", DataType::Int64, false),
        Field::new("compliance_score", DataType::Float64, false),
        Field::new("timeline_score", DataType::Float64, false),
        Field::new("overall_score", DataType::Float64, false),
        Field::new("deviation", DataType::Boolean, false),
        Field::new("flags", utf8_list(), false),
        Field::new("insight", DataType::Utf8, true),
        Field::new("analyzed_at", utc_micros(), false),
    ])
}

/// Schema for the learned observed-practice table.
pub fn observed_practices_schema() -> Schema {
    Schema::new(vec![
        Field::new("process_type", DataType::Utf8, false),
        Field::new("pattern", DataType::Utf8, false),
        Field::new("frequency", DataType::UInt64, false),
        Field::new("confidence", DataType::Float64, false),
        Field::new("average_duration_days", DataType::Float64, true),
        Field::new("deviates", DataType::Boolean, false),
        Field::new("last_observed", utc_micros(), false),
        Field::new("description", DataType::Utf8, false),
    ])
}

fn list_column<'a>(rows: impl Iterator<Item = &'a [String]>) -> ArrayRef {
    let mut builder = ListBuilder::new(StringBuilder::new());
    for values in rows {
        for v in values {
            builder.values().append_value(v);
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

/// Convert compliance records into a single RecordBatch.
pub fn records_to_batch(records: &[MeetingComplianceRecord]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.meeting_id.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.process_type.as_str()),
        )),
        list_column(records.iter().map(|r| r.steps_completed.as_slice())),
        list_column(records.iter().map(|r| r.steps_skipped.as_slice())),
        list_column(records.iter().map(|r| r.steps_added.as_slice())),
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.expected_days),
        )),
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.actual_days),
        )),
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.variance_days),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.compliance_score),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.timeline_score),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.overall_score),
        )),
        Arc::new(BooleanArray::from(
            records.iter().map(|r| r.deviation).collect::<Vec<_>>(),
        )),
        list_column(records.iter().map(|r| r.flags.as_slice())),
        Arc::new(StringArray::from(
            records
                .iter()
                .map(|r| r.insight.as_deref())
                .collect::<Vec<_>>(),
        )),
        Arc::new(
            TimestampMicrosecondArray::from_iter_values(
                records.iter().map(|r| r.analyzed_at.timestamp_micros()),
            )
            .with_timezone("UTC"),
        ),
    ];

    RecordBatch::try_new(Arc::new(compliance_records_schema()), columns)
}

/// Convert observed practices into a single RecordBatch.
pub fn practices_to_batch(practices: &[ObservedPractice]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            practices.iter().map(|p| p.process_type.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            practices.iter().map(|p| p.pattern.as_str()),
        )),
        Arc::new(UInt64Array::from_iter_values(
            practices.iter().map(|p| p.frequency),
        )),
        Arc::new(Float64Array::from_iter_values(
            practices.iter().map(|p| p.confidence),
        )),
        Arc::new(Float64Array::from(
            practices
                .iter()
                .map(|p| p.average_duration_days)
                .collect::<Vec<_>>(),
        )),
        Arc::new(BooleanArray::from(
            practices.iter().map(|p| p.deviates).collect::<Vec<_>>(),
        )),
        Arc::new(
            TimestampMicrosecondArray::from_iter_values(
                practices.iter().map(|p| p.last_observed.timestamp_micros()),
            )
            .with_timezone("UTC"),
        ),
        Arc::new(StringArray::from_iter_values(
            practices.iter().map(|p| p.description.as_str()),
        )),
    ];

    RecordBatch::try_new(Arc::new(observed_practices_schema()), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(meeting_id: &str) -> MeetingComplianceRecord {
        MeetingComplianceRecord {
            meeting_id: meeting_id.into(),
            process_type: "ABC Review".into(),
            steps_completed: vec!["abc-review.001".into(), "abc-review.002".into()],
            steps_skipped: vec!["abc-review.004".into()],
            steps_added: vec![],
            expected_days: 26,
            actual_days: 25,
            variance_days: -1,
            compliance_score: 2.0 / 3.0,
            timeline_score: 1.0,
            overall_score: 0.8,
            deviation: true,
            flags: vec!["missing_1_required_steps".into()],
            insight: None,
            recommendations: vec![],
            analyzed_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn compliance_records_schema_has_expected_fields() {
        let schema = compliance_records_schema();
        assert_eq!(schema.fields().len(), 15);
        assert!(schema.field_with_name("overall_score").is_ok());
        assert!(schema.field_with_name("flags").is_ok());
    }

    #[test]
    fn records_batch_matches_schema() {
        let batch = records_to_batch(&[record("a"), record("b")]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 15);
        let ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ids.value(1), "b");
    }

    #[test]
    fn empty_records_batch() {
        let batch = records_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn practices_batch_matches_schema() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let practice = ObservedPractice {
            process_type: "ABC Review".into(),
            pattern: "typical_duration".into(),
            description: "process takes about 25 days".into(),
            frequency: 3,
            first_observed: t,
            last_observed: t,
            confidence: 0.2,
            average_duration_days: Some(24.5),
            deviates: false,
            deviation_rationale: None,
            examples: vec![],
        };
        let batch = practices_to_batch(&[practice]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.schema().fields().len(), 8);
    }
}
