//! DuckDB storage for compliance records and observed practices.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use duckdb::{params, Connection, Row};
use quorum_core::{MeetingComplianceRecord, ObservedPractice, PracticeExample, PracticeKey};
use tracing::{debug, info};

use crate::{rank_practices, ComplianceStore, PracticeApply, PracticeUpdate, StoreError};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS compliance_records (
    meeting_id        VARCHAR NOT NULL,
    process_type      VARCHAR NOT NULL,
    steps_completed   VARCHAR NOT NULL,
    steps_skipped     VARCHAR NOT NULL,
    steps_added       VARCHAR NOT NULL,
    expected_days     BIGINT  NOT NULL,
    actual_days       BIGINT  NOT NULL,
    variance_days     BIGINT  NOT NULL,
    compliance_score  DOUBLE  NOT NULL,
    timeline_score    DOUBLE  NOT NULL,
    overall_score     DOUBLE  NOT NULL,
    deviation         BOOLEAN NOT NULL,
    flags             VARCHAR NOT NULL,
    insight           VARCHAR,
    recommendations   VARCHAR NOT NULL,
    analyzed_at       VARCHAR NOT NULL,
    PRIMARY KEY (meeting_id, process_type)
);
CREATE TABLE IF NOT EXISTS observed_practices (
    process_type          VARCHAR NOT NULL,
    pattern               VARCHAR NOT NULL,
    description           VARCHAR NOT NULL,
    frequency             BIGINT  NOT NULL,
    first_observed        VARCHAR NOT NULL,
    last_observed         VARCHAR NOT NULL,
    confidence            DOUBLE  NOT NULL,
    average_duration_days DOUBLE,
    deviates              BOOLEAN NOT NULL,
    deviation_rationale   VARCHAR,
    examples              VARCHAR NOT NULL,
    PRIMARY KEY (process_type, pattern)
);
CREATE TABLE IF NOT EXISTS practice_observations (
    process_type VARCHAR NOT NULL,
    pattern      VARCHAR NOT NULL,
    meeting_id   VARCHAR NOT NULL,
    PRIMARY KEY (process_type, pattern, meeting_id)
);
";

const RECORD_COLUMNS: &str = "meeting_id, process_type, steps_completed, steps_skipped, \
    steps_added, expected_days, actual_days, variance_days, compliance_score, timeline_score, \
    overall_score, deviation, flags, insight, recommendations, analyzed_at";

const PRACTICE_COLUMNS: &str = "process_type, pattern, description, frequency, first_observed, \
    last_observed, confidence, average_duration_days, deviates, deviation_rationale, examples";

/// DuckDB-backed [`ComplianceStore`].
///
/// List-valued fields are stored as JSON text and timestamps as RFC 3339
/// strings. Every operation runs under one connection mutex, which also
/// serialises the observed-practice read-modify-write.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened compliance store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ── Counts ──

    /// Number of rows in `compliance_records`.
    pub fn records_count(&self) -> Result<usize, StoreError> {
        self.count_table("compliance_records")
    }

    /// Number of rows in `observed_practices`.
    pub fn practices_count(&self) -> Result<usize, StoreError> {
        self.count_table("observed_practices")
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT count(*)::BIGINT FROM {table}");
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ── Row mapping ──

struct RecordRow {
    meeting_id: String,
    process_type: String,
    steps_completed: String,
    steps_skipped: String,
    steps_added: String,
    expected_days: i64,
    actual_days: i64,
    variance_days: i64,
    compliance_score: f64,
    timeline_score: f64,
    overall_score: f64,
    deviation: bool,
    flags: String,
    insight: Option<String>,
    recommendations: String,
    analyzed_at: String,
}

impl RecordRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            meeting_id: row.get(0)?,
            process_type: row.get(1)?,
            steps_completed: row.get(2)?,
            steps_skipped: row.get(3)?,
            steps_added: row.get(4)?,
            expected_days: row.get(5)?,
            actual_days: row.get(6)?,
            variance_days: row.get(7)?,
            compliance_score: row.get(8)?,
            timeline_score: row.get(9)?,
            overall_score: row.get(10)?,
            deviation: row.get(11)?,
            flags: row.get(12)?,
            insight: row.get(13)?,
            recommendations: row.get(14)?,
            analyzed_at: row.get(15)?,
        })
    }

    fn into_record(self) -> Result<MeetingComplianceRecord, StoreError> {
        Ok(MeetingComplianceRecord {
            meeting_id: self.meeting_id,
            process_type: self.process_type,
            steps_completed: serde_json::from_str(&self.steps_completed)?,
            steps_skipped: serde_json::from_str(&self.steps_skipped)?,
            steps_added: serde_json::from_str(&self.steps_added)?,
            expected_days: self.expected_days,
            actual_days: self.actual_days,
            variance_days: self.variance_days,
            compliance_score: self.compliance_score,
            timeline_score: self.timeline_score,
            overall_score: self.overall_score,
            deviation: self.deviation,
            flags: serde_json::from_str(&self.flags)?,
            insight: self.insight,
            recommendations: serde_json::from_str(&self.recommendations)?,
            analyzed_at: parse_ts(&self.analyzed_at)?,
        })
    }
}

struct PracticeRow {
    process_type: String,
    pattern: String,
    description: String,
    frequency: i64,
    first_observed: String,
    last_observed: String,
    confidence: f64,
    average_duration_days: Option<f64>,
    deviates: bool,
    deviation_rationale: Option<String>,
    examples: String,
}

impl PracticeRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            process_type: row.get(0)?,
            pattern: row.get(1)?,
            description: row.get(2)?,
            frequency: row.get(3)?,
            first_observed: row.get(4)?,
            last_observed: row.get(5)?,
            confidence: row.get(6)?,
            average_duration_days: row.get(7)?,
            deviates: row.get(8)?,
            deviation_rationale: row.get(9)?,
            examples: row.get(10)?,
        })
    }

    fn into_practice(self) -> Result<ObservedPractice, StoreError> {
        let examples: Vec<PracticeExample> = serde_json::from_str(&self.examples)?;
        Ok(ObservedPractice {
            process_type: self.process_type,
            pattern: self.pattern,
            description: self.description,
            frequency: self.frequency.max(0) as u64,
            first_observed: parse_ts(&self.first_observed)?,
            last_observed: parse_ts(&self.last_observed)?,
            confidence: self.confidence,
            average_duration_days: self.average_duration_days,
            deviates: self.deviates,
            deviation_rationale: self.deviation_rationale,
            examples,
        })
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn find_practice(
    conn: &Connection,
    key: &PracticeKey,
) -> Result<Option<ObservedPractice>, StoreError> {
    let sql = format!(
        "SELECT {PRACTICE_COLUMNS} FROM observed_practices WHERE process_type = ? AND pattern = ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_map(params![key.process_type, key.pattern], PracticeRow::read)?
        .next()
        .transpose()?;
    row.map(PracticeRow::into_practice).transpose()
}

fn write_practice(conn: &Connection, p: &ObservedPractice) -> Result<(), StoreError> {
    let sql = format!(
        "INSERT OR REPLACE INTO observed_practices ({PRACTICE_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    conn.execute(
        &sql,
        params![
            p.process_type,
            p.pattern,
            p.description,
            p.frequency as i64,
            p.first_observed.to_rfc3339(),
            p.last_observed.to_rfc3339(),
            p.confidence,
            p.average_duration_days,
            p.deviates,
            p.deviation_rationale,
            serde_json::to_string(&p.examples)?,
        ],
    )?;
    Ok(())
}

impl ComplianceStore for DuckStore {
    fn upsert_record(&self, r: &MeetingComplianceRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "INSERT OR REPLACE INTO compliance_records ({RECORD_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        conn.execute(
            &sql,
            params![
                r.meeting_id,
                r.process_type,
                serde_json::to_string(&r.steps_completed)?,
                serde_json::to_string(&r.steps_skipped)?,
                serde_json::to_string(&r.steps_added)?,
                r.expected_days,
                r.actual_days,
                r.variance_days,
                r.compliance_score,
                r.timeline_score,
                r.overall_score,
                r.deviation,
                serde_json::to_string(&r.flags)?,
                r.insight,
                serde_json::to_string(&r.recommendations)?,
                r.analyzed_at.to_rfc3339(),
            ],
        )?;
        debug!(meeting_id = %r.meeting_id, process_type = %r.process_type, "record upserted");
        Ok(())
    }

    fn get_record(
        &self,
        meeting_id: &str,
        process_type: &str,
    ) -> Result<Option<MeetingComplianceRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM compliance_records
             WHERE meeting_id = ? AND process_type = ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_map(params![meeting_id, process_type], RecordRow::read)?
            .next()
            .transpose()?;
        row.map(RecordRow::into_record).transpose()
    }

    fn records(&self) -> Result<Vec<MeetingComplianceRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM compliance_records ORDER BY meeting_id, process_type"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RecordRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    fn observe_practice(
        &self,
        key: &PracticeKey,
        meeting_id: &str,
        apply: &mut PracticeApply<'_>,
    ) -> Result<PracticeUpdate, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let seen: i64 = tx.query_row(
            "SELECT count(*)::BIGINT FROM practice_observations
             WHERE process_type = ? AND pattern = ? AND meeting_id = ?",
            params![key.process_type, key.pattern, meeting_id],
            |row| row.get(0),
        )?;
        let existing = find_practice(&tx, key)?;

        if let Some(practice) = existing.clone()
            && seen > 0
        {
            debug!(key = %key, meeting_id, "practice already observed for meeting");
            return Ok(PracticeUpdate::AlreadyObserved(practice));
        }

        let updated = apply(existing);
        write_practice(&tx, &updated)?;
        tx.execute(
            "INSERT OR IGNORE INTO practice_observations (process_type, pattern, meeting_id)
             VALUES (?, ?, ?)",
            params![key.process_type, key.pattern, meeting_id],
        )?;
        tx.commit()?;

        Ok(PracticeUpdate::Recorded(updated))
    }

    fn get_practice(&self, key: &PracticeKey) -> Result<Option<ObservedPractice>, StoreError> {
        let conn = self.lock()?;
        find_practice(&conn, key)
    }

    fn practices(&self, process_type: &str) -> Result<Vec<ObservedPractice>, StoreError> {
        let conn = self.lock()?;
        let sql =
            format!("SELECT {PRACTICE_COLUMNS} FROM observed_practices WHERE process_type = ?");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![process_type], PracticeRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        let mut practices = rows
            .into_iter()
            .map(PracticeRow::into_practice)
            .collect::<Result<Vec<_>, _>>()?;
        rank_practices(&mut practices);
        Ok(practices)
    }

    fn average_compliance_score(&self) -> Result<Option<f64>, StoreError> {
        let conn = self.lock()?;
        let avg: Option<f64> =
            conn.query_row("SELECT avg(compliance_score) FROM compliance_records", [], |row| {
                row.get(0)
            })?;
        Ok(avg)
    }

    fn average_timeline_score(&self) -> Result<Option<f64>, StoreError> {
        let conn = self.lock()?;
        let avg: Option<f64> =
            conn.query_row("SELECT avg(timeline_score) FROM compliance_records", [], |row| {
                row.get(0)
            })?;
        Ok(avg)
    }
}
