//! Assessment log operations (append-only, hash-chained).

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use super::{Database, DbError, DbResult};
use crate::features::FeatureVector;
use crate::models::{LogEntry, ModelPrediction, NewLogEntry, PatientAssessment, GENESIS_HASH};
use crate::risk::RiskCategory;
use crate::scoring::ScoringVariant;

/// Destination for scored assessments.
///
/// Implementations must write each entry atomically and never reorder or
/// rewrite earlier entries.
pub trait AssessmentLogSink {
    fn append(&mut self, record: NewLogEntry) -> DbResult<LogEntry>;
}

/// Result of walking the hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    pub entries_checked: u64,
    /// Sequence of the first entry whose link or hash does not match
    pub first_broken: Option<u64>,
    /// `entry_hash` of the last entry (genesis hash when empty)
    pub head_hash: String,
}

impl ChainVerification {
    pub fn is_intact(&self) -> bool {
        self.first_broken.is_none()
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT sequence, entry_id, created_at, scoring_variant, hybrid_score,
           risk_category, assessment, features, predictions, prev_hash, entry_hash
    FROM assessment_log
"#;

/// Raw row before JSON columns are decoded.
struct LogRow {
    sequence: i64,
    entry_id: String,
    created_at: String,
    scoring_variant: String,
    hybrid_score: i32,
    risk_category: String,
    assessment: String,
    features: String,
    predictions: String,
    prev_hash: String,
    entry_hash: String,
}

impl LogRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(LogRow {
            sequence: row.get(0)?,
            entry_id: row.get(1)?,
            created_at: row.get(2)?,
            scoring_variant: row.get(3)?,
            hybrid_score: row.get(4)?,
            risk_category: row.get(5)?,
            assessment: row.get(6)?,
            features: row.get(7)?,
            predictions: row.get(8)?,
            prev_hash: row.get(9)?,
            entry_hash: row.get(10)?,
        })
    }
}

impl TryFrom<LogRow> for LogEntry {
    type Error = DbError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let scoring_variant: ScoringVariant = row
            .scoring_variant
            .parse()
            .map_err(|e| DbError::Constraint(format!("entry {}: {}", row.entry_id, e)))?;
        let risk_category: RiskCategory = row
            .risk_category
            .parse()
            .map_err(|e| DbError::Constraint(format!("entry {}: {}", row.entry_id, e)))?;
        let assessment: PatientAssessment = serde_json::from_str(&row.assessment)?;
        let features: FeatureVector = serde_json::from_str(&row.features)?;
        let predictions: Vec<ModelPrediction> = serde_json::from_str(&row.predictions)?;

        Ok(LogEntry {
            sequence: row.sequence as u64,
            entry_id: row.entry_id,
            created_at: row.created_at,
            record: NewLogEntry {
                assessment,
                scoring_variant,
                hybrid_score: row.hybrid_score,
                risk_category,
                features,
                predictions,
            },
            prev_hash: row.prev_hash,
            entry_hash: row.entry_hash,
        })
    }
}

impl AssessmentLogSink for Database {
    fn append(&mut self, record: NewLogEntry) -> DbResult<LogEntry> {
        for prediction in &record.predictions {
            prediction.validate()?;
        }
        let tx = self.write_transaction()?;

        let head: Option<(i64, String)> = tx
            .query_row(
                "SELECT sequence, entry_hash FROM assessment_log ORDER BY sequence DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (sequence, prev_hash) = match head {
            Some((last, hash)) => (last as u64 + 1, hash),
            None => (1, GENESIS_HASH.to_string()),
        };

        let entry_id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();
        let entry_hash =
            LogEntry::compute_hash(&prev_hash, sequence, &entry_id, &created_at, &record)?;

        tx.execute(
            r#"
            INSERT INTO assessment_log (
                sequence, entry_id, created_at, scoring_variant, hybrid_score,
                risk_category, assessment, features, predictions, prev_hash, entry_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                sequence as i64,
                entry_id,
                created_at,
                record.scoring_variant.as_str(),
                record.hybrid_score,
                record.risk_category.label(),
                record.assessment.to_canonical_json()?,
                serde_json::to_string(&record.features)?,
                serde_json::to_string(&record.predictions)?,
                prev_hash,
                entry_hash,
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            entry_id = %entry_id,
            sequence,
            hybrid_score = record.hybrid_score,
            category = record.risk_category.label(),
            "appended assessment log entry"
        );

        Ok(LogEntry {
            sequence,
            entry_id,
            created_at,
            record,
            prev_hash,
            entry_hash,
        })
    }
}

impl Database {
    /// All entries, newest first.
    pub fn list_log_entries(&self) -> DbResult<Vec<LogEntry>> {
        self.query_log_entries("ORDER BY sequence DESC")
    }

    /// All entries in chain order (oldest first).
    pub fn log_entries_in_chain_order(&self) -> DbResult<Vec<LogEntry>> {
        self.query_log_entries("ORDER BY sequence ASC")
    }

    fn query_log_entries(&self, order: &str) -> DbResult<Vec<LogEntry>> {
        let sql = format!("{} {}", SELECT_COLUMNS, order);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], LogRow::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }

    /// Get an entry by ID.
    pub fn log_entry(&self, entry_id: &str) -> DbResult<Option<LogEntry>> {
        let sql = format!("{} WHERE entry_id = ?", SELECT_COLUMNS);
        self.conn
            .query_row(&sql, [entry_id], LogRow::from_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get an entry by ID, failing when absent.
    pub fn require_log_entry(&self, entry_id: &str) -> DbResult<LogEntry> {
        self.log_entry(entry_id)?
            .ok_or_else(|| DbError::NotFound(format!("log entry {}", entry_id)))
    }

    pub fn log_entry_count(&self) -> DbResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM assessment_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Hash of the newest entry, or the genesis hash for an empty log.
    pub fn log_head_hash(&self) -> DbResult<String> {
        let head: Option<String> = self
            .conn
            .query_row(
                "SELECT entry_hash FROM assessment_log ORDER BY sequence DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(head.unwrap_or_else(|| GENESIS_HASH.to_string()))
    }

    /// Walk the chain from genesis, recomputing every hash.
    pub fn verify_log_chain(&self) -> DbResult<ChainVerification> {
        let entries = self.log_entries_in_chain_order()?;
        let mut expected_prev = GENESIS_HASH.to_string();
        let mut first_broken = None;

        for (index, entry) in entries.iter().enumerate() {
            let in_sequence = entry.sequence == index as u64 + 1;
            let linked = entry.prev_hash == expected_prev;
            if !(in_sequence && linked && entry.hash_is_valid()?) {
                first_broken = Some(entry.sequence);
                break;
            }
            expected_prev = entry.entry_hash.clone();
        }

        let head_hash = entries
            .last()
            .map(|entry| entry.entry_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        if let Some(sequence) = first_broken {
            tracing::warn!(sequence, "assessment log chain is broken");
        }

        Ok(ChainVerification {
            entries_checked: entries.len() as u64,
            first_broken,
            head_hash,
        })
    }
}
