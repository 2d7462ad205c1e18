//! Assessment log export (JSON and CSV download).

use serde::{Deserialize, Serialize};

use super::{ExportError, ExportResult};
use crate::db::{Database, DbResult};
use crate::models::{ClinicalFactor, Drug, LogEntry};

/// Bumped whenever the CSV column layout changes.
pub const LOG_EXPORT_FORMAT_VERSION: u32 = 1;

/// Log export with chain metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogExport {
    pub metadata: LogExportMetadata,
    /// Entries, newest first
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogExportMetadata {
    pub format_version: u32,
    /// Export timestamp
    pub exported_at: String,
    pub entry_count: usize,
    /// Hash of the newest entry at export time
    pub head_hash: String,
    /// Whether the chain verified before export
    pub chain_intact: bool,
}

fn csv_header() -> Vec<&'static str> {
    let mut columns = vec!["sequence", "entry_id", "created_at", "scoring_variant"];
    columns.extend(ClinicalFactor::ALL.iter().map(|f| f.field_name()));
    columns.push("age");
    columns.extend(Drug::ALL.iter().map(|d| d.field_name()));
    columns.extend([
        "opioid",
        "propofol_mode",
        "muscle_relaxant",
        "muscle_relaxant_mg_per_kg",
        "hybrid_score",
        "risk_category",
        "predictions",
        "prev_hash",
        "entry_hash",
    ]);
    columns
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

fn csv_record(entry: &LogEntry) -> Vec<String> {
    let assessment = &entry.record.assessment;
    let mut cells = vec![
        entry.sequence.to_string(),
        entry.entry_id.clone(),
        entry.created_at.clone(),
        entry.record.scoring_variant.to_string(),
    ];
    cells.extend(assessment.factors.iter().map(|(_, present)| yes_no(present)));
    cells.push(assessment.age.years().to_string());
    cells.extend(assessment.doses.iter().map(|(_, dose)| dose.to_string()));
    cells.push(yes_no(assessment.doses.any_opioid()));
    cells.push(assessment.propofol.label().to_string());
    cells.push(assessment.muscle_relaxant.agent.label().to_string());
    cells.push(assessment.muscle_relaxant.dose_mg_per_kg.to_string());
    cells.push(entry.record.hybrid_score.to_string());
    cells.push(entry.record.risk_category.label().to_string());

    let predictions: Vec<String> = entry
        .record
        .predictions
        .iter()
        .map(|p| format!("{}={:.4}", p.model, p.probability))
        .collect();
    cells.push(predictions.join(";"));
    cells.push(entry.prev_hash.clone());
    cells.push(entry.entry_hash.clone());
    cells
}

impl LogExport {
    pub fn new(entries: Vec<LogEntry>, head_hash: String, chain_intact: bool) -> Self {
        Self {
            metadata: LogExportMetadata {
                format_version: LOG_EXPORT_FORMAT_VERSION,
                exported_at: chrono::Utc::now().to_rfc3339(),
                entry_count: entries.len(),
                head_hash,
                chain_intact,
            },
            entries,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format, one row per entry.
    pub fn to_csv(&self) -> ExportResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(csv_header())?;
        for entry in &self.entries {
            writer.write_record(csv_record(entry))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Csv(e.into_error().into()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Log exporter.
pub struct LogExporter<'a> {
    db: &'a Database,
}

impl<'a> LogExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Export every entry after verifying the chain.
    pub fn export_all(&self) -> DbResult<LogExport> {
        let verification = self.db.verify_log_chain()?;
        let entries = self.db.list_log_entries()?;
        Ok(LogExport::new(
            entries,
            verification.head_hash.clone(),
            verification.is_intact(),
        ))
    }
}
