//! PONV Core Library
//!
//! Hybrid risk scoring for postoperative nausea and vomiting with an
//! append-only, hash-chained assessment log.
//!
//! # Architecture
//!
//! ```text
//! AssessmentInput (form / JSON)
//!         │  validate (no defaulting, no clamping)
//!         ▼
//! PatientAssessment ──► HybridScorer ──► ScoreBreakdown ──► hybrid score
//!         │                                                    │
//!         │                                                    ▼
//!         │                                             RiskCategory
//!         │                                                    │
//!         ▼                                                    ▼
//!   FeatureVector ──► Classifier(s)                     Recommendations
//!         │                │
//!         └───────┬────────┘
//!                 ▼
//!  ┌───────────────────────────────┐
//!  │   assessment_log (SQLite)     │
//!  │  entry_hash = sha256(prev ‖   │
//!  │               entry_json)     │
//!  └───────────────┬───────────────┘
//!                  │
//!          ┌───────┴───────┐
//!          ▼               ▼
//!     JSON export      CSV export
//! ```
//!
//! # Core Principle
//!
//! **The score is advisory.** Every result carries its breakdown so a
//! clinician can see which terms produced it.
//!
//! # Modules
//!
//! - [`models`]: Domain types (PatientAssessment, Dose, LogEntry, etc.)
//! - [`scoring`]: Dose-response tables and hybrid score aggregation
//! - [`risk`]: Score to risk category mapping
//! - [`features`]: Positional feature vector for classifiers
//! - [`recommendations`]: Prophylaxis and rescue guidance per category
//! - [`pipeline`]: One full evaluation of an assessment
//! - [`db`]: SQLite assessment log with hash chain
//! - [`export`]: Log and report export
//! - [`batch`]: CSV dataset evaluation and classification metrics
//! - [`config`]: TOML engine configuration

pub mod batch;
pub mod config;
pub mod db;
pub mod export;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod recommendations;
pub mod risk;
pub mod scoring;

// Re-export commonly used types
pub use batch::{BatchDataset, BatchEvaluator, BatchReport, Classifier, ModelProvider};
pub use config::EngineConfig;
pub use db::{AssessmentLogSink, ChainVerification, Database};
pub use features::{feature_vector, FeatureVector};
pub use models::{
    Age, AssessmentInput, Dose, Drug, LogEntry, ModelPrediction, NewLogEntry, PatientAssessment,
};
pub use pipeline::RiskAssessment;
pub use risk::RiskCategory;
pub use scoring::{calculate_hybrid_score, HybridScorer, ScoreBreakdown, ScoringVariant};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use config::ScoringConfig;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PonvError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for PonvError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(id) => PonvError::NotFound(id),
            db::DbError::InvalidPrediction(e) => PonvError::InvalidInput(e.to_string()),
            other => PonvError::DatabaseError(other.to_string()),
        }
    }
}

impl From<models::InvalidProbability> for PonvError {
    fn from(e: models::InvalidProbability) -> Self {
        PonvError::InvalidInput(e.to_string())
    }
}

impl From<export::ExportError> for PonvError {
    fn from(e: export::ExportError) -> Self {
        PonvError::SerializationError(e.to_string())
    }
}

impl From<serde_json::Error> for PonvError {
    fn from(e: serde_json::Error) -> Self {
        PonvError::SerializationError(e.to_string())
    }
}

impl From<models::AssessmentError> for PonvError {
    fn from(e: models::AssessmentError) -> Self {
        PonvError::InvalidInput(e.to_string())
    }
}

impl From<risk::UnknownCategory> for PonvError {
    fn from(e: risk::UnknownCategory) -> Self {
        PonvError::InvalidInput(e.to_string())
    }
}

impl From<scoring::UnknownVariant> for PonvError {
    fn from(e: scoring::UnknownVariant) -> Self {
        PonvError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PonvError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PonvError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

fn core_with(db: Database, scoring: ScoringConfig) -> Arc<PonvCore> {
    Arc::new(PonvCore {
        db: Arc::new(Mutex::new(db)),
        scorer: scoring::scorer_for(&scoring),
    })
}

/// Open or create a log store at the given path, scoring with the default
/// (full) variant.
#[uniffi::export]
pub fn open_log_store(path: String) -> Result<Arc<PonvCore>, PonvError> {
    let db = Database::open(&path)?;
    Ok(core_with(db, ScoringConfig::default()))
}

/// Open or create a log store with an explicit scoring variant.
#[uniffi::export]
pub fn open_log_store_with_variant(
    path: String,
    variant: String,
    include_muscle_relaxant: bool,
) -> Result<Arc<PonvCore>, PonvError> {
    let scoring = ScoringConfig {
        variant: variant.parse()?,
        include_muscle_relaxant,
    };
    let db = Database::open(&path)?;
    Ok(core_with(db, scoring))
}

/// Create an in-memory log store (for testing).
#[uniffi::export]
pub fn open_log_store_in_memory() -> Result<Arc<PonvCore>, PonvError> {
    let db = Database::open_in_memory()?;
    Ok(core_with(db, ScoringConfig::default()))
}

/// `(label, css tag)` for a hybrid score.
#[uniffi::export]
pub fn risk_category_for_score(score: i32) -> FfiRiskCategory {
    RiskCategory::from_score(score).into()
}

/// Flattened prophylaxis + rescue guidance for a category label.
#[uniffi::export]
pub fn recommendations_for_category(category: String) -> Result<Vec<String>, PonvError> {
    let category: RiskCategory = category.parse()?;
    Ok(recommendations::recommendations(category))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe log store and scorer wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PonvCore {
    db: Arc<Mutex<Database>>,
    scorer: Box<dyn HybridScorer + Send + Sync>,
}

impl PonvCore {
    fn evaluate_json(&self, assessment_json: &str) -> Result<RiskAssessment, PonvError> {
        let input: AssessmentInput = serde_json::from_str(assessment_json)?;
        let assessment = PatientAssessment::try_from(input)?;
        Ok(RiskAssessment::evaluate(&assessment, self.scorer.as_ref()))
    }
}

#[uniffi::export]
impl PonvCore {
    // =========================================================================
    // Scoring Operations
    // =========================================================================

    /// Score an assessment given as form JSON. Nothing is persisted.
    pub fn assess(&self, assessment_json: String) -> Result<FfiAssessmentResult, PonvError> {
        let result = self.evaluate_json(&assessment_json)?;
        Ok(result.into())
    }

    /// Name of the active scoring variant.
    pub fn scoring_variant(&self) -> String {
        self.scorer.variant().to_string()
    }

    // =========================================================================
    // Log Operations
    // =========================================================================

    /// Score an assessment and append it, with any model output, to the log.
    pub fn log_assessment(
        &self,
        assessment_json: String,
        predictions: Vec<FfiModelPrediction>,
    ) -> Result<FfiLogEntry, PonvError> {
        let result = self.evaluate_json(&assessment_json)?;
        let predictions = predictions.into_iter().map(Into::into).collect();
        let mut db = self.db.lock()?;
        let entry = db.append(NewLogEntry::from_assessment(&result, predictions))?;
        Ok(entry.into())
    }

    /// All log entries, newest first.
    pub fn list_log_entries(&self) -> Result<Vec<FfiLogEntry>, PonvError> {
        let db = self.db.lock()?;
        let entries = db.list_log_entries()?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// Get a log entry by ID.
    pub fn get_log_entry(&self, entry_id: String) -> Result<Option<FfiLogEntry>, PonvError> {
        let db = self.db.lock()?;
        let entry = db.log_entry(&entry_id)?;
        Ok(entry.map(|e| e.into()))
    }

    /// Walk the hash chain from genesis.
    pub fn verify_log(&self) -> Result<FfiChainVerification, PonvError> {
        let db = self.db.lock()?;
        let verification = db.verify_log_chain()?;
        Ok(verification.into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export the log as JSON.
    pub fn export_logs_json(&self) -> Result<String, PonvError> {
        let db = self.db.lock()?;
        let exporter = export::LogExporter::new(&db);
        let export = exporter.export_all()?;
        Ok(export.to_json()?)
    }

    /// Export the log as CSV.
    pub fn export_logs_csv(&self) -> Result<String, PonvError> {
        let db = self.db.lock()?;
        let exporter = export::LogExporter::new(&db);
        let export = exporter.export_all()?;
        Ok(export.to_csv()?)
    }

    /// Full report bundle for one assessment as JSON.
    pub fn assessment_report_json(
        &self,
        assessment_json: String,
        predictions: Vec<FfiModelPrediction>,
    ) -> Result<String, PonvError> {
        let result = self.evaluate_json(&assessment_json)?;
        let predictions: Vec<ModelPrediction> = predictions.into_iter().map(Into::into).collect();
        for prediction in &predictions {
            prediction.validate()?;
        }
        Ok(export::AssessmentReport::new(&result, predictions).to_json()?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRiskCategory {
    pub label: String,
    pub css_tag: String,
    pub risk_percentage: u8,
}

impl From<RiskCategory> for FfiRiskCategory {
    fn from(category: RiskCategory) -> Self {
        Self {
            label: category.label().to_string(),
            css_tag: category.css_tag().to_string(),
            risk_percentage: category.risk_percentage(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiContribution {
    pub label: String,
    pub points: i32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssessmentResult {
    pub scoring_variant: String,
    pub hybrid_score: i32,
    pub risk_category: FfiRiskCategory,
    pub breakdown: Vec<FfiContribution>,
    pub features: Vec<f64>,
    pub recommendations: Vec<String>,
}

impl From<RiskAssessment> for FfiAssessmentResult {
    fn from(result: RiskAssessment) -> Self {
        Self {
            scoring_variant: result.variant.to_string(),
            hybrid_score: result.hybrid_score,
            risk_category: result.category.into(),
            breakdown: result
                .breakdown
                .labeled()
                .into_iter()
                .map(|(label, points)| FfiContribution { label, points })
                .collect(),
            features: result.features.as_slice().to_vec(),
            recommendations: result.recommendations,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiModelPrediction {
    pub model: String,
    pub probability: f64,
}

impl From<FfiModelPrediction> for ModelPrediction {
    fn from(p: FfiModelPrediction) -> Self {
        ModelPrediction::new(p.model, p.probability)
    }
}

impl From<ModelPrediction> for FfiModelPrediction {
    fn from(p: ModelPrediction) -> Self {
        Self {
            model: p.model,
            probability: p.probability,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLogEntry {
    pub sequence: u64,
    pub entry_id: String,
    pub created_at: String,
    pub scoring_variant: String,
    pub hybrid_score: i32,
    pub risk_category: String,
    pub predictions: Vec<FfiModelPrediction>,
    pub prev_hash: String,
    pub entry_hash: String,
}

impl From<LogEntry> for FfiLogEntry {
    fn from(entry: LogEntry) -> Self {
        Self {
            sequence: entry.sequence,
            entry_id: entry.entry_id,
            created_at: entry.created_at,
            scoring_variant: entry.record.scoring_variant.to_string(),
            hybrid_score: entry.record.hybrid_score,
            risk_category: entry.record.risk_category.label().to_string(),
            predictions: entry
                .record
                .predictions
                .into_iter()
                .map(Into::into)
                .collect(),
            prev_hash: entry.prev_hash,
            entry_hash: entry.entry_hash,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChainVerification {
    pub entries_checked: u64,
    pub first_broken: Option<u64>,
    pub head_hash: String,
    pub intact: bool,
}

impl From<ChainVerification> for FfiChainVerification {
    fn from(v: ChainVerification) -> Self {
        Self {
            intact: v.is_intact(),
            entries_checked: v.entries_checked,
            first_broken: v.first_broken,
            head_hash: v.head_hash,
        }
    }
}
