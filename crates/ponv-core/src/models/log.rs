//! Assessment log models (append-only audit trail).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::PatientAssessment;
use crate::features::FeatureVector;
use crate::pipeline::RiskAssessment;
use crate::risk::RiskCategory;
use crate::scoring::ScoringVariant;

/// `prev_hash` of the first entry in the chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A classifier's probability for one assessment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPrediction {
    /// Classifier name (e.g., "logistic_regression")
    pub model: String,
    /// Predicted PONV probability (0.0 - 1.0)
    pub probability: f64,
}

/// A probability that is NaN, infinite or outside [0, 1].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Model '{model}' returned probability {probability}, expected a value in [0, 1]")]
pub struct InvalidProbability {
    pub model: String,
    pub probability: f64,
}

impl ModelPrediction {
    pub fn new(model: impl Into<String>, probability: f64) -> Self {
        Self {
            model: model.into(),
            probability,
        }
    }

    /// Non-finite values would serialize as `null` and never decode again.
    pub fn validate(&self) -> Result<(), InvalidProbability> {
        if (0.0..=1.0).contains(&self.probability) {
            Ok(())
        } else {
            Err(InvalidProbability {
                model: self.model.clone(),
                probability: self.probability,
            })
        }
    }
}

/// Everything recorded about one scored assessment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLogEntry {
    pub assessment: PatientAssessment,
    pub scoring_variant: ScoringVariant,
    pub hybrid_score: i32,
    pub risk_category: RiskCategory,
    pub features: FeatureVector,
    pub predictions: Vec<ModelPrediction>,
}

impl NewLogEntry {
    /// Record a finished risk assessment and whatever model output accompanied it.
    pub fn from_assessment(result: &RiskAssessment, predictions: Vec<ModelPrediction>) -> Self {
        Self {
            assessment: result.assessment.clone(),
            scoring_variant: result.variant,
            hybrid_score: result.hybrid_score,
            risk_category: result.category,
            features: result.features.clone(),
            predictions,
        }
    }
}

/// A persisted, hash-chained log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// Position in the chain, starting at 1
    pub sequence: u64,
    /// UUID assigned at append time
    pub entry_id: String,
    /// Append timestamp (RFC 3339)
    pub created_at: String,
    #[serde(flatten)]
    pub record: NewLogEntry,
    /// Hash of the previous entry (or [`GENESIS_HASH`])
    pub prev_hash: String,
    /// SHA-256 over `prev_hash` and the canonical entry body
    pub entry_hash: String,
}

/// Fields covered by the entry hash, in a fixed order.
#[derive(Serialize)]
struct HashedBody<'a> {
    sequence: u64,
    entry_id: &'a str,
    created_at: &'a str,
    record: &'a NewLogEntry,
}

impl LogEntry {
    /// Compute the chained hash for an entry body.
    pub fn compute_hash(
        prev_hash: &str,
        sequence: u64,
        entry_id: &str,
        created_at: &str,
        record: &NewLogEntry,
    ) -> Result<String, serde_json::Error> {
        let body = serde_json::to_string(&HashedBody {
            sequence,
            entry_id,
            created_at,
            record,
        })?;
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(body.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Whether the stored hash matches the entry's content.
    pub fn hash_is_valid(&self) -> Result<bool, serde_json::Error> {
        let expected = Self::compute_hash(
            &self.prev_hash,
            self.sequence,
            &self.entry_id,
            &self.created_at,
            &self.record,
        )?;
        Ok(expected == self.entry_hash)
    }
}
