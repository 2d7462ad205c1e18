//! Engine configuration (TOML).
//!
//! Lookup order for [`EngineConfig::load`]:
//! 1) `$PONV_CONFIG_PATH`
//! 2) `config/ponv.toml`
//! 3) built-in defaults
//!
//! `$PONV_SCORING_VARIANT` (`full` | `basic`) then overrides the scoring variant.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::{ScoringVariant, UnknownVariant};

pub const CONFIG_PATH_ENV: &str = "PONV_CONFIG_PATH";
pub const SCORING_VARIANT_ENV: &str = "PONV_SCORING_VARIANT";
pub const DEFAULT_CONFIG_PATH: &str = "config/ponv.toml";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("PONV_CONFIG_PATH points to non-existent path {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Invalid scoring variant: {0}")]
    Variant(#[from] UnknownVariant),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub variant: ScoringVariant,
    /// Only read by the full variant
    pub include_muscle_relaxant: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            variant: ScoringVariant::Full,
            include_muscle_relaxant: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStoreConfig {
    /// SQLite file holding the assessment log
    pub path: PathBuf,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ponv_logs.db"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Classifier probability at or above which PONV is predicted
    pub decision_threshold: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Synthetic rows generated for training + validation
    pub samples: usize,
    pub seed: u64,
    /// Share of rows held out for validation
    pub validation_fraction: f64,
    pub learning_rate: f64,
    /// Gradient descent passes for logistic regression
    pub epochs: usize,
    /// Boosting rounds
    pub estimators: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: 500,
            seed: 42,
            validation_fraction: 0.3,
            learning_rate: 0.1,
            epochs: 500,
            estimators: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub log_store: LogStoreConfig,
    pub evaluation: EvaluationConfig,
    pub training: TrainingConfig,
}

fn unit_interval(field: &'static str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is not in (0, 1)", value),
        })
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load() -> ConfigResult<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let variant = std::env::var(SCORING_VARIANT_ENV).ok();
        Self::resolve(
            env_path.as_deref(),
            Path::new(DEFAULT_CONFIG_PATH),
            variant.as_deref(),
        )
    }

    /// [`EngineConfig::load`] with the environment passed in.
    pub fn resolve(
        env_path: Option<&str>,
        fallback: &Path,
        variant_override: Option<&str>,
    ) -> ConfigResult<Self> {
        let mut config = match env_path {
            Some(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path));
                }
                Self::load_from(&path)?
            }
            None if fallback.exists() => Self::load_from(fallback)?,
            None => Self::default(),
        };

        if let Some(variant) = variant_override {
            config.scoring.variant = variant.parse()?;
        }

        tracing::debug!(
            variant = %config.scoring.variant,
            include_muscle_relaxant = config.scoring.include_muscle_relaxant,
            log_store = %config.log_store.path.display(),
            "loaded engine config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        unit_interval(
            "evaluation.decision_threshold",
            self.evaluation.decision_threshold,
        )?;
        unit_interval(
            "training.validation_fraction",
            self.training.validation_fraction,
        )?;
        if self.training.samples == 0 {
            return Err(ConfigError::Invalid {
                field: "training.samples",
                reason: "must be positive".into(),
            });
        }
        if self.training.learning_rate.is_nan() || self.training.learning_rate <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "training.learning_rate",
                reason: format!("{} is not positive", self.training.learning_rate),
            });
        }
        Ok(())
    }
}
