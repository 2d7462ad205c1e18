//! Uploaded evaluation datasets (CSV).
//!
//! A dataset is accepted whole or not at all: any missing column or any
//! invalid cell rejects the entire upload with every problem listed.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use super::{BatchError, BatchResult, RowError};
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES, OUTCOME_COLUMN};
use crate::models::{closest_label, AssessmentError, PatientAssessment};

/// One validated row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub features: FeatureVector,
    pub assessment: PatientAssessment,
    pub outcome: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchDataset {
    rows: Vec<BatchRow>,
}

/// Every column a dataset must carry.
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    FEATURE_NAMES.into_iter().chain(std::iter::once(OUTCOME_COLUMN))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_outcome(raw: &str) -> Option<bool> {
    match parse_number(raw)? {
        v if v == 1.0 => Some(true),
        v if v == 0.0 => Some(false),
        _ => None,
    }
}

impl BatchDataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> BatchResult<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> BatchResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(index, name)| (name, index))
            .collect();

        let missing: Vec<String> = required_columns()
            .filter(|column| !positions.contains_key(column))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            let extra: Vec<&str> = headers
                .iter()
                .filter(|name| !required_columns().any(|column| column == *name))
                .collect();
            let suggestions = missing
                .iter()
                .filter_map(|column| {
                    closest_label(column, extra.iter().copied())
                        .map(|found| (column.clone(), found))
                })
                .collect();
            tracing::warn!(missing = ?missing, "rejected batch: schema mismatch");
            return Err(BatchError::SchemaMismatch {
                missing,
                suggestions,
            });
        }

        let feature_positions: Vec<usize> = FEATURE_NAMES
            .iter()
            .map(|name| positions[name])
            .collect();
        let outcome_position = positions[OUTCOME_COLUMN];

        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for (index, record) in csv_reader.records().enumerate() {
            let row = index + 1;
            let record = record?;
            let cell = |position: usize| record.get(position).unwrap_or_default();

            let mut values = [0.0; FEATURE_COUNT];
            let mut row_ok = true;
            for (column, &position) in feature_positions.iter().enumerate() {
                match parse_number(cell(position)) {
                    Some(value) => values[column] = value,
                    None => {
                        row_ok = false;
                        errors.push(RowError::new(
                            row,
                            FEATURE_NAMES[column],
                            format!("'{}' is not a number", cell(position)),
                        ));
                    }
                }
            }

            let outcome = parse_outcome(cell(outcome_position));
            if outcome.is_none() {
                row_ok = false;
                errors.push(RowError::new(
                    row,
                    OUTCOME_COLUMN,
                    format!("expected 0 or 1, got '{}'", cell(outcome_position)),
                ));
            }

            if !row_ok {
                continue;
            }

            let features = FeatureVector(values);
            match PatientAssessment::from_features(&features) {
                Ok(assessment) => rows.push(BatchRow {
                    row,
                    features,
                    assessment,
                    outcome: outcome.unwrap_or_default(),
                }),
                Err(AssessmentError::InvalidValue { field, reason }) => {
                    errors.push(RowError::new(row, &field, reason))
                }
                Err(other) => errors.push(RowError::new(row, "", other.to_string())),
            }
        }

        if !errors.is_empty() {
            tracing::warn!(invalid_cells = errors.len(), "rejected batch: invalid rows");
            return Err(BatchError::InvalidRows(errors));
        }
        if rows.is_empty() {
            return Err(BatchError::Empty);
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[BatchRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn outcomes(&self) -> Vec<bool> {
        self.rows.iter().map(|r| r.outcome).collect()
    }
}
