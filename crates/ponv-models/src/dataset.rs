//! Labeled feature rows and the train/validation split.

use std::io::Write;

use ponv_core::batch::required_columns;
use ponv_core::features::FeatureVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{ModelError, ModelResult};

/// Feature rows with their observed outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledData {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<bool>,
}

impl LabeledData {
    pub fn new(features: Vec<FeatureVector>, labels: Vec<bool>) -> ModelResult<Self> {
        if features.len() != labels.len() {
            return Err(ModelError::DimensionMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    /// Fails unless the data is non-empty and holds both outcome classes.
    pub fn require_trainable(&self) -> ModelResult<()> {
        if self.features.len() != self.labels.len() {
            return Err(ModelError::DimensionMismatch {
                features: self.features.len(),
                labels: self.labels.len(),
            });
        }
        if self.is_empty() {
            return Err(ModelError::EmptyData);
        }
        let positives = self.positives();
        if positives == 0 || positives == self.len() {
            return Err(ModelError::SingleClass);
        }
        Ok(())
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Write in the batch upload layout (feature columns then outcome).
    pub fn write_csv<W: Write>(&self, writer: W) -> ModelResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(required_columns())?;
        for (features, &label) in self.features.iter().zip(&self.labels) {
            let mut record: Vec<String> = features.as_slice().iter().map(f64::to_string).collect();
            record.push(if label { "1" } else { "0" }.to_string());
            csv_writer.write_record(&record)?;
        }
        csv_writer
            .flush()
            .map_err(|e| ModelError::Csv(e.to_string()))?;
        Ok(())
    }
}

/// Training and held-out rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: LabeledData,
    pub validation: LabeledData,
}

/// Shuffle with `seed` and hold out `ceil(len * validation_fraction)` rows.
pub fn train_test_split(
    data: &LabeledData,
    validation_fraction: f64,
    seed: u64,
) -> ModelResult<Split> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        return Err(ModelError::InvalidParameter {
            field: "validation_fraction",
            reason: format!("{} is not in (0, 1)", validation_fraction),
        });
    }
    if data.is_empty() {
        return Err(ModelError::EmptyData);
    }

    let held_out = (data.len() as f64 * validation_fraction).ceil() as usize;
    if held_out >= data.len() {
        return Err(ModelError::InvalidParameter {
            field: "validation_fraction",
            reason: format!("leaves no training rows out of {}", data.len()),
        });
    }

    let mut indices: Vec<usize> = (0..data.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (validation, train) = indices.split_at(held_out);

    Ok(Split {
        train: data.subset(train),
        validation: data.subset(validation),
    })
}
