//! Per-column standardization (zero mean, unit variance).

use ponv_core::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    /// Population standard deviation; 1.0 for constant columns
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    pub fn fit(rows: &[FeatureVector]) -> ModelResult<Self> {
        if rows.is_empty() {
            return Err(ModelError::EmptyData);
        }
        let n = rows.len() as f64;

        let mut mean = [0.0; FEATURE_COUNT];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.0.iter()) {
                *m += v / n;
            }
        }

        let mut scale = [0.0; FEATURE_COUNT];
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row.0.iter()).zip(mean.iter()) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = if *s > f64::EPSILON { s.sqrt() } else { 1.0 };
        }

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, row: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, o) in out.iter_mut().enumerate() {
            *o = (row.0[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    pub fn mean(&self) -> &[f64; FEATURE_COUNT] {
        &self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(age: f64, dose: f64) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[3] = age;
        values[14] = dose;
        FeatureVector(values)
    }

    #[test]
    fn test_standardizes_columns() {
        let rows = [row(30.0, 1.0), row(50.0, 3.0)];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.mean()[3], 40.0);

        let scaled = scaler.transform(&rows[0]);
        assert!((scaled[3] + 1.0).abs() < 1e-12);
        assert!((scaled[14] + 1.0).abs() < 1e-12);
        // Constant column stays at zero instead of dividing by zero
        assert_eq!(scaled[0], 0.0);
    }

    #[test]
    fn test_empty_rows_rejected() {
        assert_eq!(StandardScaler::fit(&[]), Err(ModelError::EmptyData));
    }
}
