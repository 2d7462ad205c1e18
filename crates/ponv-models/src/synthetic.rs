//! Seeded synthetic PONV cohort.
//!
//! Binary columns are fair coin flips, age is Normal(45, 15) rounded to whole
//! years inside the form's age domain, doses are Exponential with mean 2 and
//! the propofol score is drawn from {-3, -1, 0}. The outcome is Bernoulli with
//! `p = sigmoid(2 * (risk - protective))` over a fixed subset of columns.

use ponv_core::features::{FeatureVector, AGE_INDEX, FEATURE_COUNT, FIRST_DOSE_INDEX, PROPOFOL_INDEX};
use ponv_core::models::Age;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::dataset::LabeledData;
use crate::sigmoid;

const AGE_MEAN: f64 = 45.0;
const AGE_SD: f64 = 15.0;
const DOSE_MEAN: f64 = 2.0;
const PROPOFOL_SCORES: [f64; 3] = [-3.0, -1.0, 0.0];
const LOGIT_SCALE: f64 = 2.0;

/// `(column, weight)` pairs raising PONV probability.
pub const RISK_WEIGHTS: [(usize, f64); 11] = [
    (0, 2.5),
    (2, 2.0),
    (4, 1.5),
    (5, 1.5),
    (6, 1.2),
    (7, 2.0),
    (8, 1.5),
    (9, 1.5),
    (11, 1.2),
    (12, 2.5),
    (13, 1.5),
];

/// `(column, weight)` pairs lowering it.
pub const PROTECTIVE_WEIGHTS: [(usize, f64); 4] = [(14, 1.5), (15, 2.5), (16, 2.5), (17, 1.5)];

fn standard_normal(rng: &mut impl Rng) -> f64 {
    // Box-Muller; u1 excludes 0 so ln stays finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn exponential(rng: &mut impl Rng, mean: f64) -> f64 {
    let u: f64 = rng.gen::<f64>();
    -mean * (1.0 - u).ln()
}

fn sample_row(rng: &mut impl Rng) -> FeatureVector {
    let mut values = [0.0; FEATURE_COUNT];
    for value in values.iter_mut().take(FIRST_DOSE_INDEX) {
        *value = if rng.gen_bool(0.5) { 1.0 } else { 0.0 };
    }
    let age = (AGE_MEAN + AGE_SD * standard_normal(rng)).round();
    values[AGE_INDEX] = age.clamp(f64::from(Age::MIN), f64::from(Age::MAX));
    for value in values.iter_mut().take(PROPOFOL_INDEX).skip(FIRST_DOSE_INDEX) {
        *value = exponential(rng, DOSE_MEAN);
    }
    values[PROPOFOL_INDEX] = PROPOFOL_SCORES.choose(rng).copied().unwrap_or_default();
    FeatureVector(values)
}

/// Probability of PONV the generator assigns to a row.
pub fn outcome_probability(features: &FeatureVector) -> f64 {
    let weighted = |weights: &[(usize, f64)]| -> f64 {
        weights.iter().map(|&(column, w)| w * features.0[column]).sum()
    };
    sigmoid(LOGIT_SCALE * (weighted(&RISK_WEIGHTS) - weighted(&PROTECTIVE_WEIGHTS)))
}

/// Generate `samples` labeled rows, reproducibly for a given `seed`.
pub fn generate(samples: usize, seed: u64) -> LabeledData {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(samples);
    let mut labels = Vec::with_capacity(samples);
    for _ in 0..samples {
        let row = sample_row(&mut rng);
        labels.push(rng.gen::<f64>() < outcome_probability(&row));
        features.push(row);
    }
    tracing::debug!(
        samples,
        seed,
        positives = labels.iter().filter(|&&l| l).count(),
        "generated synthetic cohort"
    );
    LabeledData { features, labels }
}
