//! Conversion of raw model output into probability distributions.
//!
//! Model exports do not always end in a softmax layer, so each raw vector is
//! inspected: a vector that already looks like a distribution passes through
//! (re-divided by its sum), anything else is treated as logits.

use crate::core::constants::PROBABILITY_SUM_TOLERANCE;
use crate::core::errors::{ClassifierError, ClassifierResult, ProcessingStage, SimpleError};
use serde::Serialize;

/// Which path [`ProbabilityNormalizer::normalize`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationBranch {
    /// The input was already a distribution.
    PassThrough,
    /// The input was treated as logits.
    Softmax,
}

/// Raw vector to probability vector.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityNormalizer {
    temperature: f64,
}

impl Default for ProbabilityNormalizer {
    fn default() -> Self {
        Self { temperature: 1.0 }
    }
}

impl ProbabilityNormalizer {
    /// Creates a normalizer dividing logits by `temperature` before softmax.
    ///
    /// Non-positive or non-finite temperatures fall back to 1.0.
    pub fn new(temperature: f64) -> Self {
        if temperature.is_finite() && temperature > 0.0 {
            Self { temperature }
        } else {
            tracing::warn!("ignoring softmax temperature {}, using 1.0", temperature);
            Self::default()
        }
    }

    /// Returns the softmax temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Normalizes `raw` and reports the branch taken.
    pub fn normalize(&self, raw: &[f32]) -> (Vec<f64>, NormalizationBranch) {
        let values: Vec<f64> = raw.iter().map(|&v| v as f64).collect();
        if is_distribution(&values) {
            let sum: f64 = values.iter().sum();
            (
                values.iter().map(|v| v / sum).collect(),
                NormalizationBranch::PassThrough,
            )
        } else {
            (softmax(&values, self.temperature), NormalizationBranch::Softmax)
        }
    }
}

/// True when every value is finite and in `[0, 1]` and the sum is within tolerance of 1.
pub fn is_distribution(values: &[f64]) -> bool {
    if values.is_empty() {
        return false;
    }
    if !values.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)) {
        return false;
    }
    let sum: f64 = values.iter().sum();
    (sum - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE
}

/// Numerically stable softmax of `logits / temperature`.
///
/// Non-finite logits get zero mass. If no logit is finite the result is uniform.
pub fn softmax(logits: &[f64], temperature: f64) -> Vec<f64> {
    let n = logits.len();
    if n == 0 {
        return Vec::new();
    }
    let max = logits
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![1.0 / n as f64; n];
    }

    let exps: Vec<f64> = logits
        .iter()
        .map(|&v| {
            if v.is_finite() {
                ((v - max) / temperature).exp()
            } else {
                0.0
            }
        })
        .collect();
    // The max element contributes exp(0) = 1, so the sum is at least 1.
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Element-wise mean of individually normalized vectors.
///
/// # Errors
///
/// An empty list is a [`ClassifierError::Processing`] error tagged
/// [`ProcessingStage::Ensemble`]; vectors of different lengths are a
/// [`ClassifierError::ConfigMismatch`].
pub fn ensemble_mean(vectors: &[Vec<f64>]) -> ClassifierResult<Vec<f64>> {
    let Some(first) = vectors.first() else {
        return Err(ClassifierError::processing_error(
            ProcessingStage::Ensemble,
            "no variant results to average",
            SimpleError::new("empty ensemble"),
        ));
    };
    let width = first.len();
    let mut mean = vec![0.0; width];
    for vector in vectors {
        if vector.len() != width {
            return Err(ClassifierError::config_mismatch(
                "ensemble vector width",
                width,
                vector.len(),
            ));
        }
        for (acc, p) in mean.iter_mut().zip(vector) {
            *acc += p;
        }
    }
    let count = vectors.len() as f64;
    mean.iter_mut().for_each(|m| *m /= count);
    Ok(mean)
}
