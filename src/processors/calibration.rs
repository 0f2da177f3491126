//! Per-class reweighting and confidence sharpening.

use crate::core::config::{CalibrationConfig, CalibrationOrder};
use crate::core::constants::PROBABILITY_EPSILON;
use crate::domain::ClassCatalog;

/// Applies the configured calibration transforms to probability vectors.
///
/// Both transforms renormalize, so the output is always a distribution with no
/// negative or NaN entries.
#[derive(Debug, Clone)]
pub struct Calibrator {
    /// Weights in catalog order; `None` when every weight is 1.0.
    weights: Option<Vec<f64>>,
    /// Sharpening exponent; `None` when sharpening is the identity.
    gamma: Option<f64>,
    order: CalibrationOrder,
}

impl Calibrator {
    /// Resolves `config` against `catalog`.
    ///
    /// A non-positive or non-finite `sharpen_gamma` is ignored with a warning.
    pub fn new(config: &CalibrationConfig, catalog: &ClassCatalog) -> Self {
        let weights = config.resolve_weights(catalog);
        let weights = (!weights.iter().all(|&w| w == 1.0)).then_some(weights);

        let gamma = config.sharpen_gamma;
        let gamma = if !gamma.is_finite() || gamma <= 0.0 {
            tracing::warn!(gamma, "ignoring invalid sharpening exponent");
            None
        } else if gamma == 1.0 {
            None
        } else {
            Some(gamma)
        };

        Self {
            weights,
            gamma,
            order: config.calibration_order,
        }
    }

    /// Multiplies by the class weights and renormalizes.
    pub fn reweight(&self, probs: &[f64]) -> Vec<f64> {
        match &self.weights {
            Some(weights) => {
                renormalize(probs.iter().zip(weights).map(|(p, w)| p * w).collect())
            }
            None => probs.to_vec(),
        }
    }

    /// Raises every probability to `gamma` and renormalizes.
    pub fn sharpen(&self, probs: &[f64]) -> Vec<f64> {
        match self.gamma {
            Some(gamma) => renormalize(
                probs
                    .iter()
                    .map(|&p| p.max(PROBABILITY_EPSILON).powf(gamma))
                    .collect(),
            ),
            None => probs.to_vec(),
        }
    }

    /// Applies both transforms in the configured order.
    pub fn calibrate(&self, probs: &[f64]) -> Vec<f64> {
        match self.order {
            CalibrationOrder::ReweightThenSharpen => self.sharpen(&self.reweight(probs)),
            CalibrationOrder::SharpenThenReweight => self.reweight(&self.sharpen(probs)),
        }
    }
}

/// Divides by the sum; falls back to uniform when the sum is not usable.
pub fn renormalize(values: Vec<f64>) -> Vec<f64> {
    let cleaned: Vec<f64> = values
        .into_iter()
        .map(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect();
    let sum: f64 = cleaned.iter().sum();
    if sum.is_finite() && sum > 0.0 {
        cleaned.into_iter().map(|v| v / sum).collect()
    } else {
        let n = cleaned.len().max(1) as f64;
        vec![1.0 / n; cleaned.len()]
    }
}
