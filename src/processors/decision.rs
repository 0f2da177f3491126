//! The rejection rule that turns a calibrated distribution into a verdict.
//!
//! A prediction is replaced by the unknown sentinel when any of three
//! independent signals fires: the top probability is under its threshold, the
//! gap to the runner-up is under the margin, or the distribution's entropy is
//! over the entropy threshold. Each signal is reported separately.

use super::topk::Topk;
use crate::core::config::CalibrationConfig;
use crate::core::errors::{ClassifierError, ClassifierResult};
use crate::domain::{ClassCatalog, ClassificationResult, DecisionDiagnostics, RejectionSignals};

/// Shannon entropy in nats over the strictly positive entries.
pub fn entropy(probs: &[f64]) -> f64 {
    -probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.ln())
        .sum::<f64>()
}

/// Rounds `probability * 100` to two decimals.
pub fn confidence_score(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}

/// Thresholds resolved against a catalog.
#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    /// Effective confidence threshold per catalog index.
    thresholds: Vec<f64>,
    margin_threshold: f64,
    entropy_threshold: f64,
}

impl DecisionPolicy {
    /// Resolves per-label threshold overrides into catalog order.
    pub fn new(config: &CalibrationConfig, catalog: &ClassCatalog) -> Self {
        Self {
            thresholds: catalog
                .labels()
                .iter()
                .map(|label| config.threshold_for(label))
                .collect(),
            margin_threshold: config.margin_threshold,
            entropy_threshold: config.entropy_threshold,
        }
    }

    /// Effective confidence threshold for the class at `index`.
    pub fn threshold_for(&self, index: usize) -> Option<f64> {
        self.thresholds.get(index).copied()
    }

    /// Decides between the top class and the unknown sentinel.
    ///
    /// # Arguments
    ///
    /// * `probs` - Calibrated distribution in catalog order.
    /// * `catalog` - The catalog the policy was built for.
    ///
    /// # Returns
    ///
    /// A result with diagnostics attached; callers strip them when not wanted.
    ///
    /// # Errors
    ///
    /// [`ClassifierError::ConfigMismatch`] when `probs` and the catalog differ in length.
    pub fn decide(
        &self,
        probs: &[f64],
        catalog: &ClassCatalog,
    ) -> ClassifierResult<ClassificationResult> {
        if probs.len() != catalog.len() || probs.len() != self.thresholds.len() {
            return Err(ClassifierError::config_mismatch(
                "probability vector width",
                catalog.len(),
                probs.len(),
            ));
        }

        let top = Topk::new(2)
            .map_err(ClassifierError::invalid_input)?
            .select(probs);
        let (best, second) = match top.as_slice() {
            [best, second, ..] => (*best, *second),
            _ => {
                return Err(ClassifierError::config_mismatch(
                    "probability vector width",
                    2,
                    top.len(),
                ));
            }
        };

        let entropy = entropy(probs);
        let threshold = self.thresholds[best.index];
        let margin = best.probability - second.probability;
        let signals = RejectionSignals {
            below_threshold: best.probability < threshold,
            narrow_margin: margin < self.margin_threshold,
            high_entropy: entropy > self.entropy_threshold,
        };
        let applied_unknown = signals.any();

        let best_label = catalog.label(best.index).unwrap_or_default().to_string();
        let label = if applied_unknown {
            catalog.unknown_label().to_string()
        } else {
            best_label.clone()
        };

        tracing::debug!(
            best = %best_label,
            best_p = best.probability,
            second_p = second.probability,
            entropy,
            threshold,
            ?signals,
            "decision: {}",
            label
        );

        Ok(ClassificationResult {
            label,
            score: confidence_score(best.probability),
            applied_unknown,
            best_index: best.index,
            best_label,
            diagnostics: Some(DecisionDiagnostics {
                probabilities: probs.to_vec(),
                best_probability: best.probability,
                second_index: second.index,
                second_probability: second.probability,
                margin,
                entropy,
                threshold,
                signals,
                variant_branches: Vec::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ClassCatalog {
        ClassCatalog::new(vec!["A".into(), "B".into(), "Unknown".into()]).unwrap()
    }

    fn config() -> CalibrationConfig {
        CalibrationConfig::new()
            .with_confidence_threshold(0.5)
            .with_margin_threshold(0.08)
            .with_entropy_threshold(1.6)
    }

    fn decide(probs: &[f64], config: &CalibrationConfig) -> ClassificationResult {
        let catalog = catalog();
        DecisionPolicy::new(config, &catalog)
            .decide(probs, &catalog)
            .unwrap()
    }

    #[test]
    fn test_entropy_bounds() {
        for n in 2..8 {
            let uniform = vec![1.0 / n as f64; n];
            assert!((entropy(&uniform) - (n as f64).ln()).abs() < 1e-12);
            let mut one_hot = vec![0.0; n];
            one_hot[n - 1] = 1.0;
            assert_eq!(entropy(&one_hot), 0.0);
        }
    }

    #[test]
    fn test_accepts_confident_prediction() {
        let result = decide(&[0.659, 0.242, 0.099], &config());
        assert_eq!(result.label, "A");
        assert!(!result.applied_unknown);
        assert_eq!(result.score, 65.9);
    }

    #[test]
    fn test_narrow_margin_rejects_with_top_score() {
        let result = decide(&[0.34, 0.33, 0.33], &config());
        assert_eq!(result.label, "Unknown");
        assert!(result.applied_unknown);
        assert_eq!(result.best_label, "A");
        assert_eq!(result.score, 34.0);
        let signals = result.diagnostics.unwrap().signals;
        assert!(signals.narrow_margin);
        assert!(signals.below_threshold);
        assert!(!signals.high_entropy);
    }

    #[test]
    fn test_each_clause_fires_alone() {
        // Below threshold only.
        let cfg = config().with_confidence_threshold(0.9);
        let signals = decide(&[0.8, 0.1, 0.1], &cfg).diagnostics.unwrap().signals;
        assert_eq!(
            signals,
            RejectionSignals {
                below_threshold: true,
                ..Default::default()
            }
        );

        // Narrow margin only.
        let cfg = config().with_confidence_threshold(0.4);
        let signals = decide(&[0.5, 0.45, 0.05], &cfg).diagnostics.unwrap().signals;
        assert_eq!(
            signals,
            RejectionSignals {
                narrow_margin: true,
                ..Default::default()
            }
        );

        // High entropy only.
        let cfg = config().with_entropy_threshold(0.5);
        let result = decide(&[0.8, 0.1, 0.1], &cfg);
        assert!(result.applied_unknown);
        assert_eq!(
            result.diagnostics.unwrap().signals,
            RejectionSignals {
                high_entropy: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_per_label_threshold_override() {
        let cfg = config().with_class_threshold("B", 0.95);
        let result = decide(&[0.1, 0.85, 0.05], &cfg);
        assert!(result.applied_unknown);
        assert_eq!(result.diagnostics.unwrap().threshold, 0.95);

        let result = decide(&[0.85, 0.1, 0.05], &cfg);
        assert!(!result.applied_unknown);
    }

    #[test]
    fn test_rejection_is_monotonic_in_best() {
        let cfg = config().with_confidence_threshold(0.6).with_entropy_threshold(10.0);
        let mut last_rejected = true;
        for step in 0..=40 {
            let best = 0.5 + step as f64 * 0.0125;
            let rest = (1.0 - best) / 2.0;
            let rejected = decide(&[best, rest, rest], &cfg).applied_unknown;
            if !last_rejected {
                assert!(!rejected, "accepted at a lower best but rejected at {best}");
            }
            if best < 0.6 {
                assert!(rejected);
            }
            last_rejected = rejected;
        }
        assert!(!last_rejected);
    }

    #[test]
    fn test_width_mismatch() {
        let catalog = catalog();
        let err = DecisionPolicy::new(&config(), &catalog)
            .decide(&[0.5, 0.5], &catalog)
            .unwrap_err();
        assert!(err.is_config_mismatch());
    }

    #[test]
    fn test_confidence_score_rounding() {
        assert_eq!(confidence_score(0.659001), 65.9);
        assert_eq!(confidence_score(0.12346), 12.35);
        assert_eq!(confidence_score(1.0), 100.0);
    }
}
