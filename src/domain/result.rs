//! Classification results, diagnostics and status reports.

use crate::core::inference::ModelKind;
use crate::processors::NormalizationBranch;
use serde::{Deserialize, Serialize};

/// Per-request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyOptions {
    /// Attach [`DecisionDiagnostics`] to the result. Never changes the decision.
    pub debug: bool,
}

impl ClassifyOptions {
    /// Options with diagnostics enabled.
    pub fn debug() -> Self {
        Self { debug: true }
    }
}

/// Which clauses of the rejection rule fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionSignals {
    /// Best probability is under the effective threshold.
    pub below_threshold: bool,
    /// Top-1 minus top-2 is under the margin threshold.
    pub narrow_margin: bool,
    /// Entropy is over the entropy threshold.
    pub high_entropy: bool,
}

impl RejectionSignals {
    /// True if any clause fired.
    pub fn any(&self) -> bool {
        self.below_threshold || self.narrow_margin || self.high_entropy
    }
}

/// Signals behind a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionDiagnostics {
    /// Final calibrated distribution in catalog order.
    pub probabilities: Vec<f64>,
    /// Probability of the top class.
    pub best_probability: f64,
    /// Index of the runner-up class.
    pub second_index: usize,
    /// Probability of the runner-up class.
    pub second_probability: f64,
    /// `best_probability - second_probability`.
    pub margin: f64,
    /// Shannon entropy in nats.
    pub entropy: f64,
    /// Effective confidence threshold for the top class.
    pub threshold: f64,
    /// Clause-by-clause rejection outcome.
    pub signals: RejectionSignals,
    /// Normalization branch taken for each augmentation variant, in variant order.
    pub variant_branches: Vec<NormalizationBranch>,
}

/// Outcome of a successful classification.
///
/// A rejected prediction is still a success: `label` is the unknown sentinel
/// and `applied_unknown` is set. Failures are `Err` values instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Reported label: the top class, or the unknown sentinel when rejected.
    pub label: String,
    /// Top class probability x 100, two decimals, whether or not rejected.
    pub score: f64,
    /// Whether the rejection rule fired.
    pub applied_unknown: bool,
    /// Index of the top class.
    pub best_index: usize,
    /// Label of the top class, even when rejected.
    pub best_label: String,
    /// Present when requested through [`ClassifyOptions::debug`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DecisionDiagnostics>,
}

/// Readiness and active settings of a classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStatus {
    pub model_ready: bool,
    pub model_kind: Option<ModelKind>,
    pub model_name: String,
    pub label_count: usize,
    pub input_size: u32,
    pub tta_enabled: bool,
    pub confidence_threshold: f64,
    pub margin_threshold: f64,
    pub entropy_threshold: f64,
    pub sharpen_gamma: f64,
    pub softmax_temperature: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ClassificationResult {
            label: "Unknown".to_string(),
            score: 34.0,
            applied_unknown: true,
            best_index: 0,
            best_label: "A".to_string(),
            diagnostics: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["appliedUnknown"], true);
        assert_eq!(json["bestLabel"], "A");
        assert_eq!(json["score"], 34.0);
        assert!(json.get("diagnostics").is_none());
    }

    #[test]
    fn test_rejection_signals_any() {
        assert!(!RejectionSignals::default().any());
        let signals = RejectionSignals {
            high_entropy: true,
            ..Default::default()
        };
        assert!(signals.any());
    }
}
