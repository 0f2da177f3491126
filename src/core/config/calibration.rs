//! Calibration and decision configuration.
//!
//! A [`CalibrationConfig`] is built once (from defaults, JSON, or the
//! environment overlay) and never mutated afterwards. Replacing it at runtime
//! means swapping in a whole new value.

use super::env::{
    ENV_ENTROPY_THRESHOLD, ENV_MARGIN_THRESHOLD, ENV_SHARPEN_GAMMA, ENV_SOFTMAX_TEMP,
    ENV_UNKNOWN_THRESHOLD, parse_override, process_env,
};
use super::errors::{ConfigError, ConfigValidator};
use crate::core::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_ENTROPY_THRESHOLD, DEFAULT_MARGIN_THRESHOLD,
    DEFAULT_SHARPEN_GAMMA, DEFAULT_SOFTMAX_TEMPERATURE,
};
use crate::core::errors::ClassifierResult;
use crate::domain::ClassCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Order of the two calibration transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationOrder {
    /// Per-class reweighting first, then sharpening.
    #[default]
    ReweightThenSharpen,
    /// Sharpening first, then per-class reweighting.
    SharpenThenReweight,
}

/// Where calibration sits relative to ensemble averaging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleOrder {
    /// Average the variant probabilities, then calibrate the mean once.
    #[default]
    AverageThenCalibrate,
    /// Calibrate every variant, then average the calibrated vectors.
    CalibrateThenAverage,
}

/// Per-class corrections and the thresholds of the rejection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Multiplicative weight per label. Missing labels weigh 1.0.
    pub class_weights: BTreeMap<String, f64>,
    /// Confidence threshold overrides per label.
    pub class_thresholds: BTreeMap<String, f64>,
    /// Global confidence threshold.
    pub confidence_threshold: f64,
    /// Minimum gap between the top-1 and top-2 probabilities.
    pub margin_threshold: f64,
    /// Maximum natural-log entropy of the calibrated distribution.
    pub entropy_threshold: f64,
    /// Sharpening exponent. 1.0 is the identity; values <= 0 or non-finite are ignored.
    pub sharpen_gamma: f64,
    /// Temperature dividing logits before softmax.
    pub softmax_temperature: f64,
    /// Order of reweighting and sharpening.
    pub calibration_order: CalibrationOrder,
    /// Whether variants are averaged before or after calibration.
    pub ensemble_order: EnsembleOrder,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            class_weights: BTreeMap::new(),
            class_thresholds: BTreeMap::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            margin_threshold: DEFAULT_MARGIN_THRESHOLD,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            sharpen_gamma: DEFAULT_SHARPEN_GAMMA,
            softmax_temperature: DEFAULT_SOFTMAX_TEMPERATURE,
            calibration_order: CalibrationOrder::default(),
            ensemble_order: EnsembleOrder::default(),
        }
    }
}

impl CalibrationConfig {
    /// Creates a configuration with default thresholds and no per-class entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> ClassifierResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ClassifierResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Applies the process environment overlay.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(process_env)
    }

    /// Applies overrides resolved through `lookup`.
    ///
    /// Recognized keys: `UNKNOWN_THRESHOLD`, `MARGIN_THRESHOLD`,
    /// `ENTROPY_THRESHOLD`, `SOFTMAX_TEMP`, `SHARPEN_GAMMA`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, ENV_UNKNOWN_THRESHOLD)? {
            self.confidence_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_MARGIN_THRESHOLD)? {
            self.margin_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_ENTROPY_THRESHOLD)? {
            self.entropy_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_SOFTMAX_TEMP)? {
            self.softmax_temperature = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_SHARPEN_GAMMA)? {
            self.sharpen_gamma = v;
        }
        Ok(self)
    }

    /// Sets the weight for one label.
    pub fn with_class_weight(mut self, label: impl Into<String>, weight: f64) -> Self {
        self.class_weights.insert(label.into(), weight);
        self
    }

    /// Sets the confidence threshold override for one label.
    pub fn with_class_threshold(mut self, label: impl Into<String>, threshold: f64) -> Self {
        self.class_thresholds.insert(label.into(), threshold);
        self
    }

    /// Sets the global confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Sets the margin threshold.
    pub fn with_margin_threshold(mut self, margin: f64) -> Self {
        self.margin_threshold = margin;
        self
    }

    /// Sets the entropy threshold.
    pub fn with_entropy_threshold(mut self, entropy: f64) -> Self {
        self.entropy_threshold = entropy;
        self
    }

    /// Sets the sharpening exponent.
    pub fn with_sharpen_gamma(mut self, gamma: f64) -> Self {
        self.sharpen_gamma = gamma;
        self
    }

    /// Sets the softmax temperature.
    pub fn with_softmax_temperature(mut self, temperature: f64) -> Self {
        self.softmax_temperature = temperature;
        self
    }

    /// Sets the calibration order.
    pub fn with_calibration_order(mut self, order: CalibrationOrder) -> Self {
        self.calibration_order = order;
        self
    }

    /// Sets the ensemble order.
    pub fn with_ensemble_order(mut self, order: EnsembleOrder) -> Self {
        self.ensemble_order = order;
        self
    }

    /// Confidence threshold in effect for `label`.
    pub fn threshold_for(&self, label: &str) -> f64 {
        self.class_thresholds
            .get(label)
            .copied()
            .unwrap_or(self.confidence_threshold)
    }

    /// Weights aligned with the catalog order; labels without an entry get 1.0.
    pub fn resolve_weights(&self, catalog: &ClassCatalog) -> Vec<f64> {
        catalog
            .labels()
            .iter()
            .map(|label| self.class_weights.get(label).copied().unwrap_or(1.0))
            .collect()
    }

    /// Validates the configuration and checks every mapped label exists in `catalog`.
    pub fn validate_against(&self, catalog: &ClassCatalog) -> Result<(), ConfigError> {
        self.validate()?;
        for (field, map) in [
            ("class_weights", &self.class_weights),
            ("class_thresholds", &self.class_thresholds),
        ] {
            if let Some(label) = map.keys().find(|label| catalog.index_of(label).is_none()) {
                return Err(ConfigError::UnknownLabel {
                    label: label.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl ConfigValidator for CalibrationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_probability(self.confidence_threshold, "confidence_threshold")?;
        self.validate_probability(self.margin_threshold, "margin_threshold")?;
        self.validate_f64_range(self.entropy_threshold, 0.0, f64::MAX, "entropy_threshold")?;
        self.validate_positive_f64(self.softmax_temperature, "softmax_temperature")?;

        for (label, weight) in &self.class_weights {
            self.validate_positive_f64(*weight, &format!("class_weights[{}]", label))?;
        }
        for (label, threshold) in &self.class_thresholds {
            self.validate_probability(*threshold, &format!("class_thresholds[{}]", label))?;
        }

        // sharpen_gamma is not checked: the calibrator ignores unusable values.
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn catalog() -> ClassCatalog {
        ClassCatalog::new(vec!["A".into(), "B".into(), "Unknown".into()]).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = CalibrationConfig::default();
        assert_eq!(config.confidence_threshold, 0.70);
        assert_eq!(config.margin_threshold, 0.08);
        assert_eq!(config.entropy_threshold, 1.60);
        assert_eq!(config.sharpen_gamma, 1.0);
        assert_eq!(config.softmax_temperature, 1.0);
        assert_eq!(
            config.calibration_order,
            CalibrationOrder::ReweightThenSharpen
        );
        assert_eq!(config.ensemble_order, EnsembleOrder::AverageThenCalibrate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_override_and_weights() {
        let config = CalibrationConfig::new()
            .with_confidence_threshold(0.6)
            .with_class_threshold("B", 0.9)
            .with_class_weight("A", 0.5);

        assert_eq!(config.threshold_for("A"), 0.6);
        assert_eq!(config.threshold_for("B"), 0.9);
        assert_eq!(config.resolve_weights(&catalog()), vec![0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_unknown_label_rejected() {
        let config = CalibrationConfig::new().with_class_weight("Gamma", 1.2);
        let err = config.validate_against(&catalog()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLabel { ref field, .. } if field == "class_weights"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(CalibrationConfig::new().with_confidence_threshold(1.5).validate().is_err());
        assert!(CalibrationConfig::new().with_margin_threshold(-0.1).validate().is_err());
        assert!(CalibrationConfig::new().with_entropy_threshold(f64::NAN).validate().is_err());
        assert!(CalibrationConfig::new().with_softmax_temperature(0.0).validate().is_err());
        assert!(CalibrationConfig::new().with_class_weight("A", -1.0).validate().is_err());
        // An unusable gamma is tolerated and ignored later.
        assert!(CalibrationConfig::new().with_sharpen_gamma(-2.0).validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{
            "class_weights": {"A": 1.3},
            "margin_threshold": 0.1,
            "calibration_order": "sharpen_then_reweight"
        }"#;
        let config = CalibrationConfig::from_json_str(json).unwrap();
        assert_eq!(config.class_weights.get("A"), Some(&1.3));
        assert_eq!(config.margin_threshold, 0.1);
        assert_eq!(config.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(
            config.calibration_order,
            CalibrationOrder::SharpenThenReweight
        );
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sharpen_gamma": 1.5, "class_thresholds": {{"B": 0.8}}}}"#).unwrap();
        let config = CalibrationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.sharpen_gamma, 1.5);
        assert_eq!(config.threshold_for("B"), 0.8);
        assert!(config.validate_against(&catalog()).is_ok());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let lookup = |key: &str| match key {
            "UNKNOWN_THRESHOLD" => Some("0.55".to_string()),
            "SOFTMAX_TEMP" => Some("1.5".to_string()),
            _ => None,
        };
        let config = CalibrationConfig::new().with_overrides_from(lookup).unwrap();
        assert_eq!(config.confidence_threshold, 0.55);
        assert_eq!(config.softmax_temperature, 1.5);
        assert_eq!(config.margin_threshold, DEFAULT_MARGIN_THRESHOLD);
    }

    #[test]
    fn test_unparsable_override() {
        let lookup = |key: &str| (key == "MARGIN_THRESHOLD").then(|| "wide".to_string());
        assert!(CalibrationConfig::new().with_overrides_from(lookup).is_err());
    }
}
