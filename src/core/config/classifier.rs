//! Configuration for the image classifier and its preprocessing.

use super::env::{ENV_INPUT_SIZE, parse_override, process_env};
use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use crate::core::constants::{
    DEFAULT_BRIGHTNESS_DELTA, DEFAULT_CONTRAST_FACTOR, DEFAULT_INPUT_SIZE,
    DEFAULT_SESSION_POOL_SIZE,
};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Resampling filter used when resizing to the model input size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbour.
    Nearest,
    /// Linear (bilinear) filter.
    Triangle,
    /// Cubic filter.
    CatmullRom,
    /// Gaussian filter.
    Gaussian,
    /// Lanczos with window 3.
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Test-time augmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    /// When false only the identity variant is evaluated.
    pub enabled: bool,
    /// Fraction used for the brightness up and down variants.
    pub brightness_delta: f32,
    /// Factor used for the contrast stretch variant.
    pub contrast_factor: f32,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            brightness_delta: DEFAULT_BRIGHTNESS_DELTA,
            contrast_factor: DEFAULT_CONTRAST_FACTOR,
        }
    }
}

impl AugmentationConfig {
    /// Identity-only configuration.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl ConfigValidator for AugmentationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_f64_range(self.brightness_delta as f64, 0.0, 1.0, "brightness_delta")?;
        self.validate_positive_f64(self.contrast_factor as f64, "contrast_factor")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Configuration for [`ImageClassifier`](crate::predictor::ImageClassifier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageClassifierConfig {
    /// Name reported in logs, errors and status.
    pub model_name: String,
    /// Side length S of the square `[1, S, S, 3]` model input.
    pub input_size: u32,
    /// Whether the model rescales pixels itself; if so values stay in `[0, 255]`.
    pub model_includes_rescaling: bool,
    /// Filter used for the cover resize.
    pub resize_filter: ResizeFilter,
    /// Test-time augmentation settings.
    pub augmentation: AugmentationConfig,
    /// Evaluate augmentation variants concurrently.
    pub parallel_variants: bool,
    /// Number of ONNX Runtime sessions kept for concurrent requests.
    pub session_pool_size: usize,
    /// ONNX Runtime session options.
    pub ort_session: Option<OrtSessionConfig>,
    /// Graph input name; discovered from the model when absent.
    pub input_name: Option<String>,
    /// Graph output name; the first model output when absent.
    pub output_name: Option<String>,
}

impl Default for ImageClassifierConfig {
    fn default() -> Self {
        Self {
            model_name: "image_classifier".to_string(),
            input_size: DEFAULT_INPUT_SIZE,
            model_includes_rescaling: false,
            resize_filter: ResizeFilter::default(),
            augmentation: AugmentationConfig::default(),
            parallel_variants: true,
            session_pool_size: DEFAULT_SESSION_POOL_SIZE,
            ort_session: None,
            input_name: None,
            output_name: None,
        }
    }
}

impl ImageClassifierConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the `INPUT_SIZE` environment override.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(process_env)
    }

    /// Applies overrides resolved through `lookup`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(size) = parse_override(&lookup, ENV_INPUT_SIZE)? {
            self.input_size = size;
        }
        Ok(self)
    }
}

impl ConfigValidator for ImageClassifierConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_image_dimensions(self.input_size, self.input_size)?;
        self.validate_positive_usize(self.session_pool_size, "session_pool_size")?;
        self.augmentation.validate()?;
        if let Some(ort) = &self.ort_session {
            ort.validate()?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
