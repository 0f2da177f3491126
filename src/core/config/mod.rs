//! Configuration management for the classifier.
//!
//! This module provides configuration types, validation traits, and the
//! environment overlay used to tune a deployment without touching code.

pub mod calibration;
pub mod classifier;
pub mod env;
pub mod errors;
pub mod onnx;

pub use calibration::{CalibrationConfig, CalibrationOrder, EnsembleOrder};
pub use classifier::{AugmentationConfig, ImageClassifierConfig, ResizeFilter};
pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use onnx::*;
