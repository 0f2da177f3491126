//! Predictor facade.
//!
//! [`ImageClassifier`] owns the model, the class catalog and the active
//! calibration, and runs the full pipeline for one image per call.

/// Calibrated open-set image classifier and its builder
pub mod image_classifier;

pub use image_classifier::{ImageClassifier, ImageClassifierBuilder};
