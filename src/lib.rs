//! # Calibrated Classifier
//!
//! An image classifier with calibrated open-set rejection. A fixed catalog of
//! class labels ends with an "unknown" sentinel; predictions that are not
//! confident enough are replaced by that sentinel instead of being forced onto
//! the closest class.
//!
//! ## Features
//!
//! - Image decoding with EXIF orientation and cover resize to a square input
//! - Test-time augmentation ensemble (flip, brightness, contrast)
//! - Either ONNX Runtime graphs or plain forward-pass closures as the model
//! - Automatic detection of logits vs. probabilities
//! - Per-class reweighting and sharpening
//! - Rejection on low confidence, narrow margin or high entropy
//! - Runtime replacement of the calibration without reloading the model
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, constants and inference integration
//! * [`domain`] - Class catalog and result types
//! * [`predictor`] - The [`ImageClassifier`](predictor::ImageClassifier) facade
//! * [`processors`] - The individual pipeline stages
//! * [`utils`] - File loading and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use calibrated_classifier::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = ClassCatalog::from_json_file("models/labels.json")?;
//! let calibration = CalibrationConfig::from_json_file("models/calibration.json")?;
//!
//! let classifier = ImageClassifier::builder()
//!     .catalog(catalog)
//!     .calibration(calibration)
//!     .with_env_overrides()
//!     .build()?;
//! classifier.load_onnx_model("models/classifier.onnx")?;
//!
//! let result = classifier.classify_file("photo.jpg", ClassifyOptions::default())?;
//! println!("{} ({:.2})", result.label, result.score);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod predictor;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use calibrated_classifier::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::{
        AugmentationConfig, CalibrationConfig, CalibrationOrder, EnsembleOrder,
        ImageClassifierConfig, OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig,
        ResizeFilter,
    };
    pub use crate::core::errors::{ClassifierError, ClassifierResult};
    pub use crate::core::inference::{
        CallableModel, ClassifierModel, ForwardError, ForwardOutput, GraphModel, ModelKind,
    };
    pub use crate::domain::{
        ClassCatalog, ClassificationResult, ClassifierStatus, ClassifyOptions,
    };
    pub use crate::predictor::{ImageClassifier, ImageClassifierBuilder};
    pub use crate::utils::init_tracing;
}
