//! Error types for the classification pipeline.
//!
//! Every failure that can escape [`classify`](crate::predictor::ImageClassifier::classify)
//! is a variant of [`ClassifierError`]. A failed classification is always an `Err`,
//! which keeps it distinct from a successful classification that was rejected as
//! unknown (an `Ok` result with `applied_unknown == true`).
//!
//! # Usage
//!
//! ```rust
//! use calibrated_classifier::core::errors::ClassifierError;
//!
//! let error = ClassifierError::config_mismatch("model output width", 3, 2);
//! assert!(error.is_config_mismatch());
//!
//! let config_error = ClassifierError::config_error("catalog must have at least 2 labels");
//! assert!(config_error.to_string().contains("catalog"));
//! ```

pub mod constructors;

use thiserror::Error;

/// Convenient result alias for classification operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Stage of the pipeline a processing error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Reshaping a raw model output into a tensor.
    TensorOperation,
    /// Combining the per-variant probability vectors.
    Ensemble,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Ensemble => write!(f, "ensemble averaging"),
        }
    }
}

/// Errors produced by the classifier.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The input bytes are not a decodable image.
    #[error("image decode failed: {message}")]
    ImageDecode {
        /// What went wrong while decoding.
        message: String,
        /// The underlying decoder error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Classification was requested before a model was installed.
    #[error("model is not ready: {model_name}")]
    ModelNotReady {
        /// Name the classifier was configured with.
        model_name: String,
    },

    /// Model output width disagrees with the class catalog.
    #[error("configuration mismatch in {what}: expected {expected}, got {actual}")]
    ConfigMismatch {
        /// The quantity that disagreed.
        what: String,
        /// The value implied by configuration.
        expected: usize,
        /// The value observed at runtime.
        actual: usize,
    },

    /// The model invocation itself failed.
    #[error("inference failed in model '{model_name}' ({operation}): {context}")]
    InferenceExecution {
        /// Name of the model being run.
        model_name: String,
        /// The step that failed (e.g. "forward_pass", "output_extraction").
        operation: String,
        /// Additional context.
        context: String,
        /// The underlying runtime error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A model could not be loaded.
    #[error("failed to load model '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path of the model that failed to load.
        model_path: String,
        /// Why loading failed.
        reason: String,
        /// Optional hint, already formatted.
        suggestion: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A processing step failed.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage where the error occurred.
        kind: ProcessingStage,
        /// Additional context.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A configuration value is invalid.
    #[error("configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A caller-supplied argument is invalid.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json")]
    Json(#[from] serde_json::Error),
}

impl From<crate::core::config::ConfigError> for ClassifierError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::Config {
            message: error.to_string(),
        }
    }
}

/// Minimal error carrying only a message, used where no richer source exists.
#[derive(Debug, Clone)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SimpleError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_processing_stage_display() {
        assert_eq!(
            ProcessingStage::TensorOperation.to_string(),
            "tensor operation"
        );
        assert_eq!(ProcessingStage::Ensemble.to_string(), "ensemble averaging");
    }

    #[test]
    fn test_image_decode_keeps_source() {
        let error = ClassifierError::image_decode(
            "corrupt header",
            Some(SimpleError::new("unexpected end of file")),
        );
        assert!(error.is_image_decode());
        assert_eq!(
            error.source().map(|s| s.to_string()),
            Some("unexpected end of file".to_string())
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let error: ClassifierError = crate::core::config::ConfigError::InvalidConfig {
            message: "gamma must be finite".to_string(),
        }
        .into();
        assert!(matches!(error, ClassifierError::Config { .. }));
        assert!(error.to_string().contains("gamma must be finite"));
    }

    #[test]
    fn test_config_mismatch_message() {
        let error = ClassifierError::config_mismatch("model output width", 3, 2);
        assert_eq!(
            error.to_string(),
            "configuration mismatch in model output width: expected 3, got 2"
        );
    }
}
