//! Constructor helpers for [`ClassifierError`].
//!
//! These keep call sites short and make sure every error carries the same
//! shape of context regardless of where it was raised.

use super::{ClassifierError, ProcessingStage};

impl ClassifierError {
    /// Creates an image decode error.
    ///
    /// # Arguments
    ///
    /// * `message` - What went wrong while decoding.
    /// * `source` - The underlying decoder error, if any.
    pub fn image_decode(
        message: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ImageDecode {
            message: message.into(),
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates a model-not-ready error.
    pub fn model_not_ready(model_name: impl Into<String>) -> Self {
        Self::ModelNotReady {
            model_name: model_name.into(),
        }
    }

    /// Creates a configuration mismatch error.
    ///
    /// # Arguments
    ///
    /// * `what` - The quantity that disagreed (e.g. "model output width").
    /// * `expected` - The value implied by configuration.
    /// * `actual` - The value observed at runtime.
    pub fn config_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ConfigMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Creates an inference execution error.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Name of the model being run.
    /// * `operation` - The step that failed.
    /// * `context` - Additional context.
    /// * `error` - The underlying runtime error.
    pub fn inference_execution(
        model_name: impl Into<String>,
        operation: impl Into<String>,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InferenceExecution {
            model_name: model_name.into(),
            operation: operation.into(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Same as [`inference_execution`](Self::inference_execution) for already boxed errors.
    pub fn inference_execution_boxed(
        model_name: impl Into<String>,
        operation: impl Into<String>,
        context: impl Into<String>,
        error: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::InferenceExecution {
            model_name: model_name.into(),
            operation: operation.into(),
            context: context.into(),
            source: error,
        }
    }

    /// Creates a model loading error.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path of the model that failed to load.
    /// * `reason` - Why loading failed.
    /// * `suggestion` - Optional hint for fixing the problem.
    /// * `source` - The underlying error, if any.
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates a processing error for the given stage.
    pub fn processing_error(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a tensor operation error.
    pub fn tensor_operation(
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_error(ProcessingStage::TensorOperation, context, error)
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns true for [`ClassifierError::ImageDecode`].
    pub fn is_image_decode(&self) -> bool {
        matches!(self, Self::ImageDecode { .. })
    }

    /// Returns true for [`ClassifierError::ModelNotReady`].
    pub fn is_model_not_ready(&self) -> bool {
        matches!(self, Self::ModelNotReady { .. })
    }

    /// Returns true for [`ClassifierError::ConfigMismatch`].
    pub fn is_config_mismatch(&self) -> bool {
        matches!(self, Self::ConfigMismatch { .. })
    }

    /// Returns true for [`ClassifierError::Processing`] raised at `stage`.
    pub fn is_processing(&self, stage: ProcessingStage) -> bool {
        matches!(self, Self::Processing { kind, .. } if *kind == stage)
    }

    /// Returns true for [`ClassifierError::InferenceExecution`].
    pub fn is_inference_execution(&self) -> bool {
        matches!(self, Self::InferenceExecution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SimpleError;

    #[test]
    fn test_model_load_error_with_suggestion() {
        let error = ClassifierError::model_load_error(
            "models/classifier.onnx",
            "failed to create ONNX session",
            Some("verify the model file exists"),
            None::<SimpleError>,
        );
        let message = error.to_string();
        assert!(message.contains("models/classifier.onnx"));
        assert!(message.contains("suggested fix: verify the model file exists"));
    }

    #[test]
    fn test_inference_execution_predicates() {
        let error = ClassifierError::inference_execution(
            "classifier",
            "forward_pass",
            "input shape [1, 300, 300, 3]",
            SimpleError::new("bad rank"),
        );
        assert!(error.is_inference_execution());
        assert!(!error.is_config_mismatch());
        assert!(!error.is_image_decode());
        assert!(!error.is_model_not_ready());
    }

    #[test]
    fn test_tensor_operation_is_tagged() {
        let shape_error = ndarray::Array1::<f32>::zeros(3)
            .into_shape_with_order((2, 2))
            .unwrap_err();
        let error = ClassifierError::tensor_operation("reshape output 'probs'", shape_error);
        assert!(error.is_processing(ProcessingStage::TensorOperation));
        assert!(!error.is_processing(ProcessingStage::Ensemble));
        assert!(error.to_string().starts_with("tensor operation failed: reshape output"));
    }
}
