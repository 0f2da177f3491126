//! Dispatch over the two supported model shapes.

use super::callable::CallableModel;
use super::graph::GraphModel;
use super::ledger::TensorHandle;
use crate::core::errors::{ClassifierError, ClassifierResult};
use serde::Serialize;

/// Which runtime shape a model has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Direct forward pass.
    Callable,
    /// Named-input/named-output graph execution.
    Graph,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Callable => write!(f, "callable"),
            ModelKind::Graph => write!(f, "graph"),
        }
    }
}

/// A loaded model, tagged by shape once at load time.
#[derive(Debug)]
pub enum ClassifierModel {
    /// A callable forward-pass model.
    Callable(CallableModel),
    /// An ONNX Runtime graph model.
    Graph(GraphModel),
}

impl ClassifierModel {
    /// Returns the model shape.
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Callable(_) => ModelKind::Callable,
            Self::Graph(_) => ModelKind::Graph,
        }
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self {
            Self::Callable(m) => m.model_name(),
            Self::Graph(m) => m.model_name(),
        }
    }

    /// Runs the model on `input` and returns its raw output as a flat vector.
    ///
    /// The output must hold exactly `expected_width` values; anything else is a
    /// [`ClassifierError::ConfigMismatch`]. Output tensors are released before
    /// this returns, on both paths.
    pub fn infer(&self, input: &TensorHandle, expected_width: usize) -> ClassifierResult<Vec<f32>> {
        let output = match self {
            Self::Callable(m) => m.run(input)?,
            Self::Graph(m) => m.run(input)?,
        };

        let width = output.len();
        if width != expected_width {
            tracing::error!(
                model = %self.model_name(),
                shape = ?output.shape(),
                "model output width {} does not match {} catalog labels",
                width,
                expected_width
            );
            return Err(ClassifierError::config_mismatch(
                "model output width",
                expected_width,
                width,
            ));
        }

        Ok(output.array().iter().copied().collect())
    }
}

impl From<CallableModel> for ClassifierModel {
    fn from(model: CallableModel) -> Self {
        Self::Callable(model)
    }
}

impl From<GraphModel> for ClassifierModel {
    fn from(model: GraphModel) -> Self {
        Self::Graph(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inference::{ForwardOutput, Tensor4D, TensorLedger};

    fn fixed(values: Vec<f32>) -> ClassifierModel {
        CallableModel::from_fn("fixed", move |_x| Ok(ForwardOutput::scores(values.clone()))).into()
    }

    #[test]
    fn test_infer_returns_flat_vector() {
        let model = fixed(vec![2.0, 1.0, 0.1]);
        assert_eq!(model.kind(), ModelKind::Callable);
        let ledger = TensorLedger::new();
        let input = TensorHandle::allocate(&ledger, Tensor4D::zeros((1, 4, 4, 3)));
        let raw = model.infer(&input, 3).unwrap();
        assert_eq!(raw, vec![2.0, 1.0, 0.1]);
        drop(input);
        assert_eq!(ledger.live(), 0);
    }

    #[test]
    fn test_width_mismatch_releases_output() {
        let model = fixed(vec![0.6, 0.4]);
        let ledger = TensorLedger::new();
        let input = TensorHandle::allocate(&ledger, Tensor4D::zeros((1, 4, 4, 3)));
        let err = model.infer(&input, 3).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::ConfigMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert_eq!(ledger.live(), 1);
        drop(input);
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.total_allocated(), 2);
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Graph.to_string(), "graph");
        assert_eq!(ModelKind::Callable.to_string(), "callable");
    }
}
