//! Callable forward-pass models.
//!
//! Anything that maps an input tensor to one or more output tensors can serve
//! as a model: a hand-written network, a wrapper around another runtime, or a
//! closure in tests.

use super::ledger::{TensorDyn, TensorHandle};
use crate::core::errors::{ClassifierError, ClassifierResult, SimpleError};
use ndarray::{Array1, ArrayView4, Axis, IxDyn};

/// Error type returned by a forward pass.
pub type ForwardError = Box<dyn std::error::Error + Send + Sync>;

/// Value returned by a forward pass.
#[derive(Debug, Clone)]
pub enum ForwardOutput {
    /// A single output tensor.
    Single(TensorDyn),
    /// Several output tensors; the first one holds the class scores.
    Many(Vec<TensorDyn>),
}

impl ForwardOutput {
    /// Wraps a flat score vector as a `[1, N]` tensor.
    pub fn scores(values: Vec<f32>) -> Self {
        Self::Single(Array1::from(values).insert_axis(Axis(0)).into_dyn())
    }
}

impl From<Vec<f32>> for ForwardOutput {
    fn from(values: Vec<f32>) -> Self {
        Self::scores(values)
    }
}

impl From<TensorDyn> for ForwardOutput {
    fn from(array: TensorDyn) -> Self {
        Self::Single(array)
    }
}

/// A model invoked as a direct forward pass.
pub trait ForwardModel: Send + Sync {
    /// Runs the model on a `[1, S, S, 3]` input.
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<ForwardOutput, ForwardError>;
}

impl<F> ForwardModel for F
where
    F: for<'a> Fn(ArrayView4<'a, f32>) -> Result<ForwardOutput, ForwardError> + Send + Sync,
{
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<ForwardOutput, ForwardError> {
        self(input)
    }
}

/// A named [`ForwardModel`].
pub struct CallableModel {
    name: String,
    model: Box<dyn ForwardModel>,
}

impl std::fmt::Debug for CallableModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableModel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CallableModel {
    /// Wraps a forward model under `name`.
    pub fn new(name: impl Into<String>, model: impl ForwardModel + 'static) -> Self {
        Self {
            name: name.into(),
            model: Box::new(model),
        }
    }

    /// Wraps a closure under `name`.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(ArrayView4<'a, f32>) -> Result<ForwardOutput, ForwardError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, f)
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        &self.name
    }

    /// Runs the forward pass and returns the first output tensor.
    ///
    /// Every returned tensor is registered with the input's ledger; the ones
    /// that are not used are released before this returns.
    pub fn run(&self, input: &TensorHandle) -> ClassifierResult<TensorHandle<IxDyn>> {
        let output = self.model.forward(input.view()).map_err(|e| {
            ClassifierError::inference_execution_boxed(
                &self.name,
                "forward_pass",
                format!("input shape {:?}", input.shape()),
                e,
            )
        })?;

        let tensors = match output {
            ForwardOutput::Single(t) => vec![t],
            ForwardOutput::Many(ts) => ts,
        };
        let handles: Vec<TensorHandle<IxDyn>> = tensors
            .into_iter()
            .map(|t| TensorHandle::allocate(input.ledger(), t))
            .collect();

        handles.into_iter().next().ok_or_else(|| {
            ClassifierError::inference_execution(
                &self.name,
                "output_extraction",
                "forward pass returned no tensors",
                SimpleError::new("empty output list"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inference::{Tensor4D, TensorLedger};

    #[test]
    fn test_first_of_many_is_used() {
        let model = CallableModel::from_fn("multi", |_x| {
            Ok(ForwardOutput::Many(vec![
                TensorDyn::from_elem(IxDyn(&[1, 3]), 0.5),
                TensorDyn::from_elem(IxDyn(&[1, 7]), 0.0),
            ]))
        });
        let ledger = TensorLedger::new();
        let input = TensorHandle::allocate(&ledger, Tensor4D::zeros((1, 2, 2, 3)));
        let output = model.run(&input).unwrap();
        assert_eq!(output.shape(), &[1, 3]);
        assert_eq!(ledger.live(), 2);
        drop(output);
        drop(input);
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.total_allocated(), 3);
    }

    #[test]
    fn test_empty_output_list_is_error() {
        let model = CallableModel::from_fn("empty", |_x| {
            Ok(ForwardOutput::Many(Vec::new()))
        });
        let ledger = TensorLedger::new();
        let input = TensorHandle::allocate(&ledger, Tensor4D::zeros((1, 1, 1, 3)));
        let err = model.run(&input).unwrap_err();
        assert!(err.is_inference_execution());
    }

    #[test]
    fn test_forward_error_is_wrapped() {
        let model = CallableModel::from_fn("broken", |_x| {
            Err(ForwardError::from("bad rank"))
        });
        let ledger = TensorLedger::new();
        let input = TensorHandle::allocate(&ledger, Tensor4D::zeros((1, 1, 1, 3)));
        let err = model.run(&input).unwrap_err();
        assert!(err.is_inference_execution());
        assert!(err.to_string().contains("broken"));
    }
}
