//! Model execution.
//!
//! This module holds the tracked tensor type used for every per-request
//! allocation, the two model shapes (callable forward pass and ONNX Runtime
//! graph) and the [`ClassifierModel`] enum that dispatches between them.

pub mod adapter;
pub mod callable;
pub mod graph;
pub mod ledger;
pub mod session;

pub use adapter::{ClassifierModel, ModelKind};
pub use callable::{CallableModel, ForwardError, ForwardModel, ForwardOutput};
pub use graph::{GraphModel, GraphModelOptions};
pub use ledger::{Tensor4D, TensorDyn, TensorHandle, TensorLedger};
pub use session::load_session;
