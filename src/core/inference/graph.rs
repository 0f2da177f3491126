//! Named-tensor graph models executed with ONNX Runtime.
//!
//! Input and output names come from the session metadata at load time. A pool
//! of sessions serves concurrent requests round-robin; each session sits behind
//! its own mutex because `Session::run` needs exclusive access.

use super::ledger::{TensorDyn, TensorHandle};
use super::session::load_session;
use crate::core::config::OrtSessionConfig;
use crate::core::constants::COMMON_INPUT_NAMES;
use crate::core::errors::{ClassifierError, ClassifierResult, SimpleError};
use ndarray::IxDyn;
use ort::session::Session;
use ort::value::{TensorRef, ValueType};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Options for loading a [`GraphModel`].
#[derive(Debug, Clone, Default)]
pub struct GraphModelOptions {
    /// Name reported in logs and errors. Defaults to the file stem.
    pub model_name: Option<String>,
    /// Input tensor name; discovered from the model when absent.
    pub input_name: Option<String>,
    /// Output tensor name; the first model output when absent.
    pub output_name: Option<String>,
    /// Number of sessions in the pool (at least one).
    pub session_pool_size: usize,
    /// Side length S the declared `[1, S, S, 3]` input must accept, when known.
    pub input_size: Option<u32>,
    /// ONNX Runtime session options.
    pub ort_session: Option<OrtSessionConfig>,
}

/// An ONNX model with discovered input/output names and a session pool.
pub struct GraphModel {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    input_name: String,
    output_name: String,
    input_shape: Option<Vec<i64>>,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for GraphModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphModel")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_shape", &self.input_shape)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl GraphModel {
    /// Loads the model and builds the session pool.
    pub fn load(model_path: impl AsRef<Path>, options: &GraphModelOptions) -> ClassifierResult<Self> {
        let path = model_path.as_ref();
        let pool_size = options.session_pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            sessions.push(Mutex::new(load_session(path, options.ort_session.as_ref())?));
        }

        let (input_names, input_shapes, output_names) = match sessions.first() {
            Some(first) => {
                let session = first.lock().map_err(|_| {
                    ClassifierError::model_load_error(
                        path,
                        "session lock poisoned during introspection",
                        None,
                        None::<SimpleError>,
                    )
                })?;
                let inputs: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
                let shapes: Vec<Option<Vec<i64>>> = session
                    .inputs
                    .iter()
                    .map(|input| match &input.input_type {
                        ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
                        _ => None,
                    })
                    .collect();
                let outputs: Vec<String> =
                    session.outputs.iter().map(|o| o.name.clone()).collect();
                (inputs, shapes, outputs)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        let input_name = resolve_input_name(path, &input_names, options.input_name.as_deref())?;
        let input_shape = input_names
            .iter()
            .position(|name| *name == input_name)
            .and_then(|i| input_shapes.get(i).cloned().flatten());
        if let Some(shape) = &input_shape {
            check_input_layout(shape, options.input_size)?;
        }
        let output_name = resolve_output_name(path, &output_names, options.output_name.as_deref())?;

        let model_name = options
            .model_name
            .clone()
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "unknown_model".to_string());

        tracing::info!(
            model = %model_name,
            input = %input_name,
            output = %output_name,
            pool = pool_size,
            "loaded graph model from {}",
            path.display()
        );

        Ok(Self {
            sessions,
            next_idx: AtomicUsize::new(0),
            input_name,
            output_name,
            input_shape,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    /// Name of the input tensor fed on every run.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Name of the output tensor read on every run.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Declared shape of the first model input; dynamic dimensions are `-1`.
    pub fn input_shape(&self) -> Option<&[i64]> {
        self.input_shape.as_deref()
    }

    /// Returns the model path.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs one forward pass and copies the named output into an owned tensor.
    pub fn run(&self, input: &TensorHandle) -> ClassifierResult<TensorHandle<IxDyn>> {
        let input_shape = input.shape().to_vec();
        let contiguous = input.array().as_standard_layout();
        let input_tensor = TensorRef::from_array_view(contiguous.view()).map_err(|e| {
            ClassifierError::inference_execution(
                &self.model_name,
                "tensor_conversion",
                format!("failed to convert input tensor with shape {:?}", input_shape),
                e,
            )
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            ClassifierError::inference_execution(
                &self.model_name,
                "session_lock",
                format!("session {}/{}", idx, self.sessions.len()),
                SimpleError::new("session lock poisoned"),
            )
        })?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            ClassifierError::inference_execution(
                &self.model_name,
                "forward_pass",
                format!(
                    "input '{}' {:?} -> output '{}'",
                    self.input_name, input_shape, self.output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ClassifierError::inference_execution(
                    &self.model_name,
                    "output_extraction",
                    format!("failed to extract output '{}' as f32", self.output_name),
                    e,
                )
            })?;

        let array = output_to_array(&self.output_name, output_shape, output_data)?;
        Ok(TensorHandle::allocate(input.ledger(), array))
    }
}

/// Copies a raw output buffer into an owned tensor of the reported shape.
fn output_to_array(output_name: &str, shape: &[i64], data: &[f32]) -> ClassifierResult<TensorDyn> {
    let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    TensorDyn::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|e| {
        ClassifierError::tensor_operation(
            format!(
                "output '{}' reports shape {:?} but holds {} values",
                output_name,
                shape,
                data.len()
            ),
            e,
        )
    })
}

/// Checks a declared input shape against the NHWC `[1, S, S, 3]` layout.
///
/// Dynamic dimensions (`-1`) are accepted.
fn check_input_layout(shape: &[i64], input_size: Option<u32>) -> ClassifierResult<()> {
    let [_, height, width, channels] = shape else {
        return Err(ClassifierError::config_mismatch(
            "model input rank",
            4,
            shape.len(),
        ));
    };
    if *channels > 0 && *channels != 3 {
        return Err(ClassifierError::config_mismatch(
            "model input channels (NHWC layout expected)",
            3,
            *channels as usize,
        ));
    }
    if let Some(size) = input_size {
        for side in [*height, *width] {
            if side > 0 && side != i64::from(size) {
                return Err(ClassifierError::config_mismatch(
                    "model input side length",
                    size as usize,
                    side as usize,
                ));
            }
        }
    }
    Ok(())
}

fn resolve_input_name(
    path: &Path,
    available: &[String],
    requested: Option<&str>,
) -> ClassifierResult<String> {
    if let Some(name) = requested {
        return require_name(path, available, name, "input");
    }
    if available.len() > 1 {
        let common = COMMON_INPUT_NAMES
            .iter()
            .find(|candidate| available.iter().any(|n| n == *candidate));
        if let Some(common) = common {
            return Ok((*common).to_string());
        }
    }
    available.first().cloned().ok_or_else(|| {
        ClassifierError::model_load_error(path, "model declares no inputs", None, None::<SimpleError>)
    })
}

fn resolve_output_name(
    path: &Path,
    available: &[String],
    requested: Option<&str>,
) -> ClassifierResult<String> {
    if let Some(name) = requested {
        return require_name(path, available, name, "output");
    }
    available.first().cloned().ok_or_else(|| {
        ClassifierError::model_load_error(path, "model declares no outputs", None, None::<SimpleError>)
    })
}

fn require_name(
    path: &Path,
    available: &[String],
    requested: &str,
    kind: &str,
) -> ClassifierResult<String> {
    if available.iter().any(|n| n == requested) {
        Ok(requested.to_string())
    } else {
        Err(ClassifierError::model_load_error(
            path,
            format!("{} '{}' not found in model", kind, requested),
            Some(format!("available {}s: {:?}", kind, available).as_str()),
            None::<SimpleError>,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ProcessingStage;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_input_is_used() {
        let name = resolve_input_name(Path::new("m.onnx"), &names(&["serving_default_in"]), None);
        assert_eq!(name.unwrap(), "serving_default_in");
    }

    #[test]
    fn test_common_input_name_preferred() {
        let name = resolve_input_name(Path::new("m.onnx"), &names(&["mask", "images"]), None);
        assert_eq!(name.unwrap(), "images");
    }

    #[test]
    fn test_override_must_exist() {
        let available = names(&["input_1"]);
        assert_eq!(
            resolve_input_name(Path::new("m.onnx"), &available, Some("input_1")).unwrap(),
            "input_1"
        );
        let err = resolve_output_name(Path::new("m.onnx"), &available, Some("logits")).unwrap_err();
        assert!(err.to_string().contains("output 'logits' not found"));
    }

    #[test]
    fn test_no_outputs_is_error() {
        assert!(resolve_output_name(Path::new("m.onnx"), &[], None).is_err());
    }

    #[test]
    fn test_nhwc_layout_accepted() {
        assert!(check_input_layout(&[1, 300, 300, 3], Some(300)).is_ok());
        assert!(check_input_layout(&[-1, -1, -1, 3], Some(224)).is_ok());
        assert!(check_input_layout(&[1, 300, 300, 3], None).is_ok());
    }

    #[test]
    fn test_nchw_layout_rejected() {
        let err = check_input_layout(&[1, 3, 300, 300], Some(300)).unwrap_err();
        assert!(err.is_config_mismatch());
        assert!(err.to_string().contains("channels"));
    }

    #[test]
    fn test_input_side_and_rank_checked() {
        let err = check_input_layout(&[1, 224, 224, 3], Some(300)).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::ConfigMismatch {
                expected: 300,
                actual: 224,
                ..
            }
        ));
        assert!(check_input_layout(&[1, 1000], None).unwrap_err().is_config_mismatch());
    }

    #[test]
    fn test_output_reshape() {
        let array = output_to_array("probs", &[1, 3], &[0.2, 0.3, 0.5]).unwrap();
        assert_eq!(array.shape(), &[1, 3]);

        let err = output_to_array("probs", &[1, 4], &[0.2, 0.3, 0.5]).unwrap_err();
        assert!(err.is_processing(ProcessingStage::TensorOperation));
        assert!(err.to_string().contains("output 'probs'"));
    }

    #[test]
    fn test_missing_model_file() {
        let result = GraphModel::load("missing/classifier.onnx", &GraphModelOptions::default());
        assert!(result.is_err());
    }
}
