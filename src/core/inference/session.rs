//! Helpers for working directly with ONNX Runtime sessions.

use crate::core::config::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
use crate::core::errors::ClassifierError;
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::{Session, builder::SessionBuilder};
use std::path::Path;

/// Creates a session for `model_path`, applying `ort_config` when given.
pub fn load_session(
    model_path: impl AsRef<Path>,
    ort_config: Option<&OrtSessionConfig>,
) -> Result<Session, ClassifierError> {
    let path = model_path.as_ref();
    let builder = Session::builder()?;
    let builder = match ort_config {
        Some(cfg) => apply_ort_config(builder, cfg)?,
        // Keep ORT quiet unless configured otherwise.
        None => builder.with_log_level(LogLevel::Error)?,
    };
    builder.commit_from_file(path).map_err(|e| {
        ClassifierError::model_load_error(
            path,
            "failed to create ONNX session",
            Some("check the model file and execution provider configuration"),
            Some(e),
        )
    })
}

/// Applies session options to a builder.
pub fn apply_ort_config(
    mut builder: SessionBuilder,
    cfg: &OrtSessionConfig,
) -> Result<SessionBuilder, ort::Error> {
    builder = builder.with_log_level(LogLevel::Error)?;
    if let Some(intra) = cfg.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = cfg.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }
    if let Some(par) = cfg.parallel_execution {
        builder = builder.with_parallel_execution(par)?;
    }
    if let Some(level) = cfg.optimization_level {
        use ort::session::builder::GraphOptimizationLevel as GOL;
        let mapped = match level {
            OrtGraphOptimizationLevel::DisableAll => GOL::Disable,
            OrtGraphOptimizationLevel::Level1 => GOL::Level1,
            OrtGraphOptimizationLevel::Level2 => GOL::Level2,
            OrtGraphOptimizationLevel::Level3 => GOL::Level3,
        };
        builder = builder.with_optimization_level(mapped)?;
    }
    let providers = build_execution_providers(&cfg.get_execution_providers())?;
    if !providers.is_empty() {
        builder = builder.with_execution_providers(providers)?;
    }
    Ok(builder)
}

fn build_execution_providers(
    eps: &[OrtExecutionProvider],
) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
    let mut providers = Vec::with_capacity(eps.len());
    for ep in eps {
        match ep {
            OrtExecutionProvider::CPU => {
                providers.push(ort::execution_providers::CPUExecutionProvider::default().build());
            }
            #[cfg(feature = "cuda")]
            OrtExecutionProvider::CUDA { device_id } => {
                let mut cuda_provider = ort::execution_providers::CUDAExecutionProvider::default();
                if let Some(id) = device_id {
                    cuda_provider = cuda_provider.with_device_id(*id);
                }
                providers.push(cuda_provider.build());
            }
            #[cfg(not(feature = "cuda"))]
            OrtExecutionProvider::CUDA { .. } => {
                return Err(ort::Error::new(
                    "CUDA execution provider requested but cuda feature is not enabled",
                ));
            }
        }
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_load_error() {
        let err = load_session("does/not/exist.onnx", None).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::ModelLoad { .. } | ClassifierError::Session(_)
        ));
    }

    #[test]
    fn test_unset_providers_default_to_cpu() {
        let config = OrtSessionConfig::new();
        assert_eq!(config.get_execution_providers(), vec![OrtExecutionProvider::CPU]);
        let providers = build_execution_providers(&config.get_execution_providers()).unwrap();
        assert_eq!(providers.len(), 1);
        assert!(apply_ort_config(Session::builder().unwrap(), &config).is_ok());
    }

    #[test]
    fn test_cpu_provider_builds() {
        let providers = build_execution_providers(&[OrtExecutionProvider::CPU]).unwrap();
        assert_eq!(providers.len(), 1);
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_cuda_without_feature_errors() {
        let result = build_execution_providers(&[OrtExecutionProvider::CUDA { device_id: None }]);
        assert!(result.is_err());
    }
}
