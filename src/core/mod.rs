//! The core module of the classifier.
//!
//! This module contains the fundamental components the pipeline is built on:
//! - Configuration management and environment overrides
//! - Constants used throughout the pipeline
//! - Error handling
//! - Inference engine integration and tensor accounting

pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;

pub use config::{
    AugmentationConfig, CalibrationConfig, CalibrationOrder, ConfigError, ConfigValidator,
    ConfigValidatorExt, EnsembleOrder, ImageClassifierConfig, ResizeFilter,
};
pub use constants::*;
pub use errors::{ClassifierError, ClassifierResult, ProcessingStage};
pub use inference::{
    CallableModel, ClassifierModel, ForwardOutput, GraphModel, ModelKind, TensorHandle,
    TensorLedger, load_session,
};
