//! Processing stages of the classification pipeline.
//!
//! # Modules
//!
//! * `normalization` - Image bytes to the `[1, S, S, 3]` input tensor
//! * `augmentation` - Fixed test-time augmentation variants
//! * `probability` - Raw model output to probability distributions
//! * `calibration` - Per-class reweighting and sharpening
//! * `decision` - Top-2, entropy and the rejection rule
//! * `topk` - Deterministic top-k ranking

pub mod augmentation;
pub mod calibration;
pub mod decision;
pub mod normalization;
pub mod probability;
pub mod topk;

pub use augmentation::{Augmentation, AugmentationEnsembler};
pub use calibration::Calibrator;
pub use decision::{DecisionPolicy, confidence_score, entropy};
pub use normalization::{ImageNormalizer, decode_oriented};
pub use probability::{
    NormalizationBranch, ProbabilityNormalizer, ensemble_mean, is_distribution, softmax,
};
pub use topk::{Ranked, Topk};
