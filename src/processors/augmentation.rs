//! Test-time augmentation.
//!
//! The variant set is fixed: identity, horizontal mirror, brightness up,
//! brightness down, contrast stretch. Every call evaluates the same variants
//! and returns their results in that order, so averaging is reproducible even
//! when the variants run concurrently.

use crate::core::config::AugmentationConfig;
use crate::core::errors::ClassifierResult;
use crate::core::inference::{Tensor4D, TensorHandle};
use rayon::prelude::*;
use serde::Serialize;

/// One deterministic input transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Augmentation {
    Identity,
    HorizontalFlip,
    BrightnessUp,
    BrightnessDown,
    ContrastStretch,
}

impl Augmentation {
    /// Full variant set in evaluation order.
    pub const ALL: [Augmentation; 5] = [
        Augmentation::Identity,
        Augmentation::HorizontalFlip,
        Augmentation::BrightnessUp,
        Augmentation::BrightnessDown,
        Augmentation::ContrastStretch,
    ];

    /// Applies the transformation to an NHWC tensor whose values lie in `[0, max_value]`.
    ///
    /// Returns `None` for the identity, which needs no new tensor.
    pub fn apply(
        &self,
        input: &Tensor4D,
        config: &AugmentationConfig,
        max_value: f32,
    ) -> Option<Tensor4D> {
        match self {
            Augmentation::Identity => None,
            Augmentation::HorizontalFlip => {
                let width = input.shape()[2];
                Some(Tensor4D::from_shape_fn(input.raw_dim(), |(n, y, x, c)| {
                    input[[n, y, width - 1 - x, c]]
                }))
            }
            Augmentation::BrightnessUp => Some(scale(input, 1.0 + config.brightness_delta, max_value)),
            Augmentation::BrightnessDown => {
                Some(scale(input, 1.0 - config.brightness_delta, max_value))
            }
            Augmentation::ContrastStretch => {
                let mean = input.mean().unwrap_or(0.0);
                let factor = config.contrast_factor;
                Some(input.mapv(|v| (mean + (v - mean) * factor).clamp(0.0, max_value)))
            }
        }
    }
}

fn scale(input: &Tensor4D, factor: f32, max_value: f32) -> Tensor4D {
    input.mapv(|v| (v * factor).clamp(0.0, max_value))
}

/// Drives a per-variant evaluation over the fixed variant set.
#[derive(Debug, Clone)]
pub struct AugmentationEnsembler {
    config: AugmentationConfig,
    max_value: f32,
    parallel: bool,
}

impl AugmentationEnsembler {
    /// Creates an ensembler.
    ///
    /// `max_value` is the upper bound of the tensor value range (1.0 or 255.0).
    pub fn new(config: AugmentationConfig, max_value: f32, parallel: bool) -> Self {
        Self {
            config,
            max_value,
            parallel,
        }
    }

    /// Variants evaluated per call.
    pub fn variants(&self) -> &'static [Augmentation] {
        if self.config.enabled {
            &Augmentation::ALL
        } else {
            &Augmentation::ALL[..1]
        }
    }

    /// Runs `eval` once per variant and returns the results in variant order.
    ///
    /// Each variant tensor is allocated on the base tensor's ledger and dropped
    /// right after its evaluation; on the first error the remaining results are
    /// discarded and every variant tensor is still released.
    pub fn run<T, F>(&self, base: &TensorHandle, eval: F) -> ClassifierResult<Vec<T>>
    where
        T: Send,
        F: Fn(Augmentation, &TensorHandle) -> ClassifierResult<T> + Sync,
    {
        let evaluate = |variant: &Augmentation| -> ClassifierResult<T> {
            match variant.apply(base.array(), &self.config, self.max_value) {
                Some(tensor) => {
                    let handle = TensorHandle::allocate(base.ledger(), tensor);
                    eval(*variant, &handle)
                }
                None => eval(*variant, base),
            }
        };

        let variants = self.variants();
        if self.parallel && variants.len() > 1 {
            variants.par_iter().map(evaluate).collect()
        } else {
            variants.iter().map(evaluate).collect()
        }
    }
}
