//! Constants used throughout the classification pipeline.
//!
//! Decision thresholds default to the values the classifier was originally
//! tuned with; the preprocessing constants must stay in sync with them, since
//! the thresholds are only meaningful against this exact preprocessing.

/// The default side length of the square model input.
pub const DEFAULT_INPUT_SIZE: u32 = 300;

/// The default global confidence threshold below which a prediction is rejected.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.70;

/// The default minimum gap between the top-1 and top-2 probabilities.
pub const DEFAULT_MARGIN_THRESHOLD: f64 = 0.08;

/// The default maximum Shannon entropy (natural log) before rejecting.
pub const DEFAULT_ENTROPY_THRESHOLD: f64 = 1.60;

/// The default sharpening exponent (identity).
pub const DEFAULT_SHARPEN_GAMMA: f64 = 1.0;

/// The default softmax temperature applied to logits (identity).
pub const DEFAULT_SOFTMAX_TEMPERATURE: f64 = 1.0;

/// Tolerance on the sum of a raw vector for it to count as already normalized.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Floor applied to zero probabilities before a fractional power transform.
pub const PROBABILITY_EPSILON: f64 = 1e-12;

/// The default fraction used for the brightness up/down variants.
pub const DEFAULT_BRIGHTNESS_DELTA: f32 = 0.10;

/// The default factor used for the contrast stretch variant.
pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.20;

/// The default number of ONNX Runtime sessions kept for concurrent requests.
pub const DEFAULT_SESSION_POOL_SIZE: usize = 1;

/// Input tensor names tried, in order, when a graph model exposes several inputs.
pub const COMMON_INPUT_NAMES: [&str; 6] = ["x", "input", "input_1", "images", "image", "data"];
