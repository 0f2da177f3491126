//! Environment variable overlay.
//!
//! Overrides are read once, when a configuration is built. Lookups go through a
//! closure so callers (and tests) can supply values without touching the
//! process environment.

use super::errors::ConfigError;
use std::str::FromStr;

/// Confidence threshold override (global).
pub const ENV_UNKNOWN_THRESHOLD: &str = "UNKNOWN_THRESHOLD";
/// Margin threshold override.
pub const ENV_MARGIN_THRESHOLD: &str = "MARGIN_THRESHOLD";
/// Entropy threshold override.
pub const ENV_ENTROPY_THRESHOLD: &str = "ENTROPY_THRESHOLD";
/// Softmax temperature override.
pub const ENV_SOFTMAX_TEMP: &str = "SOFTMAX_TEMP";
/// Sharpening exponent override.
pub const ENV_SHARPEN_GAMMA: &str = "SHARPEN_GAMMA";
/// Model input side length override.
pub const ENV_INPUT_SIZE: &str = "INPUT_SIZE";

/// Reads a variable from the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Looks up `key` and parses it.
///
/// Returns `Ok(None)` when the variable is unset or blank, and an
/// [`ConfigError::InvalidConfig`] when it is set but does not parse.
pub fn parse_override<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidConfig {
            message: format!("environment variable {} has unparsable value '{}'", key, raw),
        })
}
