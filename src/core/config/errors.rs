//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A model path does not exist.
    #[error("model path does not exist: {path}")]
    ModelPathNotFound { path: std::path::PathBuf },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A configuration map names a label that is not in the class catalog.
    #[error("unknown label '{label}' in {field}")]
    UnknownLabel { label: String, field: String },

    /// A resource limit has been exceeded.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

/// A trait for validating configuration parameters.
///
/// Implementors provide [`validate`](ConfigValidator::validate) and
/// [`get_defaults`](ConfigValidator::get_defaults); the range checks below are
/// shared by every configuration type in the crate.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates a model path.
    ///
    /// This method checks that the model path exists and is a file.
    fn validate_model_path(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ModelPathNotFound {
                path: path.to_path_buf(),
            });
        }

        if !path.is_file() {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "Model path must be a file, not a directory: {}",
                    path.display()
                ),
            });
        }

        Ok(())
    }

    /// Validates image dimensions.
    fn validate_image_dimensions(&self, width: u32, height: u32) -> Result<(), ConfigError> {
        if width == 0 || height == 0 {
            Err(ConfigError::InvalidConfig {
                message: "Image dimensions must be positive".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a probability threshold lies in `[0, 1]`.
    fn validate_probability(&self, value: f64, field_name: &str) -> Result<(), ConfigError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    field_name, value
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates thread count.
    fn validate_thread_count(&self, thread_count: usize) -> Result<(), ConfigError> {
        const MAX_REASONABLE_THREADS: usize = 256;

        if thread_count == 0 {
            Err(ConfigError::InvalidConfig {
                message: "Thread count must be greater than 0".to_string(),
            })
        } else if thread_count > MAX_REASONABLE_THREADS {
            Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "Thread count {} exceeds reasonable maximum of {}",
                    thread_count, MAX_REASONABLE_THREADS
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a float value is finite and within a range (inclusive).
    fn validate_f64_range(
        &self,
        value: f64,
        min: f64,
        max: f64,
        field_name: &str,
    ) -> Result<(), ConfigError> {
        if !value.is_finite() || value < min || value > max {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be between {} and {}, got {}",
                    field_name, min, max, value
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a float value is finite and strictly positive.
    fn validate_positive_f64(&self, value: f64, field_name: &str) -> Result<(), ConfigError> {
        if !value.is_finite() || value <= 0.0 {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be a finite value greater than 0, got {}",
                    field_name, value
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a usize value is positive.
    fn validate_positive_usize(&self, value: usize, field_name: &str) -> Result<(), ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be greater than 0, got {}", field_name, value),
            })
        } else {
            Ok(())
        }
    }
}

/// Extension trait wrapping validation errors into [`ClassifierError`](crate::core::ClassifierError).
pub trait ConfigValidatorExt: ConfigValidator {
    /// Validates configuration and returns it, or a `ClassifierError::Config`.
    fn validate_and_wrap(self) -> Result<Self, crate::core::errors::ClassifierError>
    where
        Self: Sized,
    {
        self.validate()?;
        Ok(self)
    }
}

impl<T: ConfigValidator> ConfigValidatorExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestValidator;
    impl ConfigValidator for TestValidator {
        fn validate(&self) -> Result<(), ConfigError> {
            Ok(())
        }

        fn get_defaults() -> Self {
            TestValidator
        }
    }

    #[test]
    fn test_validate_image_dimensions() {
        let validator = TestValidator;
        assert!(validator.validate_image_dimensions(300, 300).is_ok());
        assert!(validator.validate_image_dimensions(0, 300).is_err());
        assert!(validator.validate_image_dimensions(300, 0).is_err());
    }

    #[test]
    fn test_validate_probability() {
        let validator = TestValidator;
        assert!(validator.validate_probability(0.0, "threshold").is_ok());
        assert!(validator.validate_probability(0.7, "threshold").is_ok());
        assert!(validator.validate_probability(1.0, "threshold").is_ok());
        assert!(validator.validate_probability(-0.1, "threshold").is_err());
        assert!(validator.validate_probability(1.1, "threshold").is_err());
        assert!(validator.validate_probability(f64::NAN, "threshold").is_err());
    }

    #[test]
    fn test_validate_positive_f64() {
        let validator = TestValidator;
        assert!(validator.validate_positive_f64(1.5, "temperature").is_ok());
        assert!(validator.validate_positive_f64(0.0, "temperature").is_err());
        assert!(validator.validate_positive_f64(f64::INFINITY, "temperature").is_err());
    }

    #[test]
    fn test_validate_thread_count() {
        let validator = TestValidator;
        assert!(validator.validate_thread_count(1).is_ok());
        assert!(validator.validate_thread_count(0).is_err());
        assert!(validator.validate_thread_count(512).is_err());
    }

    #[test]
    fn test_unknown_label_message() {
        let error = ConfigError::UnknownLabel {
            label: "Gamma".to_string(),
            field: "class_weights".to_string(),
        };
        assert_eq!(error.to_string(), "unknown label 'Gamma' in class_weights");
    }
}
