//! The ordered class catalog.

use crate::core::config::ConfigError;
use crate::core::errors::ClassifierResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Ordered, unique class labels.
///
/// Label order defines the index mapping of every probability vector. The
/// last label is the "unknown" sentinel assigned when a prediction is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassCatalog {
    labels: Vec<String>,
}

impl ClassCatalog {
    /// Validates and wraps `labels`.
    ///
    /// # Errors
    ///
    /// Fewer than two labels, a blank label, or a duplicate label.
    pub fn new(labels: Vec<String>) -> Result<Self, ConfigError> {
        if labels.len() < 2 {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "class catalog needs at least 2 labels (including the unknown sentinel), got {}",
                    labels.len()
                ),
            });
        }
        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if label.trim().is_empty() {
                return Err(ConfigError::InvalidConfig {
                    message: "class catalog contains a blank label".to_string(),
                });
            }
            if !seen.insert(label.as_str()) {
                return Err(ConfigError::InvalidConfig {
                    message: format!("class catalog contains duplicate label '{}'", label),
                });
            }
        }
        Ok(Self { labels })
    }

    /// Parses a JSON array of labels.
    pub fn from_json_str(json: &str) -> ClassifierResult<Self> {
        let labels: Vec<String> = serde_json::from_str(json)?;
        Ok(Self::new(labels)?)
    }

    /// Reads a JSON array of labels from `path`.
    pub fn from_json_file(path: impl AsRef<Path>) -> ClassifierResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// All labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels, sentinel included.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at `index`.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Index of `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Index of the unknown sentinel.
    pub fn unknown_index(&self) -> usize {
        self.labels.len() - 1
    }

    /// The unknown sentinel label.
    pub fn unknown_label(&self) -> &str {
        &self.labels[self.unknown_index()]
    }
}

impl TryFrom<Vec<String>> for ClassCatalog {
    type Error = ConfigError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<ClassCatalog> for Vec<String> {
    fn from(catalog: ClassCatalog) -> Self {
        catalog.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = ClassCatalog::new(labels(&["A", "B", "Unknown"])).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.index_of("B"), Some(1));
        assert_eq!(catalog.index_of("C"), None);
        assert_eq!(catalog.label(0), Some("A"));
        assert_eq!(catalog.unknown_index(), 2);
        assert_eq!(catalog.unknown_label(), "Unknown");
    }

    #[test]
    fn test_catalog_validation() {
        assert!(ClassCatalog::new(labels(&["Unknown"])).is_err());
        assert!(ClassCatalog::new(labels(&["A", "A", "Unknown"])).is_err());
        assert!(ClassCatalog::new(labels(&["A", " ", "Unknown"])).is_err());
    }

    #[test]
    fn test_catalog_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["Cat", "Dog", "Unknown"]"#).unwrap();
        let catalog = ClassCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.labels(), &labels(&["Cat", "Dog", "Unknown"])[..]);
    }

    #[test]
    fn test_catalog_json_too_short_fails() {
        let err = ClassCatalog::from_json_str(r#"["Unknown"]"#).unwrap_err();
        assert!(err.to_string().contains("at least 2 labels"));
    }

    #[test]
    fn test_catalog_serde_roundtrip_validates() {
        let parsed: Result<ClassCatalog, _> = serde_json::from_str(r#"["A", "A"]"#);
        assert!(parsed.is_err());
        let catalog: ClassCatalog = serde_json::from_str(r#"["A", "Unknown"]"#).unwrap();
        assert_eq!(serde_json::to_string(&catalog).unwrap(), r#"["A","Unknown"]"#);
    }
}
