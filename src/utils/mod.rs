//! Utility functions shared by the library and the `classify` binary.

use crate::core::errors::{ClassifierError, ClassifierResult, SimpleError};
use std::path::Path;

/// Reads an encoded image from disk.
///
/// Decoding happens later in the pipeline; this only checks that the file
/// exists and is not empty.
///
/// # Arguments
///
/// * `path` - Path to the image file
///
/// # Returns
///
/// The raw file contents, or [`ClassifierError::Io`] if the file cannot be read.
pub fn read_image_bytes(path: impl AsRef<Path>) -> ClassifierResult<Vec<u8>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(ClassifierError::image_decode(
            format!("{} is empty", path.display()),
            None::<SimpleError>,
        ));
    }
    Ok(bytes)
}

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// The filter is read from `RUST_LOG`; `default_directive` is used when it is unset.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        assert!(read_image_bytes(&empty).unwrap_err().is_image_decode());

        let missing = read_image_bytes(dir.path().join("missing.png"));
        assert!(matches!(missing, Err(ClassifierError::Io(_))));

        let full = dir.path().join("full.bin");
        std::fs::write(&full, b"abc").unwrap();
        assert_eq!(read_image_bytes(&full).unwrap(), b"abc");
    }
}
