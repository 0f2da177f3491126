//! Image decoding and normalization into the model input tensor.
//!
//! Raw bytes of any supported format become a `[1, S, S, 3]` RGB tensor in
//! NHWC order. Orientation metadata is applied before resizing, the resize is
//! a cover resize (scale to fill, then centre crop) and pixel values are either
//! kept in `[0, 255]` or scaled to `[0, 1]`, depending on whether the model
//! performs its own rescaling.

use crate::core::config::{ImageClassifierConfig, ResizeFilter};
use crate::core::errors::{ClassifierError, ClassifierResult, SimpleError};
use crate::core::inference::{Tensor4D, TensorHandle, TensorLedger};
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::sync::Arc;

/// Turns image bytes into a normalized model input tensor.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    /// Side length of the square output.
    pub input_size: u32,
    /// Keep pixel values in `[0, 255]` instead of scaling to `[0, 1]`.
    pub model_includes_rescaling: bool,
    /// Resampling filter for the cover resize.
    pub filter: ResizeFilter,
}

impl ImageNormalizer {
    /// Creates a normalizer.
    ///
    /// # Arguments
    ///
    /// * `input_size` - Side length S of the `[1, S, S, 3]` output.
    /// * `model_includes_rescaling` - Whether the model divides by 255 itself.
    /// * `filter` - Resampling filter used when resizing.
    pub fn new(input_size: u32, model_includes_rescaling: bool, filter: ResizeFilter) -> Self {
        Self {
            input_size,
            model_includes_rescaling,
            filter,
        }
    }

    /// Creates a normalizer from classifier configuration.
    pub fn from_config(config: &ImageClassifierConfig) -> Self {
        Self::new(
            config.input_size,
            config.model_includes_rescaling,
            config.resize_filter,
        )
    }

    /// Largest value a pixel can take in the output tensor.
    pub fn max_value(&self) -> f32 {
        if self.model_includes_rescaling {
            255.0
        } else {
            1.0
        }
    }

    /// Decodes, orients, resizes and converts `bytes` into a tracked tensor.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::ImageDecode`] for empty, corrupt or
    /// unsupported input. Nothing is allocated on the ledger in that case.
    pub fn normalize(&self, bytes: &[u8], ledger: &Arc<TensorLedger>) -> ClassifierResult<TensorHandle> {
        let image = decode_oriented(bytes)?;
        let tensor = self.to_tensor(&image);
        Ok(TensorHandle::allocate(ledger, tensor))
    }

    /// Cover-resizes `image` and converts it to a `[1, S, S, 3]` tensor.
    pub fn to_tensor(&self, image: &DynamicImage) -> Tensor4D {
        let size = self.input_size;
        let resized = image.resize_to_fill(size, size, self.filter.into());
        let rgb = resized.to_rgb8();
        let scale = if self.model_includes_rescaling {
            1.0
        } else {
            1.0 / 255.0
        };

        let side = size as usize;
        Tensor4D::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
            rgb.get_pixel(x as u32, y as u32)[c] as f32 * scale
        })
    }
}

/// Decodes `bytes` and applies the embedded orientation, if any.
pub fn decode_oriented(bytes: &[u8]) -> ClassifierResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(ClassifierError::image_decode(
            "input is empty",
            None::<SimpleError>,
        ));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClassifierError::image_decode("failed to read image header", Some(e)))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| ClassifierError::image_decode("unsupported or corrupt image", Some(e)))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| ClassifierError::image_decode("failed to read orientation", Some(e)))?;
    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|e| ClassifierError::image_decode("failed to decode pixels", Some(e)))?;
    image.apply_orientation(orientation);

    if image.width() == 0 || image.height() == 0 {
        return Err(ClassifierError::image_decode(
            "image has zero width or height",
            None::<SimpleError>,
        ));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_output_shape_and_range() {
        let image = RgbImage::from_pixel(40, 20, Rgb([255, 128, 0]));
        let ledger = TensorLedger::new();

        let scaled = ImageNormalizer::new(16, false, ResizeFilter::Nearest);
        let handle = scaled.normalize(&png_bytes(&image), &ledger).unwrap();
        assert_eq!(handle.shape(), &[1, 16, 16, 3]);
        let view = handle.view();
        assert!((view[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((view[[0, 8, 8, 1]] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(view[[0, 15, 15, 2]], 0.0);

        let raw = ImageNormalizer::new(16, true, ResizeFilter::Nearest);
        let handle = raw.normalize(&png_bytes(&image), &ledger).unwrap();
        assert_eq!(handle.view()[[0, 3, 3, 0]], 255.0);
        assert_eq!(raw.max_value(), 255.0);
    }

    #[test]
    fn test_cover_resize_crops_instead_of_padding() {
        // Left half red, right half blue; a wide image cropped to a square keeps
        // the centre, so both colours stay present and nothing is black padding.
        let image = RgbImage::from_fn(40, 10, |x, _| {
            if x < 20 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });
        let normalizer = ImageNormalizer::new(10, true, ResizeFilter::Nearest);
        let tensor = normalizer.to_tensor(&DynamicImage::ImageRgb8(image));
        assert_eq!(tensor[[0, 5, 0, 0]], 255.0);
        assert_eq!(tensor[[0, 5, 9, 2]], 255.0);
        assert!(tensor.iter().all(|&v| v == 0.0 || v == 255.0));
        let black = (0..10)
            .flat_map(|y| (0..10).map(move |x| (y, x)))
            .filter(|&(y, x)| (0..3).all(|c| tensor[[0, y, x, c]] == 0.0))
            .count();
        assert_eq!(black, 0);
    }

    #[test]
    fn test_corrupt_bytes_allocate_nothing() {
        let ledger = TensorLedger::new();
        let normalizer = ImageNormalizer::new(8, false, ResizeFilter::Lanczos3);

        let err = normalizer.normalize(b"definitely not an image", &ledger).unwrap_err();
        assert!(err.is_image_decode());

        let mut truncated = png_bytes(&RgbImage::new(8, 8));
        truncated.truncate(20);
        assert!(normalizer.normalize(&truncated, &ledger).unwrap_err().is_image_decode());

        assert!(normalizer.normalize(&[], &ledger).unwrap_err().is_image_decode());
        assert_eq!(ledger.total_allocated(), 0);
    }
}
