//! Image decoding and monochrome thresholding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, TIFF) of any color
//! depth, reduces them to luminance, and classifies every pixel as ink
//! or background against a fixed threshold.

use image::{DynamicImage, GrayImage};

use crate::binary::BinaryImage;
use crate::types::PipelineError;

/// Decode raw image bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt, and [`PipelineError::InvalidDimensions`] if the
/// decoded image has no pixels.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PipelineError::InvalidDimensions {
            width: img.width(),
            height: img.height(),
        });
    }
    Ok(img)
}

/// Convert a decoded image of any color depth to 8-bit luminance.
///
/// Uses the `image` crate's Rec. 601 weights, so colored ink darker
/// than the threshold is still ink.
#[must_use]
pub fn to_luma(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Classify every pixel: ink iff its gray value is at most `threshold`.
#[must_use = "returns the binarized image"]
pub fn threshold(gray: &GrayImage, threshold: u8) -> BinaryImage {
    BinaryImage::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y).0[0] <= threshold
    })
}

/// Decode, reduce to luminance, and threshold in one step.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_and_threshold(bytes: &[u8], level: u8) -> Result<BinaryImage, PipelineError> {
    let img = decode(bytes)?;
    Ok(threshold(&to_luma(&img), level))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_return_decode_error() {
        assert!(matches!(
            decode(&[0xFF, 0xFE, 0x00, 0x01]),
            Err(PipelineError::ImageDecode(_))
        ));
    }

    #[test]
    fn threshold_is_inclusive() {
        let gray = GrayImage::from_fn(4, 1, |x, _| image::Luma([[199, 200, 201, 0][x as usize]]));
        let bin = threshold(&gray, 200);
        assert!(bin.is_ink(0, 0));
        assert!(bin.is_ink(1, 0));
        assert!(!bin.is_ink(2, 0));
        assert!(bin.is_ink(3, 0));
    }

    #[test]
    fn higher_threshold_keeps_light_gray_as_ink() {
        let gray = GrayImage::from_pixel(1, 1, image::Luma([230]));
        assert!(!threshold(&gray, 200).is_ink(0, 0));
        assert!(threshold(&gray, 240).is_ink(0, 0));
    }

    #[test]
    fn color_png_decodes_and_thresholds() {
        let img = image::RgbaImage::from_fn(6, 3, |x, _| {
            if x < 3 {
                image::Rgba([20, 10, 120, 255])
            } else {
                image::Rgba([250, 250, 250, 255])
            }
        });
        let bin = decode_and_threshold(&encode_png(&img), 200).unwrap();
        assert_eq!(bin.width(), 6);
        assert_eq!(bin.height(), 3);
        assert_eq!(bin.ink_count(), 9);
        assert!(bin.is_ink(2, 2));
        assert!(!bin.is_ink(3, 0));
    }
}
