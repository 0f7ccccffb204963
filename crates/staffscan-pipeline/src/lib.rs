//! staffscan-pipeline: Pure music-score page analysis (sans-IO).
//!
//! Finds the staves on a scanned page of sheet music through:
//! threshold -> deskew -> staff-line detection -> staff construction ->
//! parameter estimation -> staff-line removal -> symbol extraction.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Reading and writing files
//! lives in `staffscan-cli`.

pub mod annotate;
pub mod binary;
pub mod cluster;
pub mod context;
pub mod diagnostics;
pub mod monochrome;
pub mod params;
pub mod pipeline;
pub mod removal;
pub mod rotate;
pub mod segment;
pub mod skew;
pub mod staff;
pub mod staff_line;
pub mod symbols;
pub mod types;

pub use binary::BinaryImage;
pub use context::AnalysisContext;
pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics};
pub use params::StaffParams;
pub use pipeline::Pipeline;
pub use staff::Staff;
pub use staff_line::StaffLine;
pub use symbols::StaffData;
pub use types::{AnalysisResult, Dimensions, PipelineConfig, PipelineError, Point, Range, Rect};

/// Run the full page analysis.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP, TIFF) and a
/// configuration, then produces an [`AnalysisResult`] with the deskewed
/// binary page, the staff-removed page, an annotated rendering and the
/// [`AnalysisContext`] describing every detected staff.
///
/// # Pipeline steps
///
/// 1. Decode the image and threshold its luminance
/// 2. Estimate the skew from traced line slopes and rotate the page level
/// 3. Detect staff lines by longest-path search over row segments
/// 4. Group lines into staves and grow each staff around its symbols
/// 5. Estimate line thickness and spacing from run-length histograms
/// 6. Optionally compute density core points
/// 7. Erase staff lines, keeping the runs symbols cross
/// 8. Extract symbol regions and note-head/stem projections per staff
///
/// A page without staves is not an error: the result simply has none.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<AnalysisResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .binarize()
        .deskew()
        .detect_lines()
        .build_staves()
        .estimate_params()
        .analyze()
        .into_result())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode `img` as an 8-bit grayscale PNG.
    fn png_bytes(img: &image::GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .unwrap();
        buf
    }

    /// Two staves of five 2-px lines, 12 rows apart, on a white page.
    fn two_staff_png() -> Vec<u8> {
        let img = image::GrayImage::from_fn(300, 220, |x, y| {
            let on_staff = |top: u32| y >= top && y < top + 60 && (y - top) % 12 < 2;
            let ink = (20..280).contains(&x) && (on_staff(30) || on_staff(130));
            image::Luma([if ink { 0 } else { 255 }])
        });
        png_bytes(&img)
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_invalid_config() {
        let config = PipelineConfig {
            line_weight_ratio: 1.5,
            ..PipelineConfig::default()
        };
        let result = process(&two_staff_png(), &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn process_blank_page_has_no_staves() {
        let img = image::GrayImage::from_pixel(50, 50, image::Luma([255]));
        let result = process(&png_bytes(&img), &PipelineConfig::default()).unwrap();
        assert_eq!(result.context.staff_count(), 0);
        assert_eq!(
            result.context.dimensions,
            Dimensions {
                width: 50,
                height: 50
            }
        );
    }

    #[test]
    fn process_finds_both_staves() {
        let result = process(&two_staff_png(), &PipelineConfig::default()).unwrap();
        let ctx = &result.context;
        assert_eq!(ctx.staff_count(), 2);
        assert_eq!(ctx.staff_lines.len(), 10);
        assert_eq!(ctx.staves[0].staff_bounding_rect.top, 30);
        assert_eq!(ctx.staves[1].staff_bounding_rect.top, 130);
        assert_eq!(ctx.line_height().map(|r| r.dominant), Some(2));
        assert_eq!(ctx.space_height().map(|r| r.dominant), Some(10));
        assert_eq!(ctx.staff_data.len(), 2);
        assert_eq!(result.removed.map(|r| r.ink_count()), Some(0));
    }
}
