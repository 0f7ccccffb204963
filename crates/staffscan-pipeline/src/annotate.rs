//! Annotated rendering of the detected page structure.
//!
//! The page is drawn black on white, then overlaid with the staff-line
//! segments, both staff boxes, note-head and stem boxes, and density core
//! points when they were computed.

use image::{Rgb, RgbImage};

use crate::binary::{BACKGROUND_LUMA, BinaryImage, INK_LUMA};
use crate::context::AnalysisContext;
use crate::types::Rect;

/// Ink pixels.
pub const INK: Rgb<u8> = Rgb([INK_LUMA; 3]);
/// Paper.
pub const BACKGROUND: Rgb<u8> = Rgb([BACKGROUND_LUMA; 3]);
/// Staff-line segment pixels.
pub const STAFF_LINE: Rgb<u8> = Rgb([220, 30, 30]);
/// Line-only staff box.
pub const STAFF_RECT: Rgb<u8> = Rgb([40, 70, 230]);
/// Symbol-inclusive staff box.
pub const BOUNDING_RECT: Rgb<u8> = Rgb([30, 170, 60]);
/// Note-head boxes.
pub const NOTE_HEAD: Rgb<u8> = Rgb([245, 140, 20]);
/// Stem boxes.
pub const STEM: Rgb<u8> = Rgb([200, 40, 200]);
/// Density core points.
pub const CORE_POINT: Rgb<u8> = Rgb([20, 200, 210]);

/// Draw the outline of `rect`, clipped to the image.
pub fn draw_rect_outline(image: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    let mut put = |x: u32, y: u32| {
        if x < width && y < height {
            image.put_pixel(x, y, color);
        }
    };
    for x in rect.left..=rect.right {
        put(x, rect.top);
        put(x, rect.bottom);
    }
    for y in rect.top..=rect.bottom {
        put(rect.left, y);
        put(rect.right, y);
    }
}

/// Render `page` with the structures recorded in `context`.
#[must_use]
pub fn render(page: &BinaryImage, context: &AnalysisContext) -> RgbImage {
    let mut out = RgbImage::from_fn(page.width(), page.height(), |x, y| {
        if page.is_ink(x, y) { INK } else { BACKGROUND }
    });

    for line in &context.staff_lines {
        for p in line.pixels().filter(|p| page.is_ink(p.x, p.y)) {
            out.put_pixel(p.x, p.y, STAFF_LINE);
        }
    }
    for staff in &context.staves {
        draw_rect_outline(&mut out, staff.bounding_rect, BOUNDING_RECT);
        draw_rect_outline(&mut out, staff.staff_bounding_rect, STAFF_RECT);
    }
    for data in &context.staff_data {
        for &r in &data.note_head_segments {
            draw_rect_outline(&mut out, r, NOTE_HEAD);
        }
        for &r in &data.stem_segments {
            draw_rect_outline(&mut out, r, STEM);
        }
    }
    for p in context.core_points() {
        if p.x < out.width() && p.y < out.height() {
            out.put_pixel(p.x, p.y, CORE_POINT);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staff_line::StaffLine;
    use crate::segment::Segment;
    use crate::types::{Dimensions, PipelineConfig};

    fn context(width: u32, height: u32) -> AnalysisContext {
        AnalysisContext::new(PipelineConfig::default(), Dimensions { width, height })
    }

    #[test]
    fn blank_context_renders_page_only() {
        let page = BinaryImage::from_fn(4, 4, |x, y| x == y);
        let out = render(&page, &context(4, 4));
        assert_eq!(*out.get_pixel(2, 2), INK);
        assert_eq!(*out.get_pixel(3, 0), BACKGROUND);
    }

    #[test]
    fn staff_line_pixels_are_highlighted() {
        let page = BinaryImage::from_fn(20, 10, |x, y| y == 4 && (2..18).contains(&x));
        let mut ctx = context(20, 10);
        ctx.staff_lines
            .extend(StaffLine::from_segments(vec![Segment::new(4, 2, 17)]));
        let out = render(&page, &ctx);
        assert_eq!(*out.get_pixel(10, 4), STAFF_LINE);
        assert_eq!(*out.get_pixel(10, 5), BACKGROUND);
    }

    #[test]
    fn rect_outline_is_clipped() {
        let mut img = RgbImage::from_pixel(5, 5, BACKGROUND);
        draw_rect_outline(&mut img, Rect::new(1, 1, 8, 3), STEM);
        assert_eq!(*img.get_pixel(1, 1), STEM);
        assert_eq!(*img.get_pixel(4, 3), STEM);
        assert_eq!(*img.get_pixel(2, 2), BACKGROUND);
        assert_eq!(*img.get_pixel(1, 2), STEM);
    }
}
