//! Page rotation with bounding-box expansion and border cleanup.
//!
//! The rotated page is rendered onto a canvas just large enough to hold
//! the whole source, so no content is cropped. Canvas pixels outside the
//! rotated footprint of the source are forced to background, removing
//! interpolation artifacts along the new corners.
//!
//! Positive angles turn the content counter-clockwise as displayed
//! (y axis pointing down).

use geo::{Coord, Intersects, LineString, Polygon};
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

use crate::binary::{BACKGROUND_LUMA, BinaryImage, Pixel};
use crate::monochrome;

/// Canvas size that holds a `width`×`height` image rotated by `degrees`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "canvas sizes are positive and bounded by the source diagonal"
)]
pub fn rotated_dimensions(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    // The epsilon keeps exact multiples of 90° from growing by a pixel.
    let new_w = w.mul_add(cos, h * sin) - 1e-6;
    let new_h = w.mul_add(sin, h * cos) - 1e-6;
    (new_w.ceil().max(1.0) as u32, new_h.ceil().max(1.0) as u32)
}

/// Whether rotating a `width`×`height` image by `degrees` would move no
/// pixel by half a pixel or more.
#[must_use]
pub fn is_negligible(width: u32, height: u32, degrees: f64) -> bool {
    let half_diagonal = f64::from(width).hypot(f64::from(height)) / 2.0;
    degrees.to_radians().abs() * half_diagonal < 0.5
}

/// Map a source pixel coordinate into the rotated canvas.
fn forward(x: f64, y: f64, src: (u32, u32), dst: (u32, u32), theta: f64) -> Coord<f64> {
    let (cx, cy) = center(src);
    let (ncx, ncy) = center(dst);
    let (dx, dy) = (x - cx, y - cy);
    let (sin, cos) = theta.sin_cos();
    Coord {
        x: ncx + dx.mul_add(cos, dy * sin),
        y: ncy + (-dx).mul_add(sin, dy * cos),
    }
}

fn center((w, h): (u32, u32)) -> (f64, f64) {
    ((f64::from(w) - 1.0) / 2.0, (f64::from(h) - 1.0) / 2.0)
}

/// The source image's outline inside the rotated canvas.
#[must_use]
pub fn footprint(width: u32, height: u32, degrees: f64) -> Polygon<f64> {
    let dst = rotated_dimensions(width, height, degrees);
    let src = (width, height);
    let theta = degrees.to_radians();
    let (right, bottom) = (
        f64::from(width.saturating_sub(1)),
        f64::from(height.saturating_sub(1)),
    );
    let corners = vec![
        forward(0.0, 0.0, src, dst, theta),
        forward(right, 0.0, src, dst, theta),
        forward(right, bottom, src, dst, theta),
        forward(0.0, bottom, src, dst, theta),
    ];
    Polygon::new(LineString::new(corners), vec![])
}

/// Rotate a grayscale image onto an expanded canvas filled with white.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn rotate_gray(gray: &GrayImage, degrees: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (new_w, new_h) = rotated_dimensions(width, height, degrees);
    let (cx, cy) = center((width, height));
    let (ncx, ncy) = center((new_w, new_h));

    // `Projection::rotate` turns clockwise on a y-down raster, hence the
    // negated angle.
    let projection = Projection::translate(ncx as f32, ncy as f32)
        * Projection::rotate(-degrees.to_radians() as f32)
        * Projection::translate(-cx as f32, -cy as f32);

    let mut out = GrayImage::from_pixel(new_w, new_h, Luma([BACKGROUND_LUMA]));
    warp_into(
        gray,
        &projection,
        Interpolation::Bilinear,
        Luma([BACKGROUND_LUMA]),
        &mut out,
    );
    out
}

/// Force every ink pixel outside `polygon` to background.
pub fn clear_outside(image: &mut BinaryImage, polygon: &Polygon<f64>) {
    let outside: Vec<_> = image
        .ink_points()
        .filter(|p| !polygon.intersects(&geo::Point::new(f64::from(p.x), f64::from(p.y))))
        .collect();
    for p in outside {
        image.set(p.x, p.y, Pixel::Background);
    }
}

/// Rotate a binary page by `degrees`, re-binarizing at `threshold`.
///
/// Interpolated edge pixels become ink iff their gray value is at most
/// `threshold`; corner regions introduced by the canvas expansion are
/// cleared. An empty image, or an angle too small to move any pixel by
/// half a pixel, returns an unchanged copy.
#[must_use = "returns the rotated image"]
pub fn rotate(image: &BinaryImage, degrees: f64, threshold: u8) -> BinaryImage {
    if image.is_empty()
        || !degrees.is_finite()
        || is_negligible(image.width(), image.height(), degrees)
    {
        return image.clone();
    }
    let rotated = rotate_gray(&image.to_gray(), degrees);
    let mut binary = monochrome::threshold(&rotated, threshold);
    let outline = footprint(image.width(), image.height(), degrees);
    clear_outside(&mut binary, &outline);
    binary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink_rows_in_column(img: &BinaryImage, x: u32) -> Vec<u32> {
        (0..img.height()).filter(|&y| img.is_ink(x, y)).collect()
    }

    #[test]
    fn dimensions_unchanged_at_zero() {
        assert_eq!(rotated_dimensions(100, 50, 0.0), (100, 50));
    }

    #[test]
    fn dimensions_swap_at_right_angle() {
        assert_eq!(rotated_dimensions(100, 50, 90.0), (50, 100));
        assert_eq!(rotated_dimensions(100, 50, -90.0), (50, 100));
    }

    #[test]
    fn dimensions_grow_for_oblique_angles() {
        let (w, h) = rotated_dimensions(100, 100, 45.0);
        assert_eq!((w, h), (142, 142));
    }

    #[test]
    fn zero_angle_is_identity() {
        let img = BinaryImage::from_fn(30, 20, |x, y| (x + y) % 3 == 0);
        assert_eq!(rotate(&img, 0.0, 240), img);
    }

    #[test]
    fn tiny_angle_is_negligible() {
        // Half-diagonal of 100x100 is ~70.7 px; 0.4° moves it ~0.49 px.
        assert!(is_negligible(100, 100, 0.4));
        assert!(!is_negligible(100, 100, 0.5));
        let img = BinaryImage::from_fn(100, 100, |x, y| y == 50 && x > 10);
        assert_eq!(rotate(&img, -0.01, 240), img);
    }

    #[test]
    fn empty_image_is_returned_unchanged() {
        let img = BinaryImage::new(0, 0);
        assert_eq!(rotate(&img, 12.0, 240), img);
    }

    #[test]
    fn positive_angle_lifts_right_end() {
        let img = BinaryImage::from_fn(120, 60, |x, y| (29..=30).contains(&y) && (10..110).contains(&x));
        let rotated = rotate(&img, 10.0, 240);
        let columns: Vec<u32> = (0..rotated.width())
            .filter(|&x| !ink_rows_in_column(&rotated, x).is_empty())
            .collect();
        let (first, last) = (columns[0], columns[columns.len() - 1]);
        let left_y = ink_rows_in_column(&rotated, first)[0];
        let right_y = ink_rows_in_column(&rotated, last)[0];
        assert!(
            right_y < left_y,
            "expected right end above left end, got left={left_y} right={right_y}"
        );
    }

    #[test]
    fn corners_outside_footprint_are_background() {
        let img = BinaryImage::from_fn(60, 40, |_, _| true);
        let rotated = rotate(&img, 30.0, 240);
        let (w, h) = (rotated.width(), rotated.height());
        assert!(!rotated.is_ink(0, 0));
        assert!(!rotated.is_ink(w - 1, 0));
        assert!(!rotated.is_ink(0, h - 1));
        assert!(!rotated.is_ink(w - 1, h - 1));
        assert!(rotated.is_ink(w / 2, h / 2));
    }

    #[test]
    fn footprint_contains_canvas_center() {
        let outline = footprint(80, 40, 25.0);
        let (w, h) = rotated_dimensions(80, 40, 25.0);
        let c = geo::Point::new(f64::from(w) / 2.0, f64::from(h) / 2.0);
        assert!(outline.intersects(&c));
        assert!(!outline.intersects(&geo::Point::new(0.0, 0.0)));
    }

    #[test]
    fn clear_outside_erases_only_outer_ink() {
        let mut img = BinaryImage::from_fn(10, 10, |_, _| true);
        let square = Polygon::new(
            LineString::from(vec![(2.0, 2.0), (7.0, 2.0), (7.0, 7.0), (2.0, 7.0)]),
            vec![],
        );
        clear_outside(&mut img, &square);
        assert_eq!(img.ink_count(), 36);
        assert!(img.is_ink(2, 2));
        assert!(!img.is_ink(1, 5));
    }
}
