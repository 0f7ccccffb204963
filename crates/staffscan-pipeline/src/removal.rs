//! Staff-line removal.
//!
//! Staff-line pixels are first marked from the detected segments. Each
//! marked vertical run is erased when the ink directly above and below it
//! is no thicker than the tolerance; a symbol crossing the line leaves a
//! tall margin and keeps its run. Two cleanup passes then erase single
//! pixels and thin leftovers inside the staff-line bands.

use log::debug;

use crate::binary::{BinaryImage, Pixel};
use crate::params::StaffParams;
use crate::staff::Staff;
use crate::types::{Range, Rect};

/// Output of [`remove_staff_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalResult {
    /// Page with staff lines erased.
    pub image: BinaryImage,
    /// Ink pixels turned to background.
    pub erased: u64,
    /// Marked runs left in place because a symbol crosses them.
    pub kept_runs: usize,
}

/// Margin tolerance: one pixel for lines thicker than one pixel.
#[must_use]
pub const fn tolerance(line_height: &Range) -> u32 {
    if line_height.dominant > 1 { 1 } else { 0 }
}

/// Consecutive ink pixels in column `x` starting at row `from` and
/// stepping by `step`, counting at most `cap`.
fn ink_margin(image: &BinaryImage, x: u32, from: Option<u32>, step: i64, cap: u32) -> u32 {
    let Some(from) = from else {
        return 0;
    };
    let mut count = 0;
    let mut y = i64::from(from);
    while count < cap && image.is_ink_at(i64::from(x), y) {
        count += 1;
        y += step;
    }
    count
}

/// Band of rows around each staff line in which cleanup passes run.
fn line_bands(staves: &[Staff]) -> Vec<Rect> {
    staves
        .iter()
        .flat_map(|s| &s.lines)
        .map(|l| {
            let r = l.bounding_rect;
            Rect::new(
                r.left.saturating_sub(1),
                r.top.saturating_sub(1),
                r.right + 1,
                r.bottom + 1,
            )
        })
        .collect()
}

fn band_pixels(bands: &[Rect], image: &BinaryImage) -> Vec<(u32, u32)> {
    bands
        .iter()
        .flat_map(|b| {
            let right = b.right.min(image.width().saturating_sub(1));
            let bottom = b.bottom.min(image.height().saturating_sub(1));
            (b.top..=bottom).flat_map(move |y| (b.left..=right).map(move |x| (x, y)))
        })
        .filter(|&(x, y)| image.is_ink(x, y))
        .collect()
}

/// Erase ink pixels inside `bands` that have no 4-connected ink neighbour.
pub fn remove_isolated_pixels(image: &mut BinaryImage, bands: &[Rect]) -> u64 {
    let mut erased = 0;
    for (x, y) in band_pixels(bands, image) {
        let (xi, yi) = (i64::from(x), i64::from(y));
        let isolated = [(xi - 1, yi), (xi + 1, yi), (xi, yi - 1), (xi, yi + 1)]
            .iter()
            .all(|&(nx, ny)| !image.is_ink_at(nx, ny));
        if isolated {
            image.set(x, y, Pixel::Background);
            erased += 1;
        }
    }
    erased
}

/// Erase ink pixels inside `bands` whose 3-column, 4-row neighbourhood
/// (rows `y-1..=y+2`) holds ink only on the pixel's own row.
pub fn clear_thin_leftovers(image: &mut BinaryImage, bands: &[Rect]) -> u64 {
    let mut erased = 0;
    for (x, y) in band_pixels(bands, image) {
        let (xi, yi) = (i64::from(x), i64::from(y));
        let other_rows_empty = [yi - 1, yi + 1, yi + 2]
            .iter()
            .all(|&ny| (xi - 1..=xi + 1).all(|nx| !image.is_ink_at(nx, ny)));
        if other_rows_empty {
            image.set(x, y, Pixel::Background);
            erased += 1;
        }
    }
    erased
}

/// Erase the staff lines of `staves` from `image`.
#[must_use = "returns the cleaned image"]
pub fn remove_staff_lines(image: &BinaryImage, staves: &[Staff], params: &StaffParams) -> RemovalResult {
    let tol = tolerance(&params.line_height);
    let max_run = params.line_height.max;

    let mut marked = BinaryImage::new(image.width(), image.height());
    for line in staves.iter().flat_map(|s| &s.lines) {
        for p in line.pixels() {
            if image.is_ink(p.x, p.y) {
                marked.set(p.x, p.y, Pixel::Ink);
            }
        }
    }

    let mut out = image.clone();
    let mut erased = 0;
    let mut kept_runs = 0;
    for x in 0..image.width() {
        let mut y = 0;
        while y < image.height() {
            if !marked.is_ink(x, y) {
                y += 1;
                continue;
            }
            let top = y;
            while marked.is_ink(x, y) {
                y += 1;
            }
            let bottom = y - 1;

            let above = ink_margin(image, x, top.checked_sub(1), -1, tol + 1);
            let below = ink_margin(image, x, bottom.checked_add(1), 1, tol + 1);
            if bottom - top < max_run && above <= tol && below <= tol {
                for ey in top - above..=bottom + below {
                    out.set(x, ey, Pixel::Background);
                    erased += 1;
                }
            } else {
                kept_runs += 1;
            }
        }
    }

    let bands = line_bands(staves);
    erased += remove_isolated_pixels(&mut out, &bands);
    erased += clear_thin_leftovers(&mut out, &bands);

    debug!("staff removal: {erased} pixels erased, {kept_runs} crossed runs kept");
    RemovalResult {
        image: out,
        erased,
        kept_runs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staff::build_staves;
    use crate::staff_line::detect_staff_lines;

    fn params(line: u32, space: u32) -> StaffParams {
        StaffParams {
            line_height: Range::around_mode(line),
            space_height: Range::around_mode(space),
        }
    }

    /// One staff of 2-px lines, 12 rows apart, from column 20 to 179.
    fn staff_page() -> BinaryImage {
        BinaryImage::from_fn(200, 100, |x, y| {
            (20..180).contains(&x) && y >= 20 && y < 80 && (y - 20) % 12 < 2
        })
    }

    fn staves_of(img: &BinaryImage) -> Vec<Staff> {
        build_staves(&detect_staff_lines(img, 0.9).lines, img, 5)
    }

    #[test]
    fn tolerance_depends_on_thickness() {
        assert_eq!(tolerance(&Range::around_mode(1)), 0);
        assert_eq!(tolerance(&Range::around_mode(3)), 1);
    }

    #[test]
    fn clean_staff_is_erased_completely() {
        let img = staff_page();
        let staves = staves_of(&img);
        let result = remove_staff_lines(&img, &staves, &params(2, 10));
        assert_eq!(result.image.ink_count(), 0);
        assert_eq!(result.erased, img.ink_count());
        assert_eq!(result.kept_runs, 0);
    }

    #[test]
    fn crossing_stem_survives() {
        let mut img = staff_page();
        for y in 10..70 {
            img.set(100, y, Pixel::Ink);
        }
        let staves = staves_of(&img);
        let result = remove_staff_lines(&img, &staves, &params(2, 10));
        let out = &result.image;
        assert!(result.kept_runs > 0);
        // The stem is intact where it crosses the second line.
        assert!((10..70).all(|y| out.is_ink(100, y)));
        assert!(!out.is_ink(60, 32));
        assert!(!out.is_ink(99, 32));
    }

    #[test]
    fn runs_taller_than_max_are_kept() {
        let img = staff_page();
        let staves = staves_of(&img);
        // A 1 px estimate allows runs up to 2 rows.
        let result = remove_staff_lines(&img, &staves, &params(1, 10));
        assert_eq!(result.image.ink_count(), 0);

        let thick = BinaryImage::from_fn(200, 100, |x, y| {
            (20..180).contains(&x) && y >= 20 && y < 80 && (y - 20) % 12 < 4
        });
        let staves = staves_of(&thick);
        let result = remove_staff_lines(&thick, &staves, &params(1, 8));
        assert_eq!(result.image.ink_count(), thick.ink_count());
    }

    #[test]
    fn isolated_pixels_inside_bands_are_erased() {
        let mut img = BinaryImage::from_fn(20, 20, |x, y| (x, y) == (5, 5) || (x, y) == (15, 15));
        img.set(10, 5, Pixel::Ink);
        img.set(11, 5, Pixel::Ink);
        let bands = [Rect::new(0, 4, 19, 6)];
        assert_eq!(remove_isolated_pixels(&mut img, &bands), 1);
        assert!(!img.is_ink(5, 5));
        assert!(img.is_ink(10, 5));
        assert!(img.is_ink(15, 15));
    }

    #[test]
    fn thin_leftovers_are_cleared_but_blobs_stay() {
        let mut img = BinaryImage::from_fn(30, 20, |x, y| {
            (y == 5 && (2..8).contains(&x)) || ((15..20).contains(&x) && (4..8).contains(&y))
        });
        let bands = [Rect::new(0, 4, 29, 6)];
        let erased = clear_thin_leftovers(&mut img, &bands);
        assert_eq!(erased, 6);
        assert!((2..8).all(|x| !img.is_ink(x, 5)));
        assert!(img.is_ink(17, 5));
    }
}
