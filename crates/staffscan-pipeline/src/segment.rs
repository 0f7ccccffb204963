//! Row segmentation: gap-tolerant horizontal ink segments.
//!
//! A [`Segment`] is a horizontal stretch of ink on one row in which
//! background gaps narrower than the discontinuity threshold are
//! bridged. Segments are the vertices of the staff-line search graph
//! built in [`crate::staff_line`].

use serde::{Deserialize, Serialize};

use crate::binary::BinaryImage;
use crate::types::{Point, Rect};

/// Pages at most this wide use [`NARROW_PAGE_GAP`].
pub const NARROW_PAGE_WIDTH: u32 = 500;

/// Discontinuity threshold for narrow pages, in pixels.
pub const NARROW_PAGE_GAP: u32 = 5;

/// Discontinuity threshold for wider pages, as a fraction of the width.
pub const WIDE_PAGE_GAP_RATIO: f64 = 0.005;

/// Background gap width (pixels) that ends a segment on a page of the
/// given width.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "half a percent of a u32 width fits in u32"
)]
pub fn discontinuity_threshold(width: u32) -> u32 {
    if width <= NARROW_PAGE_WIDTH {
        NARROW_PAGE_GAP
    } else {
        ((f64::from(width) * WIDE_PAGE_GAP_RATIO).round() as u32).max(1)
    }
}

/// One row's ink segment, extended with longest-path search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Leftmost ink pixel.
    pub start: Point,
    /// Rightmost ink pixel.
    pub end: Point,
    /// Terminal point of the heaviest chain leaving this segment; equal
    /// to `end` until the search has run.
    pub destination: Point,
    /// Component shared by every segment whose best chain ends at the
    /// same terminal segment; `None` until the search has run.
    pub component: Option<usize>,
}

impl Segment {
    /// A fresh segment spanning columns `start_x..=end_x` on row `y`.
    #[must_use]
    pub const fn new(y: u32, start_x: u32, end_x: u32) -> Self {
        let end = Point::new(end_x, y);
        Self {
            start: Point::new(start_x, y),
            end,
            destination: end,
            component: None,
        }
    }

    /// Row of the segment.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.start.y
    }

    /// Number of columns covered by this segment alone.
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.end.x - self.start.x + 1
    }

    /// Column span from this segment's start to its chain destination.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.destination.x.saturating_sub(self.start.x) + 1
    }

    /// Single-row bounding rectangle.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        Rect::new(self.start.x, self.start.y, self.end.x, self.end.y)
    }

    /// Whether two segments touch across adjacent rows.
    ///
    /// Segments are connected when their rows differ by exactly one and
    /// their column spans overlap once each is widened by `gap` pixels.
    /// The relation is symmetric.
    #[must_use]
    pub const fn is_connected(&self, other: &Self, gap: u32) -> bool {
        self.row().abs_diff(other.row()) == 1
            && self.start.x <= other.end.x.saturating_add(gap)
            && other.start.x <= self.end.x.saturating_add(gap)
    }

    /// Whether `next` continues this segment rightwards: connected, and
    /// reaching strictly further right. This relation is acyclic.
    #[must_use]
    pub const fn leads_to(&self, next: &Self, gap: u32) -> bool {
        self.is_connected(next, gap) && next.end.x > self.end.x
    }
}

/// Connectivity over possibly-invalid segments; an absent segment is
/// connected to nothing.
#[must_use]
pub fn connected(a: Option<&Segment>, b: Option<&Segment>, gap: u32) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.is_connected(b, gap),
        _ => false,
    }
}

/// Segments of row `y`, left to right.
///
/// A segment closes once `gap` consecutive background pixels follow its
/// last ink pixel, or at the end of the row.
#[must_use]
pub fn segment_row(image: &BinaryImage, y: u32, gap: u32) -> Vec<Segment> {
    let gap = gap.max(1);
    let mut segments = Vec::new();
    let mut open: Option<u32> = None;
    let mut last_ink = 0;

    for x in 0..image.width() {
        if image.is_ink(x, y) {
            if open.is_none() {
                open = Some(x);
            }
            last_ink = x;
        } else if let Some(start) = open
            && x - last_ink >= gap
        {
            segments.push(Segment::new(y, start, last_ink));
            open = None;
        }
    }
    if let Some(start) = open {
        segments.push(Segment::new(y, start, last_ink));
    }
    segments
}

/// Segments of every row, indexed by row.
#[must_use]
pub fn segment_rows(image: &BinaryImage, gap: u32) -> Vec<Vec<Segment>> {
    (0..image.height())
        .map(|y| segment_row(image, y, gap))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_image(row: &str) -> BinaryImage {
        let width = u32::try_from(row.len()).unwrap_or(0);
        BinaryImage::from_fn(width, 1, |x, _| row.as_bytes()[x as usize] == b'#')
    }

    #[test]
    fn threshold_for_narrow_and_wide_pages() {
        assert_eq!(discontinuity_threshold(120), 5);
        assert_eq!(discontinuity_threshold(500), 5);
        assert_eq!(discontinuity_threshold(2000), 10);
        assert_eq!(discontinuity_threshold(2500), 13);
    }

    #[test]
    fn gaps_below_threshold_are_bridged() {
        // Gap of 2 is bridged, gap of 3 splits with threshold 3.
        let img = row_image("###..###...##");
        let segs = segment_row(&img, 0, 3);
        assert_eq!(segs.len(), 2);
        assert_eq!((segs[0].start.x, segs[0].end.x), (0, 7));
        assert_eq!((segs[1].start.x, segs[1].end.x), (11, 12));
    }

    #[test]
    fn trailing_segment_is_closed_at_row_end() {
        let img = row_image("....#");
        let segs = segment_row(&img, 0, 5);
        assert_eq!(segs, vec![Segment::new(0, 4, 4)]);
    }

    #[test]
    fn empty_row_has_no_segments() {
        let img = row_image("......");
        assert!(segment_row(&img, 0, 5).is_empty());
    }

    #[test]
    fn fresh_segment_weight_is_its_length() {
        let s = Segment::new(3, 10, 19);
        assert_eq!(s.length(), 10);
        assert_eq!(s.weight(), 10);
        assert_eq!(s.destination, s.end);
        assert!(s.component.is_none());
    }

    #[test]
    fn connectivity_is_symmetric() {
        let cases = [
            (Segment::new(0, 0, 10), Segment::new(1, 5, 20)),
            (Segment::new(4, 0, 10), Segment::new(5, 13, 20)),
            (Segment::new(4, 0, 10), Segment::new(5, 16, 20)),
            (Segment::new(4, 0, 10), Segment::new(6, 0, 10)),
            (Segment::new(4, 0, 10), Segment::new(4, 0, 10)),
        ];
        for (a, b) in &cases {
            assert_eq!(a.is_connected(b, 3), b.is_connected(a, 3), "{a:?} / {b:?}");
        }
        assert!(cases[0].0.is_connected(&cases[0].1, 3));
        assert!(cases[1].0.is_connected(&cases[1].1, 3));
        assert!(!cases[2].0.is_connected(&cases[2].1, 3));
        assert!(!cases[3].0.is_connected(&cases[3].1, 3));
        assert!(!cases[4].0.is_connected(&cases[4].1, 3));
    }

    #[test]
    fn missing_segment_is_connected_to_nothing() {
        let s = Segment::new(1, 0, 10);
        assert!(!connected(None, Some(&s), 5));
        assert!(!connected(Some(&s), None, 5));
        assert!(!connected(None, None, 5));
        assert!(connected(Some(&s), Some(&Segment::new(2, 3, 4)), 5));
    }

    #[test]
    fn leads_to_requires_progress_rightwards() {
        let a = Segment::new(0, 0, 10);
        let further = Segment::new(1, 8, 30);
        let inside = Segment::new(1, 2, 9);
        assert!(a.leads_to(&further, 5));
        assert!(!further.leads_to(&a, 5));
        assert!(!a.leads_to(&inside, 5));
    }
}
