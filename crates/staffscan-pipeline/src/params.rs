//! Staff parameter estimation from vertical run-length histograms.
//!
//! Walking down every column, the page alternates between ink and
//! background runs. On a page of music most ink runs cross a staff line
//! and most background runs span a staff space, so the modal run length
//! of each class gives the line thickness and the line spacing.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryImage, Pixel};
use crate::types::Range;

/// Frequency of run lengths for one pixel class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunHistogram {
    counts: BTreeMap<u32, u64>,
}

impl RunHistogram {
    /// Record one run of `length` pixels.
    pub fn add(&mut self, length: u32) {
        *self.counts.entry(length).or_insert(0) += 1;
    }

    /// Number of runs recorded with `length`.
    #[must_use]
    pub fn count(&self, length: u32) -> u64 {
        self.counts.get(&length).copied().unwrap_or(0)
    }

    /// Total number of runs recorded.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Whether no run has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The most frequent run length; ties go to the shorter length.
    #[must_use]
    pub fn mode(&self) -> Option<u32> {
        let mut best: Option<(u32, u64)> = None;
        for (&length, &count) in &self.counts {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((length, count));
            }
        }
        best.map(|(length, _)| length)
    }
}

/// Ink and background run histograms over every column of `image`.
///
/// Background runs that touch the top or bottom border are page margins
/// and are left out.
#[must_use]
pub fn column_histograms(image: &BinaryImage) -> (RunHistogram, RunHistogram) {
    let mut ink = RunHistogram::default();
    let mut background = RunHistogram::default();
    for x in 0..image.width() {
        let runs = image.column_runs(x);
        let last = runs.len().saturating_sub(1);
        for (i, &(class, length)) in runs.iter().enumerate() {
            match class {
                Pixel::Ink => ink.add(length),
                Pixel::Background if i != 0 && i != last => background.add(length),
                Pixel::Background => {}
            }
        }
    }
    (ink, background)
}

/// Estimated staff line thickness and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffParams {
    /// Staff line thickness in rows.
    pub line_height: Range,
    /// Background rows between adjacent staff lines.
    pub space_height: Range,
}

/// Estimate [`StaffParams`] from a deskewed binary page.
///
/// Returns `None` (with a warning) when the page has no ink runs or no
/// background run enclosed between two ink runs.
#[must_use]
pub fn estimate_staff_params(image: &BinaryImage) -> Option<StaffParams> {
    let (ink, background) = column_histograms(image);
    let (Some(line), Some(space)) = (ink.mode(), background.mode()) else {
        warn!(
            "staff parameters unavailable: {} ink runs, {} enclosed background runs",
            ink.total(),
            background.total()
        );
        return None;
    };
    let params = StaffParams {
        line_height: Range::around_mode(line),
        space_height: Range::around_mode(space),
    };
    debug!(
        "staff params: line mode {line} ({} runs), space mode {space} ({} runs)",
        ink.count(line),
        background.count(space)
    );
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(thickness: u32, gap: u32) -> BinaryImage {
        let period = thickness + gap;
        BinaryImage::from_fn(120, 20 + 5 * period + 20, |x, y| {
            (10..110).contains(&x) && y >= 20 && y < 20 + 5 * period && (y - 20) % period < thickness
        })
    }

    #[test]
    fn mode_prefers_shorter_on_tie() {
        let mut h = RunHistogram::default();
        for len in [4, 7, 7, 4, 9] {
            h.add(len);
        }
        assert_eq!(h.mode(), Some(4));
        assert_eq!(h.count(7), 2);
        assert_eq!(h.total(), 5);
    }

    #[test]
    fn empty_histogram_has_no_mode() {
        assert_eq!(RunHistogram::default().mode(), None);
        assert!(RunHistogram::default().is_empty());
    }

    #[test]
    fn border_background_runs_are_ignored() {
        let img = BinaryImage::from_fn(1, 10, |_, y| y == 3 || y == 6);
        let (ink, background) = column_histograms(&img);
        assert_eq!(ink.count(1), 2);
        // Only the two-row run between the marks is enclosed.
        assert_eq!(background.total(), 1);
        assert_eq!(background.count(2), 1);
    }

    #[test]
    fn recovers_thickness_and_spacing() {
        let params = estimate_staff_params(&staff(3, 14));
        let params = params.unwrap_or(StaffParams {
            line_height: Range::new(0, 0),
            space_height: Range::new(0, 0),
        });
        assert_eq!(params.line_height.dominant, 3);
        assert_eq!(params.space_height.dominant, 14);
        assert_eq!((params.space_height.min, params.space_height.max), (13, 15));
    }

    #[test]
    fn single_pixel_lines_use_fixed_range() {
        let params = estimate_staff_params(&staff(1, 9)).map(|p| p.line_height);
        assert_eq!(params, Some(Range::around_mode(1)));
        assert_eq!(params.map(|r| (r.min, r.max)), Some((1, 2)));
    }

    #[test]
    fn blank_page_has_no_params() {
        assert!(estimate_staff_params(&BinaryImage::new(30, 30)).is_none());
    }
}
