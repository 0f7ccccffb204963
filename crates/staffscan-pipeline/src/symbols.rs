//! Per-staff symbol regions and sliding-window projections.
//!
//! Runs on the staff-removed page. Columns of a staff's symbol-inclusive
//! box holding at least two ink pixels form candidate symbol regions.
//! Inside each region a square window as wide as the thickest staff line
//! slides down every column; the column's peak height is the tallest
//! stretch over which the window stays fully inked. Peaks about one staff
//! space tall are note heads, taller ones are stems.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::binary::BinaryImage;
use crate::params::StaffParams;
use crate::staff::Staff;
use crate::types::Rect;

/// Minimum ink pixels for a column to join a symbol region.
pub const MIN_COLUMN_INK: u32 = 2;

/// Derived symbol geometry for one staff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffData {
    /// Contiguous runs of qualifying columns, tight around their ink.
    pub symbol_rects: Vec<Rect>,
    /// Peak height of every column that has one.
    pub max_projections: BTreeMap<u32, u32>,
    /// Peaks within the note-head band.
    pub note_projections: BTreeMap<u32, u32>,
    /// Peaks above the note-head band.
    pub stem_projections: BTreeMap<u32, u32>,
    /// Boxes of contiguous note-head columns.
    pub note_head_segments: Vec<Rect>,
    /// Boxes of contiguous stem columns.
    pub stem_segments: Vec<Rect>,
}

/// Fully-inked vertical stretch of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnPeak {
    top: u32,
    height: u32,
}

impl ColumnPeak {
    const fn bottom(self) -> u32 {
        self.top + self.height - 1
    }
}

/// Inclusive peak-height band classified as note heads.
#[must_use]
pub const fn note_head_band(params: &StaffParams) -> (u32, u32) {
    (
        2 * params.line_height.min,
        2 * params.line_height.max + params.space_height.max,
    )
}

/// Side of the square sliding window.
#[must_use]
pub fn window_size(params: &StaffParams) -> u32 {
    params.line_height.max.max(1)
}

/// Candidate symbol regions inside `area`.
#[must_use]
pub fn symbol_regions(image: &BinaryImage, area: Rect) -> Vec<Rect> {
    let mut regions = Vec::new();
    let mut open: Option<Rect> = None;
    for x in area.left..=area.right {
        let rows: Vec<u32> = (area.top..=area.bottom)
            .filter(|&y| image.is_ink(x, y))
            .collect();
        let qualifies = rows.len() >= MIN_COLUMN_INK as usize;
        match (qualifies, rows.first(), rows.last()) {
            (true, Some(&top), Some(&bottom)) => {
                let column = Rect::new(x, top, x, bottom);
                open = Some(open.map_or(column, |r| r.union(&column)));
            }
            _ => regions.extend(open.take()),
        }
    }
    regions.extend(open);
    regions
}

fn window_full(image: &BinaryImage, x: u32, y: u32, w: u32) -> bool {
    (y..y + w).all(|wy| (x..x + w).all(|wx| image.is_ink(wx, wy)))
}

/// Longest stretch of column `x` over which the `w`×`w` window anchored
/// at `x` stays fully inked, within `region`.
fn column_peak(image: &BinaryImage, x: u32, w: u32, region: Rect) -> Option<ColumnPeak> {
    if x + w - 1 > region.right || region.height() < w {
        return None;
    }
    let mut best: Option<(u32, u32)> = None;
    let mut run: Option<(u32, u32)> = None;
    for y in region.top..=region.bottom + 1 - w {
        if window_full(image, x, y, w) {
            run = Some(run.map_or((y, 1), |(start, len)| (start, len + 1)));
        } else {
            run = None;
        }
        if let Some((start, len)) = run
            && best.is_none_or(|(_, l)| len > l)
        {
            best = Some((start, len));
        }
    }
    best.map(|(top, len)| ColumnPeak {
        top,
        height: len + w - 1,
    })
}

/// Boxes over runs of consecutive columns in `peaks`.
fn group_columns(peaks: &BTreeMap<u32, ColumnPeak>) -> Vec<Rect> {
    let mut groups = Vec::new();
    let mut open: Option<Rect> = None;
    for (&x, peak) in peaks {
        let column = Rect::new(x, peak.top, x, peak.bottom());
        open = match open {
            Some(r) if r.right + 1 == x => Some(r.union(&column)),
            Some(r) => {
                groups.push(r);
                Some(column)
            }
            None => Some(column),
        };
    }
    groups.extend(open);
    groups
}

/// Extract symbol regions and projections for `staff` from the
/// staff-removed page.
#[must_use]
pub fn extract_staff_data(image: &BinaryImage, staff: &Staff, params: &StaffParams) -> StaffData {
    let mut data = StaffData::default();
    if image.is_empty() {
        return data;
    }
    let b = staff.bounding_rect;
    let area = Rect::new(
        b.left.min(image.width() - 1),
        b.top.min(image.height() - 1),
        b.right.min(image.width() - 1),
        b.bottom.min(image.height() - 1),
    );

    let w = window_size(params);
    let (band_low, band_high) = note_head_band(params);
    let mut note_peaks = BTreeMap::new();
    let mut stem_peaks = BTreeMap::new();

    data.symbol_rects = symbol_regions(image, area);
    for region in data.symbol_rects.iter().filter(|r| r.width() >= w) {
        for x in region.left..=region.right {
            let Some(peak) = column_peak(image, x, w, *region) else {
                continue;
            };
            data.max_projections.insert(x, peak.height);
            if (band_low..=band_high).contains(&peak.height) {
                data.note_projections.insert(x, peak.height);
                note_peaks.insert(x, peak);
            } else if peak.height > band_high {
                data.stem_projections.insert(x, peak.height);
                stem_peaks.insert(x, peak);
            }
        }
    }
    data.note_head_segments = group_columns(&note_peaks);
    data.stem_segments = group_columns(&stem_peaks);

    debug!(
        "staff at rows {}..={}: {} symbol regions, {} note heads, {} stems",
        area.top,
        area.bottom,
        data.symbol_rects.len(),
        data.note_head_segments.len(),
        data.stem_segments.len()
    );
    data
}
