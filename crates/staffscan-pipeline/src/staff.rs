//! Staff construction: grouping detected lines into five-line staves.
//!
//! Each [`Staff`] carries two boxes. The line-only box spans its first
//! and last line. The symbol-inclusive box additionally covers ink that
//! hangs off the outer lines (stems, ledger notes, slurs), found by
//! following ink upward from the top line and downward from the bottom
//! line. The walk is iterative and never crosses into a neighbouring
//! staff's line box.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryImage, Pixel};
use crate::staff_line::StaffLine;
use crate::types::{Point, Rect};

/// A complete group of staff lines with its derived geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    /// Lines ordered top to bottom.
    pub lines: Vec<StaffLine>,
    /// Leftmost point over all lines.
    pub start: Point,
    /// Rightmost point over all lines.
    pub end: Point,
    /// Box spanning the first and last line.
    pub staff_bounding_rect: Rect,
    /// Line box extended by ink connected above and below the staff.
    pub bounding_rect: Rect,
}

/// Vertical direction of a propagation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    /// The row one step along this direction, if it stays within `limit`.
    fn step(self, y: u32, limit: u32) -> Option<u32> {
        match self {
            Self::Up => y.checked_sub(1).filter(|&ny| ny >= limit),
            Self::Down => y.checked_add(1).filter(|&ny| ny <= limit),
        }
    }
}

/// Box of every ink pixel reachable from `seeds` by repeatedly stepping
/// one row in `direction` to one of the three pixels above or below.
///
/// Rows beyond `limit` are never entered. Each pixel is visited once.
fn propagate(
    image: &BinaryImage,
    seeds: impl IntoIterator<Item = Point>,
    direction: Direction,
    limit: u32,
) -> Option<Rect> {
    let mut visited = BinaryImage::new(image.width(), image.height());
    let mut stack: Vec<Point> = Vec::new();
    let mut reach: Option<Rect> = None;

    for seed in seeds {
        if image.is_ink(seed.x, seed.y) && !visited.is_ink(seed.x, seed.y) {
            visited.set(seed.x, seed.y, Pixel::Ink);
            stack.push(seed);
        }
    }

    while let Some(p) = stack.pop() {
        let pixel = Rect::from_point(p);
        reach = Some(reach.map_or(pixel, |r| r.union(&pixel)));

        let Some(ny) = direction.step(p.y, limit) else {
            continue;
        };
        for nx in [p.x.checked_sub(1), Some(p.x), p.x.checked_add(1)]
            .into_iter()
            .flatten()
        {
            if image.is_ink(nx, ny) && !visited.is_ink(nx, ny) {
                visited.set(nx, ny, Pixel::Ink);
                stack.push(Point::new(nx, ny));
            }
        }
    }
    reach
}

impl Staff {
    /// Build a staff from y-ordered `lines`, propagating the
    /// symbol-inclusive box between rows `upper` and `lower` (inclusive).
    ///
    /// Returns `None` for an empty line list.
    #[must_use]
    pub fn from_lines(lines: Vec<StaffLine>, image: &BinaryImage, upper: u32, lower: u32) -> Option<Self> {
        let first = lines.first()?;
        let last = lines.last()?;
        let staff_bounding_rect = first.bounding_rect.union(&last.bounding_rect);

        let above = propagate(image, first.pixels(), Direction::Up, upper);
        let below = propagate(image, last.pixels(), Direction::Down, lower);
        let bounding_rect = [above, below]
            .into_iter()
            .flatten()
            .fold(staff_bounding_rect, |acc, r| acc.union(&r));

        let start = lines
            .iter()
            .map(|l| l.start)
            .min_by_key(|p| p.x)
            .unwrap_or(first.start);
        let end = lines
            .iter()
            .map(|l| l.end)
            .max_by_key(|p| p.x)
            .unwrap_or(last.end);

        Some(Self {
            lines,
            start,
            end,
            staff_bounding_rect,
            bounding_rect,
        })
    }

    /// The top line.
    #[must_use]
    pub fn first_line(&self) -> Option<&StaffLine> {
        self.lines.first()
    }

    /// The bottom line.
    #[must_use]
    pub fn last_line(&self) -> Option<&StaffLine> {
        self.lines.last()
    }
}

/// Group y-ordered lines into staves of `lines_per_staff`.
///
/// Lines left over after the last complete group are dropped with a
/// warning. Propagation for each staff is bounded by the line boxes of
/// its neighbours, or the image border.
#[must_use]
pub fn build_staves(lines: &[StaffLine], image: &BinaryImage, lines_per_staff: usize) -> Vec<Staff> {
    if lines_per_staff == 0 {
        return Vec::new();
    }
    let groups: Vec<&[StaffLine]> = lines.chunks_exact(lines_per_staff).collect();
    let leftover = lines.len() % lines_per_staff;
    if leftover != 0 {
        warn!(
            "{leftover} staff line(s) below the last complete staff of {lines_per_staff} were dropped"
        );
    }

    let line_boxes: Vec<Option<Rect>> = groups
        .iter()
        .map(|g| Some(g.first()?.bounding_rect.union(&g.last()?.bounding_rect)))
        .collect();
    let bottom_row = image.height().saturating_sub(1);

    let staves: Vec<Staff> = groups
        .iter()
        .enumerate()
        .filter_map(|(i, group)| {
            let upper = i
                .checked_sub(1)
                .and_then(|p| line_boxes[p])
                .map_or(0, |r| r.bottom + 1);
            let lower = line_boxes
                .get(i + 1)
                .copied()
                .flatten()
                .map_or(bottom_row, |r| r.top.saturating_sub(1));
            Staff::from_lines(group.to_vec(), image, upper, lower)
        })
        .collect();

    debug!("built {} staves from {} lines", staves.len(), lines.len());
    staves
}
