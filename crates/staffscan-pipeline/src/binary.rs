//! Two-class page raster and its horizontal run-length encoding.
//!
//! Every stage after thresholding works on a [`BinaryImage`]. Pixel
//! polarity is fixed once at binarization time: [`Pixel::Ink`] is the
//! foreground class for the whole image, regardless of the source's
//! color table.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, Point};

/// Gray value written for ink pixels when exporting.
pub const INK_LUMA: u8 = 0;

/// Gray value written for background pixels when exporting.
pub const BACKGROUND_LUMA: u8 = 255;

/// The two pixel classes of a binarized page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pixel {
    /// Foreground (printed) pixel.
    Ink,
    /// Paper.
    Background,
}

impl Pixel {
    /// Whether this is the ink class.
    #[must_use]
    pub const fn is_ink(self) -> bool {
        matches!(self, Self::Ink)
    }
}

/// A maximal horizontal run of ink pixels on one row.
///
/// `length` is always at least 1; runs returned by
/// [`BinaryImage::row_runs`] are disjoint and sorted by `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// First column of the run.
    pub start: u32,
    /// Number of pixels in the run.
    pub length: u32,
}

impl Run {
    /// Last column of the run (inclusive).
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start + self.length - 1
    }
}

/// Rebuild a row of `width` pixels from its ink runs.
///
/// Runs extending past `width` are clipped.
#[must_use]
pub fn decode_row(runs: &[Run], width: u32) -> Vec<Pixel> {
    let mut row = vec![Pixel::Background; width as usize];
    for run in runs {
        let end = run.start.saturating_add(run.length).min(width);
        for x in run.start..end {
            row[x as usize] = Pixel::Ink;
        }
    }
    row
}

/// A width×height grid of [`Pixel`]s, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: u32,
    height: u32,
    ink: Vec<bool>,
}

impl BinaryImage {
    /// An all-background image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ink: vec![false; width as usize * height as usize],
        }
    }

    /// Build an image by classifying every pixel; `f` returns `true` for ink.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut ink = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                ink.push(f(x, y));
            }
        }
        Self { width, height, ink }
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether the image has no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Class of the pixel at `(x, y)`; out-of-bounds reads as background.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        if self.is_ink(x, y) {
            Pixel::Ink
        } else {
            Pixel::Background
        }
    }

    /// Whether `(x, y)` is an ink pixel. Out-of-bounds is never ink.
    #[must_use]
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.ink[self.index(x, y)]
    }

    /// Signed-coordinate variant of [`is_ink`](Self::is_ink) for
    /// neighbourhood scans that step past the border.
    #[must_use]
    pub fn is_ink_at(&self, x: i64, y: i64) -> bool {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.is_ink(x, y),
            _ => false,
        }
    }

    /// Set the class of `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.ink[i] = pixel.is_ink();
        }
    }

    /// Number of ink pixels.
    #[must_use]
    pub fn ink_count(&self) -> u64 {
        self.ink.iter().map(|&b| u64::from(b)).sum()
    }

    /// All ink pixels in row-major order.
    pub fn ink_points(&self) -> impl Iterator<Item = Point> + '_ {
        let width = self.width;
        self.ink
            .iter()
            .enumerate()
            .filter(|&(_, &ink)| ink)
            .filter_map(move |(i, _)| {
                let x = u32::try_from(i % width as usize).ok()?;
                let y = u32::try_from(i / width as usize).ok()?;
                Some(Point::new(x, y))
            })
    }

    /// Maximal ink runs on row `y`, sorted by start column.
    #[must_use]
    pub fn row_runs(&self, y: u32) -> Vec<Run> {
        let mut runs = Vec::new();
        if y >= self.height {
            return runs;
        }
        let mut current: Option<u32> = None;
        for x in 0..self.width {
            match (self.is_ink(x, y), current) {
                (true, None) => current = Some(x),
                (false, Some(start)) => {
                    runs.push(Run {
                        start,
                        length: x - start,
                    });
                    current = None;
                }
                _ => {}
            }
        }
        if let Some(start) = current {
            runs.push(Run {
                start,
                length: self.width - start,
            });
        }
        runs
    }

    /// Alternating same-class runs down column `x`, top to bottom.
    ///
    /// Each entry is `(class, length)`; consecutive entries always differ
    /// in class.
    #[must_use]
    pub fn column_runs(&self, x: u32) -> Vec<(Pixel, u32)> {
        let mut runs: Vec<(Pixel, u32)> = Vec::new();
        if x >= self.width {
            return runs;
        }
        for y in 0..self.height {
            let pixel = self.pixel(x, y);
            match runs.last_mut() {
                Some((class, length)) if *class == pixel => *length += 1,
                _ => runs.push((pixel, 1)),
            }
        }
        runs
    }

    /// Export as a grayscale raster: ink black, background white.
    #[must_use]
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_ink(x, y) {
                Luma([INK_LUMA])
            } else {
                Luma([BACKGROUND_LUMA])
            }
        })
    }
}
