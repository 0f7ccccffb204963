//! Page skew estimation from traced ink strokes.
//!
//! # Algorithm
//!
//! 1. Scan the page column by column. Every ink pixel not yet visited
//!    seeds a path that advances one column per step, to `(x+1, y)`,
//!    `(x+1, y-1)` or `(x+1, y+1)` in that order of preference, onto ink
//!    no earlier path has taken. Path pixels are cleared in a scratch
//!    copy so no pixel is traced twice.
//! 2. A path that ends with at least `line_slice_size` points yields one
//!    slope sample: the direction of the principal axis of its points,
//!    computed from the 2×2 covariance matrix in closed form. Each point
//!    is a distinct column, so compact symbols narrower than
//!    `line_slice_size` never contribute.
//! 3. The skew is the statistical mode of all samples: slopes are sorted,
//!    bucketed to two decimals, and the raw values of the longest bucket
//!    run are averaged.
//!
//! Paths are followed iteratively, so stack depth does not grow with
//! stroke length.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryImage, Pixel};
use crate::types::Point;

/// Minimum trace length for a slope sample.
pub const LINE_SLICE_SIZE: usize = 20;

/// Outcome of [`estimate_skew`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkewEstimate {
    /// Rotation in degrees that makes the dominant strokes horizontal
    /// when passed to [`crate::rotate::rotate`].
    pub degrees: f64,
    /// Number of slope samples collected.
    pub samples: usize,
    /// Number of samples in the modal bucket run.
    pub mode_run: usize,
}

impl SkewEstimate {
    /// The neutral estimate used for degenerate input.
    pub const ZERO: Self = Self {
        degrees: 0.0,
        samples: 0,
        mode_run: 0,
    };
}

/// Population covariance of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariance {
    /// Variance along x.
    pub xx: f64,
    /// Covariance of x and y.
    pub xy: f64,
    /// Variance along y.
    pub yy: f64,
}

impl Covariance {
    /// Covariance of `points` about their mean; `None` for an empty set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sum_x, sum_y) = points.iter().fold((0.0, 0.0), |(sx, sy), p| {
            (sx + f64::from(p.x), sy + f64::from(p.y))
        });
        let (mean_x, mean_y) = (sum_x / n, sum_y / n);
        let (mut xx, mut xy, mut yy) = (0.0, 0.0, 0.0);
        for p in points {
            let dx = f64::from(p.x) - mean_x;
            let dy = f64::from(p.y) - mean_y;
            xx += dx * dx;
            xy += dx * dy;
            yy += dy * dy;
        }
        Some(Self {
            xx: xx / n,
            xy: xy / n,
            yy: yy / n,
        })
    }

    /// The larger eigenvalue, from `λ² + bλ + c = 0` with
    /// `b = -(xx + yy)` and `c = xx·yy - xy²`.
    #[must_use]
    pub fn largest_eigenvalue(&self) -> f64 {
        let b = -(self.xx + self.yy);
        let c = self.xx.mul_add(self.yy, -(self.xy * self.xy));
        let discriminant = b.mul_add(b, -4.0 * c);
        // Symmetric matrix: the discriminant is (xx-yy)² + 4xy² >= 0 up to rounding.
        debug_assert!(
            discriminant >= -1e-9 * (1.0 + b * b),
            "negative discriminant {discriminant} for a symmetric matrix"
        );
        (-b + discriminant.max(0.0).sqrt()) / 2.0
    }

    /// Slope `dy/dx` of the principal axis.
    ///
    /// Returns 0 when `xy` is zero: the point set is axis-aligned (or
    /// degenerate) and contributes no inclination.
    #[must_use]
    pub fn principal_slope(&self) -> f64 {
        if self.xy == 0.0 {
            return 0.0;
        }
        (self.largest_eigenvalue() - self.xx) / self.xy
    }
}

/// Trace forward paths and return one slope sample per long path.
#[must_use]
pub fn trace_slopes(image: &BinaryImage, line_slice_size: usize) -> Vec<f64> {
    let mut scratch = image.clone();
    let mut samples = Vec::new();
    let mut path: Vec<Point> = Vec::new();

    for x in 0..image.width() {
        for y in 0..image.height() {
            if !scratch.is_ink(x, y) {
                continue;
            }
            path.clear();
            let mut current = Some(Point::new(x, y));
            while let Some(p) = current {
                scratch.set(p.x, p.y, Pixel::Background);
                path.push(p);
                let nx = p.x + 1;
                current = [Some(p.y), p.y.checked_sub(1), p.y.checked_add(1)]
                    .into_iter()
                    .flatten()
                    .find(|&ny| scratch.is_ink(nx, ny))
                    .map(|ny| Point::new(nx, ny));
            }

            if path.len() >= line_slice_size
                && let Some(cov) = Covariance::of(&path)
            {
                samples.push(cov.principal_slope());
            }
        }
    }
    samples
}

/// Statistical mode of slope samples.
///
/// Returns the mean of the raw values in the longest run of equal
/// two-decimal buckets, and that run's length. Ties go to the smallest
/// slope. Returns `None` for an empty list.
#[must_use]
pub fn slope_mode(samples: &[f64]) -> Option<(f64, usize)> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|s| s.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    #[allow(clippy::cast_possible_truncation)]
    let bucket = |s: f64| (s * 100.0).round() as i64;

    let (mut best_start, mut best_len) = (0, 0);
    let mut start = 0;
    while start < sorted.len() {
        let key = bucket(sorted[start]);
        let mut end = start + 1;
        while end < sorted.len() && bucket(sorted[end]) == key {
            end += 1;
        }
        if end - start > best_len {
            best_start = start;
            best_len = end - start;
        }
        start = end;
    }

    let run = &sorted[best_start..best_start + best_len];
    #[allow(clippy::cast_precision_loss)]
    let mean = run.iter().sum::<f64>() / run.len() as f64;
    Some((mean, best_len))
}

/// Estimate the rotation (degrees) that makes the page's strokes
/// horizontal.
///
/// An image with no trace long enough to sample yields
/// [`SkewEstimate::ZERO`].
#[must_use]
pub fn estimate_skew(image: &BinaryImage, line_slice_size: usize) -> SkewEstimate {
    let samples = trace_slopes(image, line_slice_size);
    let Some((slope, mode_run)) = slope_mode(&samples) else {
        warn!(
            "skew estimation found no trace of at least {line_slice_size} points; assuming zero skew"
        );
        return SkewEstimate::ZERO;
    };
    let degrees = slope.atan().to_degrees();
    debug!(
        "skew: {} samples, modal run {mode_run}, slope {slope:.4} -> {degrees:.3} deg",
        samples.len()
    );
    SkewEstimate {
        degrees,
        samples: samples.len(),
        mode_run,
    }
}
