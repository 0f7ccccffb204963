//! Density core-point classification over ink pixels.
//!
//! Every ink pixel's neighbours within a fixed radius are counted with
//! an R*-tree range query. Pixels with no neighbour are dropped; a pixel
//! whose count exceeds the density threshold is a core point. Core
//! points are not grown into labelled clusters.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use log::debug;
use rstar::RTree;

use crate::binary::BinaryImage;
use crate::types::{Point, Range};

/// Neighbour counts for every ink pixel with at least one neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSet {
    radius: f64,
    min_points: f64,
    counts: BTreeMap<Point, usize>,
}

impl ClusterSet {
    /// Count neighbours within `radius` (inclusive) for every ink pixel.
    #[must_use]
    pub fn compute(image: &BinaryImage, radius: f64, min_points: f64) -> Self {
        let points: Vec<Point> = image.ink_points().collect();
        let tree = RTree::bulk_load(points.iter().map(|&p| as_coords(p)).collect());
        let max_squared = radius * radius;

        let counts: BTreeMap<Point, usize> = points
            .into_iter()
            .filter_map(|p| {
                // The query includes the pixel itself.
                let n = tree
                    .locate_within_distance(as_coords(p), max_squared)
                    .count()
                    .saturating_sub(1);
                (n > 0).then_some((p, n))
            })
            .collect();

        let set = Self {
            radius,
            min_points,
            counts,
        };
        debug!(
            "clusters: radius {radius:.2}, min points {min_points:.1}, {} points kept, {} core",
            set.len(),
            set.core_count()
        );
        set
    }

    /// Derive radius and density threshold from the staff space height:
    /// `radius = radius_factor · space`, `min_points = density_factor · π · radius²`.
    #[must_use]
    pub fn from_space_height(
        image: &BinaryImage,
        space_height: &Range,
        radius_factor: f64,
        density_factor: f64,
    ) -> Self {
        let radius = radius_factor * f64::from(space_height.dominant);
        let min_points = density_factor * PI * radius * radius;
        Self::compute(image, radius, min_points)
    }

    /// Neighbourhood radius in pixels.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Core-point density threshold.
    #[must_use]
    pub const fn min_points(&self) -> f64 {
        self.min_points
    }

    /// Number of retained points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no point was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Neighbour count of `point`, or `None` if it was not retained.
    #[must_use]
    pub fn neighbor_count(&self, point: Point) -> Option<usize> {
        self.counts.get(&point).copied()
    }

    /// Whether `point` is a core point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn is_core(&self, point: Point) -> bool {
        self.neighbor_count(point)
            .is_some_and(|n| n as f64 > self.min_points)
    }

    /// Core points in row-major order.
    #[must_use]
    pub fn core_points(&self) -> Vec<Point> {
        let mut core: Vec<Point> = self
            .counts
            .keys()
            .copied()
            .filter(|&p| self.is_core(p))
            .collect();
        core.sort_by_key(|p| (p.y, p.x));
        core
    }

    fn core_count(&self) -> usize {
        self.counts.keys().filter(|&&p| self.is_core(p)).count()
    }
}

fn as_coords(p: Point) -> [f64; 2] {
    [f64::from(p.x), f64::from(p.y)]
}
