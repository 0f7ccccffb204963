//! Shared types for the staffscan analysis pipeline.

use serde::{Deserialize, Serialize};

use crate::binary::BinaryImage;
use crate::context::AnalysisContext;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// annotated output without depending on `image` directly.
pub use image::RgbImage;

/// A pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle with inclusive pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Leftmost column.
    pub left: u32,
    /// Topmost row.
    pub top: u32,
    /// Rightmost column (inclusive).
    pub right: u32,
    /// Bottom row (inclusive).
    pub bottom: u32,
}

impl Rect {
    /// Create a rectangle from inclusive bounds.
    ///
    /// Bounds are reordered if given swapped, so the result is never
    /// inverted.
    #[must_use]
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// The 1×1 rectangle covering a single pixel.
    #[must_use]
    pub const fn from_point(p: Point) -> Self {
        Self {
            left: p.x,
            top: p.y,
            right: p.x,
            bottom: p.y,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Whether `p` lies inside the rectangle (bounds inclusive).
    #[must_use]
    pub const fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Smallest rectangle covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Whether the column spans of the two rectangles share any column.
    #[must_use]
    pub const fn overlaps_horizontally(&self, other: &Self) -> bool {
        self.left <= other.right && other.left <= self.right
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A tolerance interval with a representative value.
///
/// Used for staff-line thickness and inter-line spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Smallest accepted value.
    pub min: u32,
    /// Largest accepted value.
    pub max: u32,
    /// The representative value (mode or midpoint).
    pub dominant: u32,
}

impl Range {
    /// A range whose dominant value is the midpoint of its bounds.
    #[must_use]
    pub fn new(min: u32, max: u32) -> Self {
        let (min, max) = (min.min(max), min.max(max));
        Self {
            min,
            max,
            dominant: min + (max - min) / 2,
        }
    }

    /// A ±10% range around a modal value.
    ///
    /// The tolerance is `round(0.1 * mode)`. A mode of 1 is special-cased
    /// to `[1, 2]` so single-pixel lines still admit their common
    /// two-pixel rasterization.
    #[must_use]
    pub fn around_mode(mode: u32) -> Self {
        if mode <= 1 {
            return Self {
                min: 1,
                max: 2,
                dominant: 1,
            };
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "tolerance is a small non-negative pixel count"
        )]
        let tolerance = (f64::from(mode) * 0.1).round() as u32;
        Self {
            min: mode - tolerance,
            max: mode + tolerance,
            dominant: mode,
        }
    }

    /// Whether `value` lies inside the range (bounds inclusive).
    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Configuration for the analysis pipeline.
///
/// All parameters have defaults tuned for scanned pages at print resolution; the
/// `DEFAULT_*` constants are exposed so front-ends can derive their own
/// defaults from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PipelineConfig {
    /// Luminance threshold for the initial binarization. A pixel is ink
    /// iff its gray value is at most this.
    pub threshold: u8,

    /// Threshold used to re-binarize after rotation. Higher than
    /// `threshold` so interpolated line edges stay ink.
    pub rotated_threshold: u8,

    /// Whether to estimate and correct page skew.
    pub deskew: bool,

    /// Skew estimates with a larger magnitude (degrees) are not applied.
    pub max_skew_degrees: f64,

    /// Minimum number of traced points for a trace to yield a slope sample.
    pub line_slice_size: usize,

    /// Segments whose chain weight is below this fraction of the global
    /// maximum are discarded during staff-line assembly.
    pub line_weight_ratio: f64,

    /// Number of staff lines grouped into one staff.
    pub lines_per_staff: usize,

    /// Cluster radius as a fraction of the dominant staff-space height.
    pub cluster_radius_factor: f64,

    /// Core-point density threshold as a fraction of the radius disc area.
    pub cluster_density_factor: f64,

    /// Whether to compute density core points.
    pub compute_clusters: bool,

    /// Whether to erase staff lines.
    pub remove_staff_lines: bool,

    /// Whether to extract per-staff symbol regions.
    pub extract_symbols: bool,
}

impl PipelineConfig {
    /// Default initial binarization threshold.
    pub const DEFAULT_THRESHOLD: u8 = 200;
    /// Default post-rotation binarization threshold.
    pub const DEFAULT_ROTATED_THRESHOLD: u8 = 240;
    /// Default maximum applied skew magnitude in degrees.
    pub const DEFAULT_MAX_SKEW_DEGREES: f64 = 45.0;
    /// Default minimum trace length for a skew sample.
    pub const DEFAULT_LINE_SLICE_SIZE: usize = 20;
    /// Default weight ratio for staff-line pruning.
    pub const DEFAULT_LINE_WEIGHT_RATIO: f64 = 0.9;
    /// Lines in a standard staff.
    pub const DEFAULT_LINES_PER_STAFF: usize = 5;
    /// Default cluster radius factor.
    pub const DEFAULT_CLUSTER_RADIUS_FACTOR: f64 = 0.85;
    /// Default cluster density factor.
    pub const DEFAULT_CLUSTER_DENSITY_FACTOR: f64 = 0.8;

    /// Check that every field holds a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.max_skew_degrees.is_finite() || self.max_skew_degrees < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "max_skew_degrees must be finite and non-negative, got {}",
                self.max_skew_degrees
            )));
        }
        if self.line_slice_size < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "line_slice_size must be at least 2, got {}",
                self.line_slice_size
            )));
        }
        if !(self.line_weight_ratio > 0.0 && self.line_weight_ratio <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "line_weight_ratio must be in (0, 1], got {}",
                self.line_weight_ratio
            )));
        }
        if self.lines_per_staff == 0 {
            return Err(PipelineError::InvalidConfig(
                "lines_per_staff must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("cluster_radius_factor", self.cluster_radius_factor),
            ("cluster_density_factor", self.cluster_density_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            rotated_threshold: Self::DEFAULT_ROTATED_THRESHOLD,
            deskew: true,
            max_skew_degrees: Self::DEFAULT_MAX_SKEW_DEGREES,
            line_slice_size: Self::DEFAULT_LINE_SLICE_SIZE,
            line_weight_ratio: Self::DEFAULT_LINE_WEIGHT_RATIO,
            lines_per_staff: Self::DEFAULT_LINES_PER_STAFF,
            cluster_radius_factor: Self::DEFAULT_CLUSTER_RADIUS_FACTOR,
            cluster_density_factor: Self::DEFAULT_CLUSTER_DENSITY_FACTOR,
            compute_clusters: false,
            remove_staff_lines: true,
            extract_symbols: true,
        }
    }
}

/// Result of running the full analysis pipeline.
///
/// Holds the raster outputs alongside the [`AnalysisContext`] carrying
/// every detected structure and derived parameter.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Deskewed binary page.
    pub binary: BinaryImage,
    /// Page with staff lines erased (`None` when removal was disabled).
    pub removed: Option<BinaryImage>,
    /// Annotated rendering of the detected structures.
    pub annotated: RgbImage,
    /// Detected staves and derived parameters.
    pub context: AnalysisContext,
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image has a zero width or height.
    #[error("image dimensions must be positive, got {width}x{height}")]
    InvalidDimensions {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidDimensions { width: u32, height: u32 },
    InvalidConfig(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidDimensions { width, height } => PipelineErrorProxy::InvalidDimensions {
                width: *width,
                height: *height,
            },
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidDimensions { width, height } => {
                Self::InvalidDimensions { width, height }
            }
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}
