//! Analysis context threaded through the pipeline stages.
//!
//! Each stage reads what earlier stages derived (staff lines, staves,
//! line and space ranges) and adds its own results. The context is owned
//! by the current pipeline stage and handed on when the stage advances,
//! so there is never more than one writer.

use serde::Serialize;

use crate::cluster::ClusterSet;
use crate::params::StaffParams;
use crate::staff::Staff;
use crate::staff_line::StaffLine;
use crate::symbols::StaffData;
use crate::types::{Dimensions, PipelineConfig, Point, Range};

/// Everything derived about one page.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisContext {
    /// Configuration the page was analyzed with.
    pub config: PipelineConfig,
    /// Size of the deskewed page.
    pub dimensions: Dimensions,
    /// Rotation applied to the page in degrees (0 when not deskewed).
    pub skew_degrees: f64,
    /// Every detected staff line, top to bottom.
    #[serde(skip)]
    pub staff_lines: Vec<StaffLine>,
    /// Complete staves, top to bottom.
    pub staves: Vec<Staff>,
    /// Line thickness and spacing, when the page had enough ink.
    pub params: Option<StaffParams>,
    /// Symbol geometry per staff, parallel to `staves`.
    pub staff_data: Vec<StaffData>,
    /// Density core points, when requested.
    #[serde(skip)]
    pub clusters: Option<ClusterSet>,
}

impl AnalysisContext {
    /// An empty context for a page of the given size.
    #[must_use]
    pub const fn new(config: PipelineConfig, dimensions: Dimensions) -> Self {
        Self {
            config,
            dimensions,
            skew_degrees: 0.0,
            staff_lines: Vec::new(),
            staves: Vec::new(),
            params: None,
            staff_data: Vec::new(),
            clusters: None,
        }
    }

    /// Number of complete staves.
    #[must_use]
    pub fn staff_count(&self) -> usize {
        self.staves.len()
    }

    /// Estimated staff line thickness.
    #[must_use]
    pub fn line_height(&self) -> Option<Range> {
        self.params.map(|p| p.line_height)
    }

    /// Estimated staff spacing.
    #[must_use]
    pub fn space_height(&self) -> Option<Range> {
        self.params.map(|p| p.space_height)
    }

    /// Core points, or nothing if clustering did not run.
    #[must_use]
    pub fn core_points(&self) -> Vec<Point> {
        self.clusters
            .as_ref()
            .map(ClusterSet::core_points)
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty() -> AnalysisContext {
        AnalysisContext::new(
            PipelineConfig::default(),
            Dimensions {
                width: 40,
                height: 30,
            },
        )
    }

    #[test]
    fn new_context_is_empty() {
        let ctx = empty();
        assert_eq!(ctx.staff_count(), 0);
        assert!(ctx.line_height().is_none());
        assert!(ctx.core_points().is_empty());
        assert!(ctx.skew_degrees.abs() < f64::EPSILON);
    }

    #[test]
    fn ranges_come_from_params() {
        let mut ctx = empty();
        ctx.params = Some(StaffParams {
            line_height: Range::around_mode(2),
            space_height: Range::around_mode(12),
        });
        assert_eq!(ctx.line_height().map(|r| r.dominant), Some(2));
        assert_eq!(ctx.space_height().map(|r| r.dominant), Some(12));
    }

    #[test]
    fn serializes_without_raster_state() {
        let json = serde_json::to_value(empty()).unwrap();
        assert_eq!(json["dimensions"]["width"], 40);
        assert!(json.get("staff_lines").is_none());
        assert!(json.get("clusters").is_none());
        assert!(json["staves"].as_array().unwrap().is_empty());
    }
}
