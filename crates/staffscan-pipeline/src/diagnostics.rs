//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning on real scans. [`process_with_diagnostics`] runs the
//! staged pipeline and records every transition.
//!
//! The library does no I/O and reads no clock of its own: callers pass a
//! [`Clock`]. Durations are serialized as fractional seconds (`f64`) for
//! JSON compatibility, since `std::time::Duration` does not implement
//! serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{AnalysisResult, PipelineConfig, PipelineError, Range};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: thresholding.
    pub binarize: StageDiagnostics,
    /// Stage 3: skew estimation and rotation.
    pub deskew: StageDiagnostics,
    /// Stage 4: staff-line detection.
    pub line_detection: StageDiagnostics,
    /// Stage 5: staff grouping and bounding boxes.
    pub staff_construction: StageDiagnostics,
    /// Stage 6: line/space estimation and optional clustering.
    pub param_estimation: StageDiagnostics,
    /// Stage 7: staff removal, symbol extraction, annotation.
    pub analysis: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Thresholding metrics.
    Binarize {
        /// Luminance threshold used.
        threshold: u8,
        /// Number of ink pixels.
        ink_pixel_count: u64,
        /// Total pixel count.
        total_pixel_count: u64,
    },
    /// Skew estimation and rotation metrics.
    Deskew {
        /// Estimated correction in degrees.
        estimated_degrees: f64,
        /// Rotation actually applied in degrees.
        applied_degrees: f64,
        /// Slope samples collected.
        samples: usize,
        /// Samples in the modal bucket run.
        mode_run: usize,
        /// Page width after rotation.
        width: u32,
        /// Page height after rotation.
        height: u32,
    },
    /// Staff-line detection metrics.
    LineDetection {
        /// Row segments searched.
        segment_count: usize,
        /// Chain components found.
        component_count: usize,
        /// Lines before merging adjacent ones.
        unmerged_count: usize,
        /// Lines after merging.
        line_count: usize,
    },
    /// Staff construction metrics.
    StaffConstruction {
        /// Complete staves built.
        staff_count: usize,
        /// Lines left over after the last complete staff.
        leftover_lines: usize,
    },
    /// Parameter estimation metrics.
    ParamEstimation {
        /// Staff line thickness, if estimated.
        line_height: Option<Range>,
        /// Staff spacing, if estimated.
        space_height: Option<Range>,
        /// Core points found, if clustering ran.
        core_point_count: Option<usize>,
    },
    /// Removal and symbol extraction metrics.
    Analysis {
        /// Pixels erased by staff removal, if it ran.
        erased_pixel_count: Option<u64>,
        /// Symbol regions across all staves.
        symbol_region_count: usize,
        /// Note-head segments across all staves.
        note_head_count: usize,
        /// Stem segments across all staves.
        stem_count: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Deskewed page width in pixels.
    pub image_width: u32,
    /// Deskewed page height in pixels.
    pub image_height: u32,
    /// Rotation applied in degrees.
    pub skew_degrees: f64,
    /// Staff lines detected.
    pub line_count: usize,
    /// Complete staves.
    pub staff_count: usize,
}

impl PipelineDiagnostics {
    /// Per-stage entries in pipeline order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Decode", &self.decode),
            ("Binarize", &self.binarize),
            ("Deskew", &self.deskew),
            ("Line Detection", &self.line_detection),
            ("Staff Construction", &self.staff_construction),
            ("Param Estimation", &self.param_estimation),
            ("Analysis", &self.analysis),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Page: {}x{} (deskewed by {:.3} deg)",
            self.summary.image_width, self.summary.image_height, self.summary.skew_degrees,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Staff lines: {}  |  Staves: {}",
            self.summary.line_count, self.summary.staff_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_range(range: Option<&Range>) -> String {
    range.map_or_else(
        || "-".to_string(),
        |r| format!("{}[{}..{}]", r.dominant, r.min, r.max),
    )
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Binarize {
            threshold,
            ink_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *ink_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("t={threshold} ink={ink_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Deskew {
            estimated_degrees,
            applied_degrees,
            samples,
            mode_run,
            width,
            height,
        } => format!(
            "est={estimated_degrees:.3} applied={applied_degrees:.3} samples={samples} mode={mode_run} -> {width}x{height}",
        ),
        StageMetrics::LineDetection {
            segment_count,
            component_count,
            unmerged_count,
            line_count,
        } => format!(
            "{segment_count} segments, {component_count} components, {unmerged_count}->{line_count} lines",
        ),
        StageMetrics::StaffConstruction {
            staff_count,
            leftover_lines,
        } => format!("{staff_count} staves, {leftover_lines} leftover lines"),
        StageMetrics::ParamEstimation {
            line_height,
            space_height,
            core_point_count,
        } => {
            let core = core_point_count.map_or_else(String::new, |n| format!(" core={n}"));
            format!(
                "line={} space={}{core}",
                format_range(line_height.as_ref()),
                format_range(space_height.as_ref()),
            )
        }
        StageMetrics::Analysis {
            erased_pixel_count,
            symbol_region_count,
            note_head_count,
            stem_count,
        } => {
            let erased = erased_pixel_count.map_or_else(|| "-".to_string(), |n| n.to_string());
            format!(
                "erased={erased} regions={symbol_region_count} heads={note_head_count} stems={stem_count}",
            )
        }
    }
}

/// Run one stage transition, measuring its wall-clock duration.
fn timed<T, C: Clock>(
    clock: &C,
    run: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<(T, Duration), PipelineError> {
    let start = clock.now();
    let out = run()?;
    Ok((out, clock.elapsed(&start)))
}

/// Run the full pipeline, recording per-stage diagnostics.
///
/// # Errors
///
/// Returns [`PipelineError`] under the same conditions as
/// [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(AnalysisResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();
    let pending = Pipeline::new(image_bytes.to_vec(), config.clone());

    let (decoded, duration) = timed(clock, || pending.decode())?;
    let decode = StageDiagnostics {
        duration,
        metrics: decoded.stage_metrics(),
    };
    let (binarized, duration) = timed(clock, || Ok(decoded.binarize()))?;
    let binarize = StageDiagnostics {
        duration,
        metrics: binarized.stage_metrics(),
    };
    let (deskewed, duration) = timed(clock, || Ok(binarized.deskew()))?;
    let deskew = StageDiagnostics {
        duration,
        metrics: deskewed.stage_metrics(),
    };
    let (lines, duration) = timed(clock, || Ok(deskewed.detect_lines()))?;
    let line_detection = StageDiagnostics {
        duration,
        metrics: lines.stage_metrics(),
    };
    let (staves, duration) = timed(clock, || Ok(lines.build_staves()))?;
    let staff_construction = StageDiagnostics {
        duration,
        metrics: staves.stage_metrics(),
    };
    let (estimated, duration) = timed(clock, || Ok(staves.estimate_params()))?;
    let param_estimation = StageDiagnostics {
        duration,
        metrics: estimated.stage_metrics(),
    };
    let (analyzed, duration) = timed(clock, || Ok(estimated.analyze()))?;
    let analysis = StageDiagnostics {
        duration,
        metrics: analyzed.stage_metrics(),
    };

    let result = analyzed.into_result();
    let total_duration = clock.elapsed(&total_start);
    let summary = PipelineSummary {
        image_width: result.context.dimensions.width,
        image_height: result.context.dimensions.height,
        skew_degrees: result.context.skew_degrees,
        line_count: result.context.staff_lines.len(),
        staff_count: result.context.staff_count(),
    };

    Ok((
        result,
        PipelineDiagnostics {
            decode,
            binarize,
            deskew,
            line_detection,
            staff_construction,
            param_estimation,
            analysis,
            total_duration,
            summary,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Deterministic clock: every reading advances by one millisecond.
    struct StepClock {
        ticks: Cell<u64>,
    }

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get() + 1;
            self.ticks.set(t);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn staff_png() -> Vec<u8> {
        let img = image::GrayImage::from_fn(240, 120, |x, y| {
            let on_line = (20..220).contains(&x) && (30..90).contains(&y) && (y - 30) % 12 < 2;
            image::Luma([if on_line { 0 } else { 255 }])
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        assert!((duration_ms(d) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let clock = StepClock {
            ticks: Cell::new(0),
        };
        let (result, diag) =
            process_with_diagnostics(&staff_png(), &PipelineConfig::default(), &clock).unwrap();
        assert_eq!(result.context.staff_count(), 1);
        assert_eq!(diag.summary.staff_count, 1);
        assert_eq!(diag.summary.line_count, 5);
        assert!(matches!(
            diag.decode.metrics,
            StageMetrics::Decode {
                width: 240,
                height: 120,
                ..
            }
        ));
        assert!(matches!(
            diag.line_detection.metrics,
            StageMetrics::LineDetection { line_count: 5, .. }
        ));
        for (name, stage) in diag.stages() {
            assert!(stage.duration > Duration::ZERO, "{name} was not timed");
        }
        assert!(diag.total_duration >= diag.analysis.duration);
    }

    #[test]
    fn errors_propagate() {
        let clock = StepClock {
            ticks: Cell::new(0),
        };
        assert!(matches!(
            process_with_diagnostics(&[], &PipelineConfig::default(), &clock),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn report_and_json() {
        let clock = StepClock {
            ticks: Cell::new(0),
        };
        let (_, diag) =
            process_with_diagnostics(&staff_png(), &PipelineConfig::default(), &clock).unwrap();
        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Line Detection"));
        assert!(report.contains("Staves: 1"));

        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.line_detection.metrics, diag.line_detection.metrics);
        assert_eq!(back.decode.duration, diag.decode.duration);
    }
}
