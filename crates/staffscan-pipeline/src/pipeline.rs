//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire analysis in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use staffscan_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let staves = Pipeline::new(png, PipelineConfig::default())
//!     .decode()?
//!     .binarize()
//!     .deskew()
//!     .detect_lines()
//!     .build_staves();
//!
//! println!("{} staves", staves.staves().len());
//! let result = staves.estimate_params().analyze().into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for the fallible decode), carrying the page and the
//! [`AnalysisContext`] built so far. From [`Deskewed`] onward the context
//! travels with the stage and every later stage adds to it.

use image::DynamicImage;
use log::{debug, warn};

use crate::annotate;
use crate::binary::BinaryImage;
use crate::cluster::ClusterSet;
use crate::context::AnalysisContext;
use crate::diagnostics::StageMetrics;
use crate::monochrome;
use crate::params::{StaffParams, estimate_staff_params};
use crate::removal::remove_staff_lines;
use crate::rotate;
use crate::skew::{SkewEstimate, estimate_skew};
use crate::staff::{self, Staff};
use crate::staff_line::{LineDetection, StaffLine, detect_staff_lines};
use crate::symbols::extract_staff_data;
use crate::types::{AnalysisResult, Dimensions, PipelineConfig, PipelineError, RgbImage};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes and config are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: PipelineConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source image and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an unusable config,
    /// [`PipelineError::EmptyInput`] if the source bytes are empty,
    /// [`PipelineError::ImageDecode`] if the image format is unrecognized
    /// or the data is corrupt, and [`PipelineError::InvalidDimensions`]
    /// for an image without pixels.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let image = monochrome::decode(&self.source)?;
        debug!(
            "decoded {}x{} image from {} bytes",
            image.width(),
            image.height(),
            self.source.len()
        );
        Ok(Decoded {
            config: self.config,
            image,
            source_len: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// Call [`binarize`](Self::binarize) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .binarize() to continue"]
pub struct Decoded {
    config: PipelineConfig,
    image: DynamicImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded source image.
    #[must_use]
    pub const fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Decoded image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Metrics describing the decode.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        let Dimensions { width, height } = self.dimensions();
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width,
            height,
            pixel_count: u64::from(width) * u64::from(height),
        }
    }

    /// Threshold the luminance at `config.threshold` and advance.
    pub fn binarize(self) -> Binarized {
        let gray = monochrome::to_luma(&self.image);
        let binary = monochrome::threshold(&gray, self.config.threshold);
        Binarized {
            config: self.config,
            binary,
        }
    }
}

// ───────────────────────── Stage 2: Binarized ────────────────────────

/// Pipeline state after thresholding.
///
/// Call [`deskew`](Self::deskew) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .deskew() to continue"]
pub struct Binarized {
    config: PipelineConfig,
    binary: BinaryImage,
}

impl Binarized {
    /// The thresholded page, before rotation.
    #[must_use]
    pub const fn binary(&self) -> &BinaryImage {
        &self.binary
    }

    /// Metrics describing the thresholding.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Binarize {
            threshold: self.config.threshold,
            ink_pixel_count: self.binary.ink_count(),
            total_pixel_count: u64::from(self.binary.width()) * u64::from(self.binary.height()),
        }
    }

    /// Estimate the skew and rotate the page level, then advance.
    ///
    /// Estimation is skipped when `config.deskew` is off. An estimate
    /// larger than `config.max_skew_degrees` is reported and not applied.
    pub fn deskew(self) -> Deskewed {
        let estimate = if self.config.deskew {
            estimate_skew(&self.binary, self.config.line_slice_size)
        } else {
            SkewEstimate::ZERO
        };

        let applied = if estimate.degrees.abs() > self.config.max_skew_degrees {
            warn!(
                "skew estimate {:.2} deg exceeds the {:.2} deg limit; page left unrotated",
                estimate.degrees, self.config.max_skew_degrees
            );
            0.0
        } else {
            estimate.degrees
        };

        let page = if rotate::is_negligible(self.binary.width(), self.binary.height(), applied) {
            self.binary
        } else {
            rotate::rotate(&self.binary, applied, self.config.rotated_threshold)
        };

        let mut context = AnalysisContext::new(self.config, page.dimensions());
        context.skew_degrees = applied;
        Deskewed {
            context,
            page,
            estimate,
        }
    }
}

// ───────────────────────── Stage 3: Deskewed ─────────────────────────

/// Pipeline state after skew correction.
///
/// Call [`detect_lines`](Self::detect_lines) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .detect_lines() to continue"]
pub struct Deskewed {
    context: AnalysisContext,
    page: BinaryImage,
    estimate: SkewEstimate,
}

impl Deskewed {
    /// The deskewed page.
    #[must_use]
    pub const fn deskewed(&self) -> &BinaryImage {
        &self.page
    }

    /// The raw skew estimate, whether or not it was applied.
    #[must_use]
    pub const fn estimate(&self) -> SkewEstimate {
        self.estimate
    }

    /// The analysis context so far.
    #[must_use]
    pub const fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Metrics describing the skew correction.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Deskew {
            estimated_degrees: self.estimate.degrees,
            applied_degrees: self.context.skew_degrees,
            samples: self.estimate.samples,
            mode_run: self.estimate.mode_run,
            width: self.page.width(),
            height: self.page.height(),
        }
    }

    /// Detect staff lines and advance.
    pub fn detect_lines(self) -> LinesDetected {
        let LineDetection {
            lines,
            segment_count,
            component_count,
            unmerged_count,
        } = detect_staff_lines(&self.page, self.context.config.line_weight_ratio);
        let mut context = self.context;
        context.staff_lines = lines;
        LinesDetected {
            context,
            page: self.page,
            segment_count,
            component_count,
            unmerged_count,
        }
    }
}

// ───────────────────────── Stage 4: LinesDetected ────────────────────

/// Pipeline state after staff-line detection.
///
/// Call [`build_staves`](Self::build_staves) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .build_staves() to continue"]
pub struct LinesDetected {
    context: AnalysisContext,
    page: BinaryImage,
    segment_count: usize,
    component_count: usize,
    unmerged_count: usize,
}

impl LinesDetected {
    /// Detected staff lines, top to bottom.
    #[must_use]
    pub fn staff_lines(&self) -> &[StaffLine] {
        &self.context.staff_lines
    }

    /// Metrics describing the line search.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::LineDetection {
            segment_count: self.segment_count,
            component_count: self.component_count,
            unmerged_count: self.unmerged_count,
            line_count: self.context.staff_lines.len(),
        }
    }

    /// Group lines into staves and advance.
    pub fn build_staves(self) -> StavesBuilt {
        let mut context = self.context;
        context.staves = staff::build_staves(
            &context.staff_lines,
            &self.page,
            context.config.lines_per_staff,
        );
        StavesBuilt {
            context,
            page: self.page,
        }
    }
}

// ───────────────────────── Stage 5: StavesBuilt ──────────────────────

/// Pipeline state after staff construction.
///
/// Call [`estimate_params`](Self::estimate_params) to advance to the
/// next stage.
#[must_use = "pipeline stages are consumed by advancing; call .estimate_params() to continue"]
pub struct StavesBuilt {
    context: AnalysisContext,
    page: BinaryImage,
}

impl StavesBuilt {
    /// Complete staves, top to bottom.
    #[must_use]
    pub fn staves(&self) -> &[Staff] {
        &self.context.staves
    }

    /// Metrics describing the grouping.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        let grouped = self.context.staves.len() * self.context.config.lines_per_staff;
        StageMetrics::StaffConstruction {
            staff_count: self.context.staves.len(),
            leftover_lines: self.context.staff_lines.len().saturating_sub(grouped),
        }
    }

    /// Estimate line thickness and spacing, compute density core points
    /// when `config.compute_clusters` is set, and advance.
    pub fn estimate_params(self) -> ParamsEstimated {
        let mut context = self.context;
        context.params = estimate_staff_params(&self.page);
        if context.config.compute_clusters {
            context.clusters = context.params.map(|p| {
                ClusterSet::from_space_height(
                    &self.page,
                    &p.space_height,
                    context.config.cluster_radius_factor,
                    context.config.cluster_density_factor,
                )
            });
        }
        ParamsEstimated {
            context,
            page: self.page,
        }
    }
}

// ───────────────────────── Stage 6: ParamsEstimated ──────────────────

/// Pipeline state after parameter estimation.
///
/// Call [`analyze`](Self::analyze) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .analyze() to continue"]
pub struct ParamsEstimated {
    context: AnalysisContext,
    page: BinaryImage,
}

impl ParamsEstimated {
    /// Estimated staff parameters, if the page had enough ink.
    #[must_use]
    pub const fn params(&self) -> Option<&StaffParams> {
        self.context.params.as_ref()
    }

    /// Metrics describing the estimation.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::ParamEstimation {
            line_height: self.context.line_height(),
            space_height: self.context.space_height(),
            core_point_count: self
                .context
                .clusters
                .as_ref()
                .map(|c| c.core_points().len()),
        }
    }

    /// Remove staff lines, extract symbol geometry, render the annotated
    /// page and advance.
    ///
    /// Removal and extraction need staff parameters; without them both
    /// are skipped.
    pub fn analyze(self) -> Analyzed {
        let mut context = self.context;
        let Some(params) = context.params else {
            debug!("no staff parameters; skipping staff removal and symbol extraction");
            let annotated = annotate::render(&self.page, &context);
            return Analyzed {
                context,
                page: self.page,
                removed: None,
                erased: None,
                annotated,
            };
        };

        let (removed, erased) = if context.config.remove_staff_lines {
            let removal = remove_staff_lines(&self.page, &context.staves, &params);
            (Some(removal.image), Some(removal.erased))
        } else {
            (None, None)
        };

        if context.config.extract_symbols {
            let source = removed.as_ref().unwrap_or(&self.page);
            context.staff_data = context
                .staves
                .iter()
                .map(|s| extract_staff_data(source, s, &params))
                .collect();
        }

        let annotated = annotate::render(&self.page, &context);
        Analyzed {
            context,
            page: self.page,
            removed,
            erased,
            annotated,
        }
    }
}

// ───────────────────────── Stage 7: Analyzed ─────────────────────────

/// Pipeline state after analysis, the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`AnalysisResult`].
#[must_use = "call .into_result() to extract the AnalysisResult"]
pub struct Analyzed {
    context: AnalysisContext,
    page: BinaryImage,
    removed: Option<BinaryImage>,
    erased: Option<u64>,
    annotated: RgbImage,
}

impl Analyzed {
    /// The staff-removed page, if removal ran.
    #[must_use]
    pub const fn removed(&self) -> Option<&BinaryImage> {
        self.removed.as_ref()
    }

    /// The annotated rendering.
    #[must_use]
    pub const fn annotated(&self) -> &RgbImage {
        &self.annotated
    }

    /// The complete analysis context.
    #[must_use]
    pub const fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Metrics describing removal and extraction.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        let data = &self.context.staff_data;
        StageMetrics::Analysis {
            erased_pixel_count: self.erased,
            symbol_region_count: data.iter().map(|d| d.symbol_rects.len()).sum(),
            note_head_count: data.iter().map(|d| d.note_head_segments.len()).sum(),
            stem_count: data.iter().map(|d| d.stem_segments.len()).sum(),
        }
    }

    /// Consume the pipeline and return the [`AnalysisResult`].
    #[must_use]
    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            binary: self.page,
            removed: self.removed,
            annotated: self.annotated,
            context: self.context,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 8;

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// Each stage struct implements it, and [`Stage`] delegates to whichever
/// variant it holds.
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"deskew"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `7` for
    /// Analyzed).
    const INDEX: usize;

    /// Stage-specific metrics for diagnostics; `None` for [`Pending`],
    /// which has not processed anything yet.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(stage))` on success, `Ok(None)` if already at
    /// the final stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when decoding fails.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages and return the final [`AnalysisResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a remaining fallible stage fails.
    fn complete(self) -> Result<AnalysisResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Decoded(self.decode()?)))
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Binarized(self.binarize())))
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        self.binarize().complete()
    }
}

impl PipelineStage for Binarized {
    const NAME: &str = "binarize";
    const INDEX: usize = 2;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Deskewed(self.deskew())))
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        self.deskew().complete()
    }
}

impl PipelineStage for Deskewed {
    const NAME: &str = "deskew";
    const INDEX: usize = 3;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::LinesDetected(self.detect_lines())))
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        self.detect_lines().complete()
    }
}

impl PipelineStage for LinesDetected {
    const NAME: &str = "lines";
    const INDEX: usize = 4;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::StavesBuilt(self.build_staves())))
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        self.build_staves().complete()
    }
}

impl PipelineStage for StavesBuilt {
    const NAME: &str = "staves";
    const INDEX: usize = 5;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::ParamsEstimated(self.estimate_params())))
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        self.estimate_params().complete()
    }
}

impl PipelineStage for ParamsEstimated {
    const NAME: &str = "params";
    const INDEX: usize = 6;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Analyzed(self.analyze())))
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        self.analyze().complete()
    }
}

impl PipelineStage for Analyzed {
    const NAME: &str = "analyze";
    const INDEX: usize = 7;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<AnalysisResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// Type-erased pipeline state, for driving the pipeline in a loop.
///
/// ```rust
/// # use staffscan_pipeline::{Pipeline, PipelineConfig, PipelineError};
/// # use staffscan_pipeline::pipeline::{Advance, Stage};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let mut stage: Stage = Pipeline::new(png, PipelineConfig::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`Binarized`].
    Binarized(Binarized),
    /// See [`Deskewed`].
    Deskewed(Deskewed),
    /// See [`LinesDetected`].
    LinesDetected(LinesDetected),
    /// See [`StavesBuilt`].
    StavesBuilt(StavesBuilt),
    /// See [`ParamsEstimated`].
    ParamsEstimated(ParamsEstimated),
    /// See [`Analyzed`].
    Analyzed(Analyzed),
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage and is returned unchanged.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::Binarized(s) => s.$method($($arg),*),
            Self::Deskewed(s) => s.$method($($arg),*),
            Self::LinesDetected(s) => s.$method($($arg),*),
            Self::StavesBuilt(s) => s.$method($($arg),*),
            Self::ParamsEstimated(s) => s.$method($($arg),*),
            Self::Analyzed(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// Stage-specific metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Analyzed(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(next_stage))` on success, `Ok(None)` if
    /// already complete (the `Analyzed` value is consumed).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Only the analyzed stage returns Ok(None) from next(), and the
        // is_complete() guard above returns before reaching it.
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<AnalysisResult, PipelineError> {
        delegate!(self, complete)
    }
}

// `PipelineStage`'s associated constants are not callable through
// `self`, so the delegate macro goes through this helper.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

macro_rules! stage_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Stage {
                fn from(s: $variant) -> Self {
                    Self::$variant(s)
                }
            }
        )*
    };
}

stage_from!(
    Pending,
    Decoded,
    Binarized,
    Deskewed,
    LinesDetected,
    StavesBuilt,
    ParamsEstimated,
    Analyzed,
);

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental page analysis pipeline.
///
/// Created via [`Pipeline::new`], which stores the source image and
/// config without doing any processing. Each stage method consumes the
/// current state and returns the next, making it a compile-time error
/// to skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed: the bytes and config are simply
    /// stored. Call [`.decode()`](Pending::decode) (or convert to a
    /// [`Stage`] and loop) to begin processing.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }
}
