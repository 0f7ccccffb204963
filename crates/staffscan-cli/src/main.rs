//! staffscan: analyze a scanned score page and report per-stage diagnostics.
//!
//! Runs the staff-detection pipeline on a given image file with
//! configurable parameters, printing per-stage timings and counts.
//! Useful for:
//!
//! - Checking how many staves and lines a page yields
//! - Tuning the binarization threshold and line weight ratio
//! - Inspecting staff removal and symbol extraction visually
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin staffscan -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{LevelFilter, info};
use staffscan_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use staffscan_pipeline::{AnalysisResult, PipelineConfig};

/// Staff detection and staff-line removal for scanned sheet music.
///
/// Runs the analysis pipeline on a given image with configurable
/// parameters and prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "staffscan", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP, TIFF).
    image_path: PathBuf,

    /// Luminance threshold: pixels at or below it are ink.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Threshold for re-binarizing after rotation.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_ROTATED_THRESHOLD)]
    rotated_threshold: u8,

    /// Skip skew estimation and rotation.
    #[arg(long)]
    no_deskew: bool,

    /// Largest skew correction applied, in degrees.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_SKEW_DEGREES)]
    max_skew: f64,

    /// Minimum traced points for a skew sample.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_LINE_SLICE_SIZE, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(2..))]
    line_slice_size: usize,

    /// Fraction of the heaviest segment weight a staff line must reach.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_LINE_WEIGHT_RATIO)]
    line_weight_ratio: f64,

    /// Lines that make up one staff.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_LINES_PER_STAFF, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    lines_per_staff: usize,

    /// Compute density core points.
    #[arg(long)]
    clusters: bool,

    /// Keep staff lines in place.
    #[arg(long)]
    no_removal: bool,

    /// Skip symbol region and projection extraction.
    #[arg(long)]
    no_symbols: bool,

    /// Write the annotated page as PNG.
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Write the staff-removed page as PNG.
    #[arg(long)]
    removed: Option<PathBuf>,

    /// Write the deskewed binary page as PNG.
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Write the analysis context (staves, parameters, symbols) as JSON.
    #[arg(long)]
    staves_json: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their default values.
    #[arg(long)]
    config_json: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.  Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        threshold: cli.threshold,
        rotated_threshold: cli.rotated_threshold,
        deskew: !cli.no_deskew,
        max_skew_degrees: cli.max_skew,
        line_slice_size: cli.line_slice_size,
        line_weight_ratio: cli.line_weight_ratio,
        lines_per_staff: cli.lines_per_staff,
        compute_clusters: cli.clusters,
        remove_staff_lines: !cli.no_removal,
        extract_symbols: !cli.no_symbols,
        ..PipelineConfig::default()
    })
}

const fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match staffscan_pipeline::process_with_diagnostics(&image_bytes, &config, &StdClock) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write outputs on the first run only.
                if run == 0 {
                    write_outputs(&cli, &result);
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Write every requested output file, reporting failures without
/// aborting the run.
fn write_outputs(cli: &Cli, result: &AnalysisResult) {
    if let Some(ref path) = cli.annotated {
        report_write(path, result.annotated.save(path).map_err(|e| e.to_string()));
    }
    if let Some(ref path) = cli.binary {
        report_write(path, result.binary.to_gray().save(path).map_err(|e| e.to_string()));
    }
    if let Some(ref path) = cli.removed {
        match result.removed {
            Some(ref removed) => {
                report_write(path, removed.to_gray().save(path).map_err(|e| e.to_string()));
            }
            None => eprintln!(
                "No staff-removed page to write to {} (removal disabled or no staff parameters)",
                path.display()
            ),
        }
    }
    if let Some(ref path) = cli.staves_json {
        let written = serde_json::to_string_pretty(&result.context)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        report_write(path, written);
    }
}

fn report_write(path: &Path, outcome: Result<(), String>) {
    match outcome {
        Ok(()) => info!("wrote {}", path.display()),
        Err(e) => eprintln!("Error writing {}: {e}", path.display()),
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| d.decode.duration),
        ("Binarize", |d| d.binarize.duration),
        ("Deskew", |d| d.deskew.duration),
        ("Line Detection", |d| d.line_detection.duration),
        ("Staff Construction", |d| d.staff_construction.duration),
        ("Parameter Estimation", |d| d.param_estimation.duration),
        ("Analysis", |d| d.analysis.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }

    let staves: Vec<usize> = all_diagnostics
        .iter()
        .map(|d| d.summary.staff_count)
        .collect();
    if staves.windows(2).any(|w| w[0] != w[1]) {
        println!();
        println!("Warning: staff count varied across runs: {staves:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("staffscan").chain(args.iter().copied()))
    }

    #[test]
    fn flags_default_to_pipeline_defaults() {
        let cli = parse(&["page.png"]);
        assert_eq!(config_from_cli(&cli), Ok(PipelineConfig::default()));
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&["page.png", "--no-deskew", "--clusters", "--threshold", "128"]);
        let config = config_from_cli(&cli).unwrap_or_default();
        assert!(!config.deskew);
        assert!(config.compute_clusters);
        assert_eq!(config.threshold, 128);
    }

    #[test]
    fn config_json_fills_missing_fields() {
        let cli = parse(&["page.png", "--config-json", r#"{"lines_per_staff": 6}"#]);
        let config = config_from_cli(&cli).unwrap_or_default();
        assert_eq!(config.lines_per_staff, 6);
        assert_eq!(config.threshold, PipelineConfig::DEFAULT_THRESHOLD);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = parse(&["page.png", "--config-json", "{"]);
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_level(0), LevelFilter::Warn);
        assert_eq!(log_level(2), LevelFilter::Debug);
        assert_eq!(log_level(9), LevelFilter::Trace);
    }
}
