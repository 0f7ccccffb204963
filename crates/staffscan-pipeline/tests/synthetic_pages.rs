//! Integration tests: run synthetic score pages through the pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use staffscan_pipeline::binary::{BinaryImage, Pixel};
use staffscan_pipeline::params::estimate_staff_params;
use staffscan_pipeline::rotate::rotate;
use staffscan_pipeline::skew::{LINE_SLICE_SIZE, estimate_skew};
use staffscan_pipeline::staff::build_staves;
use staffscan_pipeline::staff_line::detect_staff_lines;
use staffscan_pipeline::{PipelineConfig, process};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Horizontal staff lines `thickness` rows thick, one every `period`
/// rows from `top`, spanning columns `left..right`.
fn staff_lines(
    width: u32,
    height: u32,
    (left, right): (u32, u32),
    top: u32,
    count: u32,
    thickness: u32,
    period: u32,
) -> BinaryImage {
    BinaryImage::from_fn(width, height, |x, y| {
        (left..right).contains(&x)
            && y >= top
            && y < top + count * period
            && (y - top) % period < thickness
    })
}

fn fill(image: &mut BinaryImage, (x0, y0): (u32, u32), (x1, y1): (u32, u32)) {
    for y in y0..y1 {
        for x in x0..x1 {
            image.set(x, y, Pixel::Ink);
        }
    }
}

/// `count` note heads 13×10 px in the spaces of the staff whose first
/// line starts at `top`, each with a 4 px stem rising above it.
fn stemmed_notes(image: &mut BinaryImage, top: u32, count: u32) {
    for i in 0..count {
        let left = 60 + i * 52;
        let head_top = top + 17 * (i % 4) + 5;
        fill(image, (left, head_top), (left + 13, head_top + 10));
        fill(image, (left + 10, head_top - 35), (left + 14, head_top + 8));
    }
}

/// Two five-line staves, each carrying twelve stemmed notes.
fn dense_score() -> BinaryImage {
    let mut page = BinaryImage::new(700, 330);
    for top in [60, 200] {
        let staff = staff_lines(700, 330, (30, 670), top, 5, 3, 17);
        for p in staff.ink_points() {
            page.set(p.x, p.y, Pixel::Ink);
        }
        stemmed_notes(&mut page, top, 12);
    }
    page
}

fn png_bytes(image: &BinaryImage) -> Vec<u8> {
    let gray = image.to_gray();
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        gray.as_raw(),
        gray.width(),
        gray.height(),
        image::ExtendedColorType::L8,
    )
    .unwrap();
    buf
}

#[test]
fn skew_estimate_inverts_page_rotation() {
    init_logging();
    let level = staff_lines(420, 260, (40, 380), 40, 8, 3, 22);
    for angle in [-40.0, -15.0, 0.0, 10.0, 25.0, 40.0] {
        let skewed = rotate(&level, angle, PipelineConfig::DEFAULT_ROTATED_THRESHOLD);
        let estimate = estimate_skew(&skewed, LINE_SLICE_SIZE);
        assert!(
            (estimate.degrees + angle).abs() < 1.0,
            "page rotated by {angle} deg: expected ~{:.1}, got {:.2}",
            -angle,
            estimate.degrees
        );
    }
}

#[test]
fn staff_params_match_drawn_geometry() {
    init_logging();
    for (thickness, gap) in [(1, 8), (2, 10), (3, 14), (4, 20)] {
        let page = staff_lines(300, 40 + 5 * (thickness + gap) + 40, (20, 280), 40, 5, thickness, thickness + gap);
        let params = estimate_staff_params(&page).expect("params for a drawn staff");
        assert_eq!(params.line_height.dominant, thickness, "thickness for ({thickness}, {gap})");
        assert_eq!(params.space_height.dominant, gap, "spacing for ({thickness}, {gap})");
    }
}

#[test]
fn lines_group_into_whole_staves() {
    init_logging();
    for (count, expected) in [(5, 1), (10, 2), (12, 2), (4, 0)] {
        let page = staff_lines(260, 40 + count * 14 + 40, (20, 240), 40, count, 2, 14);
        let lines = detect_staff_lines(&page, PipelineConfig::DEFAULT_LINE_WEIGHT_RATIO).lines;
        assert_eq!(lines.len(), count as usize);
        let staves = build_staves(&lines, &page, PipelineConfig::DEFAULT_LINES_PER_STAFF);
        assert_eq!(staves.len(), expected, "{count} lines");
        assert!(staves.iter().all(|s| s.lines.len() == 5));
    }
}

#[test]
fn level_score_is_fully_analyzed() {
    init_logging();
    // Staff lines 3 px thick, 14 px apart; a note head in the second
    // space with a stem rising above the staff.
    let mut page = staff_lines(400, 200, (30, 370), 50, 5, 3, 17);
    fill(&mut page, (150, 70), (166, 84));
    fill(&mut page, (164, 20), (168, 84));

    let result = process(&png_bytes(&page), &PipelineConfig::default()).unwrap();
    let ctx = &result.context;
    assert_eq!(ctx.staff_count(), 1);
    assert_eq!(ctx.staff_lines.len(), 5);
    assert_eq!(ctx.line_height().map(|r| r.dominant), Some(3));
    assert_eq!(ctx.space_height().map(|r| r.dominant), Some(14));

    let staff = &ctx.staves[0];
    assert_eq!(staff.staff_bounding_rect.top, 50);
    assert_eq!(staff.staff_bounding_rect.bottom, 120);
    // The stem pulls the symbol box above the first line.
    assert_eq!(staff.bounding_rect.top, 20);

    let removed = result.removed.expect("staff removal ran");
    assert!(!removed.is_ink(60, 51), "staff line survived");
    assert!(removed.is_ink(158, 76), "note head was erased");
    assert!(removed.is_ink(165, 30), "stem was erased");

    let data = &ctx.staff_data[0];
    assert!(!data.symbol_rects.is_empty());
    assert!(!data.stem_segments.is_empty());
}

#[test]
fn skewed_score_is_straightened() {
    init_logging();
    let level = staff_lines(400, 220, (30, 370), 60, 5, 3, 17);
    let skewed = rotate(&level, 4.0, PipelineConfig::DEFAULT_ROTATED_THRESHOLD);

    let result = process(&png_bytes(&skewed), &PipelineConfig::default()).unwrap();
    let ctx = &result.context;
    assert!(
        (ctx.skew_degrees + 4.0).abs() < 1.0,
        "expected ~-4 deg, got {:.2}",
        ctx.skew_degrees
    );
    assert_eq!(ctx.staff_count(), 1);
    assert_eq!(ctx.staff_lines.len(), 5);
}

#[test]
fn oversized_skew_is_not_applied() {
    init_logging();
    let level = staff_lines(300, 200, (30, 270), 50, 5, 3, 17);
    let skewed = rotate(&level, 20.0, PipelineConfig::DEFAULT_ROTATED_THRESHOLD);
    let config = PipelineConfig {
        max_skew_degrees: 5.0,
        ..PipelineConfig::default()
    };
    let result = process(&png_bytes(&skewed), &config).unwrap();
    assert!(result.context.skew_degrees.abs() < f64::EPSILON);
    assert_eq!(
        (result.binary.width(), result.binary.height()),
        (skewed.width(), skewed.height())
    );
}

#[test]
fn dense_notes_leave_level_score_unrotated() {
    init_logging();
    let page = dense_score();
    let estimate = estimate_skew(&page, LINE_SLICE_SIZE);
    assert!(estimate.degrees.abs() < 1.0, "got {:.2}", estimate.degrees);

    let result = process(&png_bytes(&page), &PipelineConfig::default()).unwrap();
    let ctx = &result.context;
    assert!(ctx.skew_degrees.abs() < 1.0, "got {:.2}", ctx.skew_degrees);
    assert_eq!(ctx.staff_count(), 2);
    assert_eq!(ctx.staff_lines.len(), 10);
}

#[test]
fn dense_skewed_score_is_straightened() {
    init_logging();
    let skewed = rotate(&dense_score(), 3.0, PipelineConfig::DEFAULT_ROTATED_THRESHOLD);

    let result = process(&png_bytes(&skewed), &PipelineConfig::default()).unwrap();
    let ctx = &result.context;
    assert!(
        (ctx.skew_degrees + 3.0).abs() < 1.0,
        "expected ~-3 deg, got {:.2}",
        ctx.skew_degrees
    );
    assert_eq!(ctx.staff_count(), 2);
    assert_eq!(ctx.staff_lines.len(), 10);
}
