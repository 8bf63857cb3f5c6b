//! End-to-end tests for the halftoning pipeline: linearize → (pixelate) →
//! dither → blur → encode, plus file handling and batch isolation.

use halftone::blur::gaussian_blur;
use halftone::dither::dither_monochrome;
use halftone::raster::{luminance, MAX_SAMPLE};
use halftone::resample::block_grid;
use halftone::rng::RowRng;
use halftone::{Bounds, DitherConfig, Gamma, Lut, PixelFormat, Pipeline, Raster};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn no_blur() -> DitherConfig {
    DitherConfig {
        blur_radius: 0.0,
        ..Default::default()
    }
}

/// Smooth horizontal ramp with a little vertical variation, RGBA.
fn gradient(width: u32, height: u32) -> Raster {
    let mut r = Raster::new(Bounds::from_size(width, height), PixelFormat::Rgba);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let v = (x as u32 * 65535 / width.max(1)) as u16;
            let w = (y as u32 * 65535 / height.max(1)) as u16;
            r.pixel_mut(x, y).copy_from_slice(&[v, w, v / 2 + w / 2, MAX_SAMPLE]);
        }
    }
    r
}

fn in_pool<T: Send>(threads: usize, f: impl FnOnce() -> T + Send) -> T {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap()
        .install(f)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_two_by_two_mid_gray() {
    let config = DitherConfig {
        seed: 42,
        gamma: 0.0,
        color_dither: false,
        blur_radius: 0.0,
        x_blocks: 0,
        y_blocks: 0,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).unwrap();
    let src = Raster::filled(
        Bounds::from_size(2, 2),
        PixelFormat::Rgba,
        &[32768, 32768, 32768, MAX_SAMPLE],
    );

    let first = pipeline.render(&src).unwrap();
    let second = pipeline.render(&src).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.format(), PixelFormat::Gray);
    assert_eq!(first.bounds(), Bounds::from_size(2, 2));

    let linear = Lut::decode(Gamma::Srgb)[32768];
    let level = luminance(linear, linear, linear);
    for y in 0..2 {
        let mut rng = RowRng::new(42, y as i64);
        for x in 0..2 {
            let expect = if rng.next_threshold() < level { MAX_SAMPLE } else { 0 };
            assert_eq!(first.gray(x, y), expect, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_deterministic_across_thread_counts() {
    let config = DitherConfig {
        seed: -77,
        color_dither: true,
        x_blocks: 40,
        blur_radius: 2.5,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).unwrap();
    let src = gradient(123, 67);

    let single = in_pool(1, || pipeline.render(&src).unwrap());
    let many = in_pool(8, || pipeline.render(&src).unwrap());
    let again = pipeline.render(&src).unwrap();
    assert_eq!(single, many);
    assert_eq!(single, again);
}

#[test]
fn test_different_seeds_differ() {
    let src = gradient(64, 64);
    let a = Pipeline::new(DitherConfig { seed: 1, ..no_blur() }).unwrap();
    let b = Pipeline::new(DitherConfig { seed: 2, ..no_blur() }).unwrap();
    assert_ne!(a.process(&src).unwrap(), b.process(&src).unwrap());
}

#[test]
fn test_coverage_converges_to_luminance() {
    let pipeline = Pipeline::new(no_blur()).unwrap();
    for srgb in [8000u16, 32768, 52000] {
        let src = Raster::filled(Bounds::from_size(300, 300), PixelFormat::Gray, &[srgb]);
        let out = pipeline.process(&src).unwrap();
        let white = out.samples().iter().filter(|&&s| s == MAX_SAMPLE).count();
        let fraction = white as f64 / out.samples().len() as f64;
        let level = Lut::decode(Gamma::Srgb)[srgb] as f64 / 65535.0;
        assert!(
            (fraction - level).abs() < 0.01,
            "sRGB {srgb}: coverage {fraction} vs level {level}"
        );
    }
}

#[test]
fn test_zero_blur_skips_stage() {
    let src = gradient(50, 30);
    let pipeline = Pipeline::new(no_blur()).unwrap();
    let processed = pipeline.process(&src).unwrap();

    let linear = halftone::transcode::transcode(
        &src,
        &Lut::decode(Gamma::Srgb),
        halftone::AlphaPolicy::PassThrough,
    );
    assert_eq!(processed, dither_monochrome(&linear, 0));
    assert!(processed.samples().iter().all(|&s| s == 0 || s == MAX_SAMPLE));
}

#[test]
fn test_blur_leaves_flat_field_alone() {
    for color in [[0u16, 0, 0, MAX_SAMPLE], [65535, 1, 32767, 9], [4000, 4000, 4000, 0]] {
        let src = Raster::filled(Bounds::new(3, -2, 40, 25), PixelFormat::Rgba, &color);
        assert_eq!(gaussian_blur(&src, 4.2), src);
    }
}

#[test]
fn test_blur_softens_dither() {
    let pipeline = Pipeline::new(DitherConfig {
        blur_radius: 1.5,
        ..Default::default()
    })
    .unwrap();
    let src = Raster::filled(Bounds::from_size(40, 40), PixelFormat::Gray, &[40000]);
    let out = pipeline.process(&src).unwrap();
    assert!(out.samples().iter().any(|&s| s != 0 && s != MAX_SAMPLE));
}

#[test]
fn test_aspect_derivation() {
    assert_eq!(block_grid(0, 50, 400, 200), Some((100, 50)));

    let pipeline = Pipeline::new(DitherConfig {
        y_blocks: 50,
        rescale_output: true,
        ..no_blur()
    })
    .unwrap();
    let src = Raster::filled(Bounds::from_size(400, 200), PixelFormat::Gray, &[20000]);
    let out = pipeline.process(&src).unwrap();
    assert_eq!((out.width(), out.height()), (100, 50));
}

#[test]
fn test_smooth_mode_restores_size() {
    let pipeline = Pipeline::new(DitherConfig {
        x_blocks: 10,
        smooth: true,
        ..no_blur()
    })
    .unwrap();
    let src = gradient(60, 30).with_origin(-5, 7);
    let out = pipeline.process(&src).unwrap();
    assert_eq!(out.bounds(), src.bounds());
    assert_eq!(out.format(), PixelFormat::Gray);
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[test]
fn test_process_file_writes_named_tiff() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ramp.png");
    gradient(32, 16).to_dynamic().unwrap().save(&input).unwrap();

    let pipeline = Pipeline::new(DitherConfig {
        x_blocks: 8,
        ..Default::default()
    })
    .unwrap();
    let output = pipeline.process_file(&input).unwrap();
    assert_eq!(output, dir.path().join("ramp.png.d0008x0004.tiff"));

    let written = image::open(&output).unwrap();
    assert_eq!((written.width(), written.height()), (32, 16));
    assert_eq!(written.color(), image::ColorType::L16);
}

#[test]
fn test_output_tiff_is_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("black.png");
    Raster::new(Bounds::from_size(256, 256), PixelFormat::Gray)
        .to_dynamic()
        .unwrap()
        .save(&input)
        .unwrap();

    let output = Pipeline::new(DitherConfig::default())
        .unwrap()
        .process_file(&input)
        .unwrap();
    let raw = 256 * 256 * 2;
    let size = std::fs::metadata(&output).unwrap().len();
    assert!(size < raw / 4, "{size} bytes for a {raw}-byte black image");

    let written = image::open(&output).unwrap();
    assert_eq!(written.color(), image::ColorType::L16);
    assert!(written.to_luma16().pixels().all(|p| p.0[0] == 0));
}

#[test]
fn test_batch_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    let missing = dir.path().join("missing.png");
    let garbage = dir.path().join("garbage.png");
    gradient(8, 8).to_dynamic().unwrap().save(&good).unwrap();
    std::fs::write(&garbage, b"not an image").unwrap();

    let pipeline = Pipeline::new(no_blur()).unwrap();
    let inputs: Vec<PathBuf> = vec![missing.clone(), good.clone(), garbage.clone()];
    let outcomes = pipeline.process_batch(&inputs);

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].input, missing);
    assert!(outcomes[0].result.is_err());
    assert_eq!(
        outcomes[1].result.as_ref().unwrap(),
        &dir.path().join("good.png.d0008x0008.tiff")
    );
    assert!(outcomes[2].result.is_err());
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let config = DitherConfig {
        seed: 9,
        x_blocks: 12,
        smooth: true,
        gamma: 2.2,
        ..Default::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    assert_eq!(DitherConfig::from_json_file(&path).unwrap(), config);

    std::fs::write(&path, r#"{"gamma": -3.0}"#).unwrap();
    assert!(DitherConfig::from_json_file(&path).is_err());
}
