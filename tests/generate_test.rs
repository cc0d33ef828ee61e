//! Single-file generation and end-to-end LUT tests.

mod common;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use common::fixtures::{self, idx, PALETTE_CSV};
use common::{assert_canvas, assert_uniform, read_smrf, TestPipeline};
use mapframe::error::PipelineError;
use mapframe::models::CanvasSize;
use mapframe::services::container::SMRF_HEADER_LEN;
use mapframe::services::{
    pack_smrf, FrameQuantizer, Origin, OutputFormat, OutputSettings, QuantizeOptions,
};
use oklab_lut::{load_lut, save_lut, ColorLut, DitherMode, DitherOptions, LutWidth, Palette};
use pretty_assertions::assert_eq;

fn raw_smrf() -> OutputSettings {
    OutputSettings {
        format: OutputFormat::Smrf,
        compress: false,
        origin: Origin::default(),
    }
}

#[test]
fn test_black_frame_matches_reference_bytes() {
    let app = TestPipeline::new();
    let input = app.write_frame("black.png", &fixtures::flat(128, 128, [0, 0, 0]));
    let output = app.root().join("black.smrf");

    let written = app.driver(raw_smrf()).run_file(&input, &output, None, None).unwrap();
    assert_eq!(written, output);

    let bytes = std::fs::read(&output).unwrap();
    let mut expected = b"SMRF".to_vec();
    expected.extend_from_slice(&[1, 0, 1, 1, 0x00, 0x80, 0x00, 0x80]);
    expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 64, 0, 0, 0, 0]);
    expected.extend(std::iter::repeat(0u8).take(16384));
    assert_eq!(bytes.len(), SMRF_HEADER_LEN + 16384);
    assert!(bytes == expected, "SMRF bytes differ from reference layout");
}

#[test]
fn test_output_directory_infers_file_name() {
    let app = TestPipeline::new();
    let input = app.write_frame("scene.png", &fixtures::flat(200, 130, [255, 255, 255]));

    // Trailing separator on a folder that does not exist yet
    let mut out_dir = app.root().join("frames").into_os_string();
    out_dir.push("/");
    let written = app
        .driver(raw_smrf())
        .run_file(&input, Path::new(&out_dir), None, None)
        .unwrap();

    assert_eq!(written, app.root().join("frames").join("scene.smrf"));
    let (header, payload) = read_smrf(&written);
    assert_canvas(&header, 256, 128);
    assert_uniform(&payload, idx::WHITE);

    // Existing folder without separator
    let written = app
        .driver(raw_smrf())
        .run_file(&input, &app.root().join("frames"), None, None)
        .unwrap();
    assert_eq!(written.file_name().unwrap(), "scene.smrf");
}

#[test]
fn test_single_file_errors_are_fatal() {
    let app = TestPipeline::new();
    let input = app.write_raw("broken.jpg", b"not a jpeg");
    let result = app
        .driver(raw_smrf())
        .run_file(&input, &app.root().join("out.smrf"), None, None);
    assert!(matches!(result, Err(PipelineError::UnreadableImage { .. })));
}

#[test]
fn test_user_size_applies_to_single_file() {
    let app = TestPipeline::new();
    let input = app.write_frame("wide.png", &fixtures::flat(1000, 500, [255, 0, 0]));
    let output = app.root().join("wide.smrf");

    app.driver(raw_smrf())
        .run_file(&input, &output, None, Some(300))
        .unwrap();

    // 1000 * 300 / 500 = 600 -> 4.69 cells -> 5 cells; 300 -> 2.34 -> 2 cells
    let (header, _) = read_smrf(&output);
    assert_canvas(&header, 640, 256);
}

#[test]
fn test_saved_lut_quantizes_like_built_lut() {
    let dir = tempfile::tempdir().unwrap();
    let palette = Palette::from_csv(PALETTE_CSV, &BTreeSet::from([idx::RED])).unwrap();
    let built = ColorLut::build(&palette, LutWidth::for_palette(&palette)).unwrap();
    let path = dir.path().join("colormap.lut.gz");
    save_lut(&built, &path).unwrap();
    let loaded = Arc::new(load_lut(&path).unwrap());
    assert_eq!(*loaded, built);

    let options = QuantizeOptions {
        dither: DitherOptions::new().mode(DitherMode::None),
        pixelate: false,
    };
    let quantizer = FrameQuantizer::new(loaded, options);
    let image = image::DynamicImage::ImageRgb8(fixtures::flat(128, 128, [255, 0, 0]));
    let frame = quantizer.quantize_image(&image, CanvasSize::SINGLE);

    // Red is excluded, so pure red must land elsewhere
    assert!(frame.indices().iter().all(|&i| i != idx::RED));

    let bytes = pack_smrf(&frame, Origin::default(), true).unwrap();
    let (header, payload) = mapframe::services::unpack_smrf(&bytes).unwrap();
    assert_canvas(&header, 128, 128);
    let first = payload[0];
    assert!(payload.iter().all(|&b| b == first));
}
