//! End-to-end turntable runs on a small textured cube.

use std::fs::{self, File};
use std::path::Path;

use image::{Rgba, RgbaImage};
use meshtools_core::obj::save_obj;
use meshtools_core::{Mesh, ObjExport};
use meshtools_turntable::{
    run, DitherMethod, OrientationCorrection, Resolution, SeamPolicy, TurntableConfig,
    TurntableError,
};

fn scene(dir: &Path, step: f64) -> TurntableConfig {
    let obj = dir.join("cube.obj");
    save_obj(&obj, &Mesh::cube(2.0), ObjExport::WithAttributes).unwrap();

    let texture = dir.join("texture.png");
    RgbaImage::from_fn(8, 8, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([200, 40, 40, 255])
        } else {
            Rgba([40, 40, 200, 255])
        }
    })
    .save(&texture)
    .unwrap();

    let mut config = TurntableConfig::default();
    config.obj_path = obj;
    config.texture_path = texture;
    config.output_dir = dir.join("frames");
    config.gif_path = dir.join("turntable.gif");
    config.render.step_degrees = step;
    config.render.resolution = Resolution::new(64, 48);
    config
}

fn gif_frames(path: &Path) -> Vec<(u16, gif::DisposalMethod)> {
    let mut decoder = gif::DecodeOptions::new()
        .read_info(File::open(path).unwrap())
        .unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        frames.push((frame.delay, frame.dispose));
    }
    frames
}

#[test]
fn test_even_step_drops_seam_frame() {
    let dir = tempfile::tempdir().unwrap();
    let config = scene(dir.path(), 90.0);

    let report = run(&config).unwrap();
    assert_eq!(report.frames.len(), 4);
    assert_eq!(report.gif.frames, 3);
    // ccw90 correction swaps the canvas
    assert_eq!((report.gif.width, report.gif.height), (48, 64));

    for (i, path) in report.frames.iter().enumerate() {
        assert_eq!(path, &config.output_dir.join(format!("screenshot_{i:03}.png")));
        let frame = image::open(path).unwrap().to_rgba8();
        assert_eq!(frame.dimensions(), (48, 64));
        assert!(frame.pixels().any(|p| p[3] == 0));
        assert!(frame.pixels().any(|p| p[3] == 255));
    }

    let frames = gif_frames(&config.gif_path);
    assert_eq!(frames.len(), 3);
    for (delay, dispose) in frames {
        assert_eq!(delay, 10);
        assert_eq!(dispose, gif::DisposalMethod::Background);
    }
}

#[test]
fn test_uneven_step_keeps_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scene(dir.path(), 100.0);
    config.render.orientation = OrientationCorrection::None;
    config.gif.dither = DitherMethod::None;

    let report = run(&config).unwrap();
    assert_eq!(report.frames.len(), 4);
    assert_eq!(report.gif.frames, 4);
    assert_eq!((report.gif.width, report.gif.height), (64, 48));
    assert_eq!(gif_frames(&config.gif_path).len(), 4);
}

#[test]
fn test_drop_last_policy_always_drops() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scene(dir.path(), 100.0);
    config.gif.seam = SeamPolicy::DropLast;

    let report = run(&config).unwrap();
    assert_eq!(report.gif.frames, 3);
}

#[test]
fn test_stale_frames_removed_before_render() {
    let dir = tempfile::tempdir().unwrap();
    let config = scene(dir.path(), 120.0);
    fs::create_dir_all(&config.output_dir).unwrap();
    RgbaImage::new(10, 10)
        .save(config.output_dir.join("screenshot_017.png"))
        .unwrap();

    let report = run(&config).unwrap();
    assert_eq!(report.frames.len(), 3);
    assert!(!config.output_dir.join("screenshot_017.png").exists());
    assert_eq!(report.gif.frames, 2);
}

#[test]
fn test_missing_obj_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scene(dir.path(), 90.0);
    config.obj_path = dir.path().join("missing.obj");

    assert!(matches!(run(&config), Err(TurntableError::Mesh(_))));
}

#[test]
fn test_invalid_step_fails_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let config = scene(dir.path(), -1.0);

    assert!(matches!(run(&config), Err(TurntableError::InvalidStep { .. })));
    assert!(!config.output_dir.exists());
}
