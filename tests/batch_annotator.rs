use std::fs;
use std::path::Path;

use anyhow::Result;
use image::{Rgb, RgbImage};
use tempfile::TempDir;

use glovewatch::detect::{BoundingBox, Detection, StubBackend};
use glovewatch::{BatchAnnotator, BatchConfig, DetectionLog};

struct BatchDirs {
    _root: TempDir,
    config: BatchConfig,
}

fn batch_dirs(confidence_threshold: f32) -> Result<BatchDirs> {
    let root = TempDir::new()?;
    let config = BatchConfig {
        input_dir: root.path().join("input"),
        output_dir: root.path().join("output"),
        logs_dir: root.path().join("logs"),
        confidence_threshold,
    };
    fs::create_dir_all(&config.input_dir)?;
    Ok(BatchDirs {
        _root: root,
        config,
    })
}

fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> Result<()> {
    RgbImage::from_pixel(width, height, Rgb([40, 40, 40])).save(dir.join(name))?;
    Ok(())
}

fn scripted_detections() -> Vec<Detection> {
    vec![
        Detection::new(
            "gloved_hand",
            0.91,
            BoundingBox::new(10, 20, 100, 120).unwrap(),
        ),
        Detection::new("bare_hand", 0.42, BoundingBox::new(5, 5, 50, 60).unwrap()),
    ]
}

fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn one_output_and_one_log_per_eligible_file() -> Result<()> {
    let dirs = batch_dirs(0.5)?;
    write_image(&dirs.config.input_dir, "a.jpg", 200, 200)?;
    write_image(&dirs.config.input_dir, "b.PNG", 160, 120)?;
    write_image(&dirs.config.input_dir, "c.jpeg", 160, 120)?;
    // Ineligible: wrong extension, no extension.
    fs::write(dirs.config.input_dir.join("notes.txt"), "not an image")?;
    fs::write(dirs.config.input_dir.join("README"), "also not")?;

    let annotator = BatchAnnotator::new(dirs.config.clone())?;
    let mut backend = StubBackend::scripted(scripted_detections());
    let summary = annotator.run(&mut backend)?;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(
        list_files(&dirs.config.output_dir),
        vec!["a.jpg", "b.PNG", "c.jpeg"]
    );
    assert_eq!(
        list_files(&dirs.config.logs_dir),
        vec!["a.json", "b.json", "c.json"]
    );
    Ok(())
}

#[test]
fn log_matches_detector_output_at_threshold() -> Result<()> {
    let dirs = batch_dirs(0.5)?;
    write_image(&dirs.config.input_dir, "a.jpg", 200, 200)?;

    let annotator = BatchAnnotator::new(dirs.config.clone())?;
    let mut backend = StubBackend::scripted(scripted_detections());
    annotator.run(&mut backend)?;

    let log = DetectionLog::read(&dirs.config.logs_dir.join("a.json"))?;
    assert_eq!(log.filename, "a.jpg");
    // Only the detection at or above 0.5 survives, detector order preserved.
    assert_eq!(log.detections.len(), 1);
    assert_eq!(log.detections[0].label, "gloved_hand");
    assert_eq!(log.detections[0].confidence, 0.91);
    assert_eq!(<[i32; 4]>::from(log.detections[0].bounding_box), [10, 20, 100, 120]);
    Ok(())
}

#[test]
fn annotated_output_is_drawn_in_the_palette_color() -> Result<()> {
    let dirs = batch_dirs(0.5)?;
    write_image(&dirs.config.input_dir, "a.jpg", 200, 200)?;

    let annotator = BatchAnnotator::new(dirs.config.clone())?;
    let mut backend = StubBackend::scripted(scripted_detections());
    annotator.run(&mut backend)?;

    let out = image::open(dirs.config.output_dir.join("a.jpg"))?.to_rgb8();
    assert_eq!(out.dimensions(), (200, 200));
    // Rectangle corner at (10,20) is green (JPEG is lossy, so dominant-channel
    // check rather than exact equality).
    let px = out.get_pixel(10, 20);
    assert!(px[1] > 180, "expected green channel at corner, got {px:?}");
    assert!(px[0] < 120 && px[2] < 120, "expected green corner, got {px:?}");
    Ok(())
}

#[test]
fn threshold_boundaries() -> Result<()> {
    for (threshold, expected) in [(0.0_f32, 2_usize), (1.0, 0)] {
        let dirs = batch_dirs(threshold)?;
        write_image(&dirs.config.input_dir, "a.png", 160, 120)?;

        let annotator = BatchAnnotator::new(dirs.config.clone())?;
        let mut backend = StubBackend::scripted(scripted_detections());
        annotator.run(&mut backend)?;

        let log = DetectionLog::read(&dirs.config.logs_dir.join("a.json"))?;
        assert_eq!(log.detections.len(), expected, "threshold {threshold}");
    }
    Ok(())
}

#[test]
fn rerun_is_idempotent_and_overwrites() -> Result<()> {
    let dirs = batch_dirs(0.5)?;
    write_image(&dirs.config.input_dir, "a.png", 160, 120)?;

    let annotator = BatchAnnotator::new(dirs.config.clone())?;

    let mut backend = StubBackend::scripted(scripted_detections());
    annotator.run(&mut backend)?;
    let first_log = fs::read_to_string(dirs.config.logs_dir.join("a.json"))?;
    let first_files = (
        list_files(&dirs.config.output_dir),
        list_files(&dirs.config.logs_dir),
    );

    let mut backend = StubBackend::scripted(scripted_detections());
    annotator.run(&mut backend)?;
    let second_log = fs::read_to_string(dirs.config.logs_dir.join("a.json"))?;
    let second_files = (
        list_files(&dirs.config.output_dir),
        list_files(&dirs.config.logs_dir),
    );

    assert_eq!(first_log, second_log);
    assert_eq!(first_files, second_files);
    Ok(())
}

#[test]
fn undecodable_file_is_skipped_not_fatal() -> Result<()> {
    let dirs = batch_dirs(0.5)?;
    write_image(&dirs.config.input_dir, "good.png", 160, 120)?;
    fs::write(dirs.config.input_dir.join("broken.jpg"), b"not a jpeg")?;

    let annotator = BatchAnnotator::new(dirs.config.clone())?;
    let mut backend = StubBackend::scripted(scripted_detections());
    let summary = annotator.run(&mut backend)?;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(list_files(&dirs.config.output_dir), vec!["good.png"]);
    assert_eq!(list_files(&dirs.config.logs_dir), vec!["good.json"]);
    Ok(())
}

#[test]
fn missing_input_directory_aborts() -> Result<()> {
    let dirs = batch_dirs(0.5)?;
    fs::remove_dir(&dirs.config.input_dir)?;

    let annotator = BatchAnnotator::new(dirs.config.clone())?;
    let mut backend = StubBackend::scripted(vec![]);
    assert!(annotator.run(&mut backend).is_err());
    Ok(())
}

#[test]
fn round_trip_matches_scenario() -> Result<()> {
    let dirs = batch_dirs(0.5)?;
    write_image(&dirs.config.input_dir, "a.jpg", 200, 200)?;

    let annotator = BatchAnnotator::new(dirs.config.clone())?;
    let mut backend = StubBackend::scripted(vec![Detection::new(
        "gloved_hand",
        0.91,
        BoundingBox::new(10, 20, 100, 120).unwrap(),
    )]);
    annotator.run(&mut backend)?;

    let raw = fs::read_to_string(dirs.config.logs_dir.join("a.json"))?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(
        parsed,
        serde_json::json!({
            "filename": "a.jpg",
            "detections": [
                {"label": "gloved_hand", "confidence": 0.91, "bbox": [10, 20, 100, 120]}
            ]
        })
    );
    Ok(())
}
