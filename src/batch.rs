//! Batch annotator pipeline.
//!
//! Walks an input directory, runs the detector on every eligible image, and
//! writes an annotated copy plus a JSON detection log per file. Strictly
//! sequential; per-file failures are skipped and logged so one bad file cannot
//! abort the batch, while setup failures (missing input directory, unwritable
//! output) abort the run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::ImageReader;

use crate::detect::DetectorBackend;
use crate::draw;
use crate::log::DetectionLog;
use crate::palette::Palette;

/// Image extension allow-list, matched case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    /// Minimum confidence for a detection to be kept, in [0, 1].
    pub confidence_threshold: f32,
}

/// Outcome counts for one batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
}

pub struct BatchAnnotator {
    config: BatchConfig,
    palette: Palette,
}

impl BatchAnnotator {
    pub fn new(config: BatchConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold {} outside [0, 1]",
                config.confidence_threshold
            ));
        }
        Ok(Self {
            config,
            palette: Palette::batch(),
        })
    }

    /// Eligible input files, sorted by name for reproducible runs.
    pub fn eligible_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.config.input_dir).with_context(|| {
            format!("read input directory {}", self.config.input_dir.display())
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.context("read input directory entry")?;
            let path = entry.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Process the whole input directory. Creates the output and logs
    /// directories if absent; reruns overwrite previous outputs in place.
    pub fn run(&self, backend: &mut dyn DetectorBackend) -> Result<BatchSummary> {
        let files = self.eligible_files()?;
        self.prepare_dirs()?;
        backend.warm_up()?;

        let mut summary = BatchSummary::default();
        for path in &files {
            match self.process_file(backend, path) {
                Ok(log) => {
                    summary.processed += 1;
                    log::info!(
                        "processed {} ({} detections)",
                        log.filename,
                        log.detections.len()
                    );
                }
                Err(err) => {
                    summary.skipped += 1;
                    log::warn!("skipping {}: {:#}", path.display(), err);
                }
            }
        }
        Ok(summary)
    }

    pub fn prepare_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!("create output directory {}", self.config.output_dir.display())
        })?;
        fs::create_dir_all(&self.config.logs_dir).with_context(|| {
            format!("create logs directory {}", self.config.logs_dir.display())
        })?;
        Ok(())
    }

    /// Annotate one image and persist both artifacts. Expects `prepare_dirs`
    /// to have run.
    pub fn process_file(
        &self,
        backend: &mut dyn DetectorBackend,
        path: &Path,
    ) -> Result<DetectionLog> {
        let filename = path
            .file_name()
            .ok_or_else(|| anyhow!("input path has no file name"))?
            .to_string_lossy()
            .into_owned();

        let image = ImageReader::open(path)
            .with_context(|| format!("open {}", path.display()))?
            .decode()
            .with_context(|| format!("decode {}", path.display()))?;
        let mut image = image.to_rgb8();

        let detections = backend
            .detect(
                image.as_raw(),
                image.width(),
                image.height(),
                self.config.confidence_threshold,
            )
            .context("detector invocation failed")?;

        draw::annotate(&mut image, &detections, &self.palette);

        let out_path = self.config.output_dir.join(&filename);
        image
            .save(&out_path)
            .with_context(|| format!("write annotated image {}", out_path.display()))?;

        let log = DetectionLog::new(filename, detections);
        log.write(&self.config.logs_dir)?;
        Ok(log)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(has_image_extension(Path::new("a.jpg")));
        assert!(has_image_extension(Path::new("a.JPEG")));
        assert!(has_image_extension(Path::new("dir/b.PnG")));
        assert!(!has_image_extension(Path::new("a.gif")));
        assert!(!has_image_extension(Path::new("a.json")));
        assert!(!has_image_extension(Path::new("jpg")));
    }

    #[test]
    fn threshold_is_validated() {
        let config = BatchConfig {
            input_dir: "input".into(),
            output_dir: "output".into(),
            logs_dir: "logs".into(),
            confidence_threshold: 1.5,
        };
        assert!(BatchAnnotator::new(config).is_err());
    }
}
