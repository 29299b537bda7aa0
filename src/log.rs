//! Persisted detection records.
//!
//! One JSON file per processed image:
//! `{"filename": "a.jpg", "detections": [{"label", "confidence", "bbox"}, ...]}`,
//! pretty-printed with 2-space indentation. Written once, never mutated.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::detect::Detection;

/// Record of all detections for one processed image, in detector order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionLog {
    pub filename: String,
    pub detections: Vec<Detection>,
}

impl DetectionLog {
    pub fn new(filename: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            filename: filename.into(),
            detections,
        }
    }

    /// Destination path for this record: the image filename under `logs_dir`
    /// with the extension replaced by `.json`.
    pub fn path_under(&self, logs_dir: &Path) -> PathBuf {
        logs_dir.join(json_filename(&self.filename))
    }

    /// Write the record under `logs_dir`, overwriting any previous run's file.
    pub fn write(&self, logs_dir: &Path) -> Result<PathBuf> {
        let path = self.path_under(logs_dir);
        let json = serde_json::to_string_pretty(self).context("serialize detection log")?;
        fs::write(&path, json)
            .with_context(|| format!("write detection log {}", path.display()))?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read detection log {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse detection log {}", path.display()))
    }
}

fn json_filename(image_filename: &str) -> String {
    let stem = Path::new(image_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_filename.to_string());
    format!("{stem}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn sample_log() -> DetectionLog {
        DetectionLog::new(
            "a.jpg",
            vec![Detection::new(
                "gloved_hand",
                0.91,
                BoundingBox::new(10, 20, 100, 120).unwrap(),
            )],
        )
    }

    #[test]
    fn extension_is_replaced_with_json() {
        let log = sample_log();
        assert_eq!(
            log.path_under(Path::new("logs")),
            Path::new("logs").join("a.json")
        );

        let png = DetectionLog::new("shelf.scene.PNG", vec![]);
        assert_eq!(
            png.path_under(Path::new("logs")),
            Path::new("logs").join("shelf.scene.json")
        );
    }

    #[test]
    fn serialized_form_matches_the_log_contract() {
        let json = serde_json::to_string_pretty(&sample_log()).unwrap();
        let expected = r#"{
  "filename": "a.jpg",
  "detections": [
    {
      "label": "gloved_hand",
      "confidence": 0.91,
      "bbox": [
        10,
        20,
        100,
        120
      ]
    }
  ]
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn write_then_read_round_trips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = sample_log();
        let path = log.write(dir.path())?;
        assert_eq!(DetectionLog::read(&path)?, log);
        Ok(())
    }
}
