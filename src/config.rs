use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::ingest::CameraConfig;

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_FPS: u32 = 30;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_MODEL: &str = "stub://";
const DEFAULT_WINDOW_TITLE: &str = "Glove Detection";

#[derive(Debug, Deserialize, Default)]
struct ViewerConfigFile {
    camera: Option<CameraConfigFile>,
    confidence_threshold: Option<f32>,
    model: Option<String>,
    window_title: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Live viewer configuration.
///
/// Loaded from an optional JSON file named by `GLOVEWATCH_CONFIG`, then
/// overridden by `GLOVEWATCH_CAMERA`, `GLOVEWATCH_MODEL`, and
/// `GLOVEWATCH_CONFIDENCE`.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub confidence_threshold: f32,
    pub model: String,
    pub window_title: String,
}

impl ViewerConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GLOVEWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ViewerConfigFile) -> Self {
        let camera = CameraConfig {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        Self {
            camera,
            confidence_threshold: file.confidence_threshold.unwrap_or(DEFAULT_CONFIDENCE),
            model: file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            window_title: file
                .window_title
                .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("GLOVEWATCH_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(model) = std::env::var("GLOVEWATCH_MODEL") {
            if !model.trim().is_empty() {
                self.model = model;
            }
        }
        if let Ok(confidence) = std::env::var("GLOVEWATCH_CONFIDENCE") {
            self.confidence_threshold = confidence
                .parse()
                .map_err(|_| anyhow!("GLOVEWATCH_CONFIDENCE must be a number in [0, 1]"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold {} outside [0, 1]",
                self.confidence_threshold
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera geometry must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ViewerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
