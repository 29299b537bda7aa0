use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::detect::CLASS_LABELS;

/// Stub backend for testing and hardware-free runs.
///
/// Two modes:
/// - `scripted`: replays a fixed detection list, filtered by the requested
///   threshold. Integration tests use this to control exactly what the
///   pipeline sees.
/// - `new`: derives pseudo-detections from a pixel hash, so different frames
///   produce different (but deterministic) boxes.
pub struct StubBackend {
    script: Option<Vec<Detection>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { script: None }
    }

    /// Replay `detections` on every frame, subject to threshold filtering.
    pub fn scripted(detections: Vec<Detection>) -> Self {
        Self {
            script: Some(detections),
        }
    }

    fn hashed_detections(pixels: &[u8], width: u32, height: u32) -> Vec<Detection> {
        let hash: [u8; 32] = Sha256::digest(pixels).into();
        let count = (hash[0] % 3) as usize;

        let mut detections = Vec::with_capacity(count);
        for i in 0..count {
            let seed = &hash[1 + i * 8..9 + i * 8];
            let cx = seed[0] as i64 * width as i64 / 255;
            let cy = seed[1] as i64 * height as i64 / 255;
            // Box edge between 1/8 and 1/4 of the smaller frame dimension.
            let min_dim = width.min(height) as i64;
            let half = (min_dim / 8 + seed[2] as i64 * min_dim / (255 * 8)).max(1);

            let x1 = (cx - half).clamp(0, width as i64 - 2) as i32;
            let y1 = (cy - half).clamp(0, height as i64 - 2) as i32;
            let x2 = (cx + half).clamp(x1 as i64 + 1, width as i64) as i32;
            let y2 = (cy + half).clamp(y1 as i64 + 1, height as i64) as i32;

            let Ok(bbox) = BoundingBox::new(x1, y1, x2, y2) else {
                continue;
            };
            let label = CLASS_LABELS[seed[3] as usize % CLASS_LABELS.len()];
            let confidence = 0.25 + seed[4] as f32 / 255.0 * 0.75;
            detections.push(Detection::new(label, confidence, bbox));
        }
        detections
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let raw = match &self.script {
            Some(script) => script.clone(),
            None => Self::hashed_detections(pixels, width, height),
        };
        Ok(raw
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_script() -> Vec<Detection> {
        vec![
            Detection::new(
                "gloved_hand",
                0.91,
                BoundingBox::new(10, 20, 100, 120).unwrap(),
            ),
            Detection::new("bare_hand", 0.42, BoundingBox::new(5, 5, 50, 60).unwrap()),
        ]
    }

    #[test]
    fn scripted_backend_filters_by_threshold() -> Result<()> {
        let mut backend = StubBackend::scripted(sample_script());

        let all = backend.detect(&[0u8; 12], 2, 2, 0.0)?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].label, "gloved_hand");
        assert_eq!(all[1].label, "bare_hand");

        let high = backend.detect(&[0u8; 12], 2, 2, 0.5)?;
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].label, "gloved_hand");

        let none = backend.detect(&[0u8; 12], 2, 2, 1.0)?;
        assert!(none.is_empty());
        Ok(())
    }

    #[test]
    fn hashed_detections_are_deterministic() -> Result<()> {
        let pixels = vec![42u8; 640 * 480 * 3];
        let mut backend = StubBackend::new();

        let a = backend.detect(&pixels, 640, 480, 0.0)?;
        let b = backend.detect(&pixels, 640, 480, 0.0)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn hashed_detections_stay_inside_frame() -> Result<()> {
        let mut backend = StubBackend::new();
        for fill in 0u8..32 {
            let pixels = vec![fill; 320 * 240 * 3];
            for det in backend.detect(&pixels, 320, 240, 0.0)? {
                let b = det.bounding_box;
                assert!(b.x1() >= 0 && b.y1() >= 0);
                assert!(b.x2() <= 320 && b.y2() <= 240);
            }
        }
        Ok(())
    }
}
