#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::detect::CLASS_LABELS;

const DEFAULT_INPUT_SIZE: u32 = 640;
const IOU_THRESHOLD: f32 = 0.45;

/// Tract-based backend for YOLO-style ONNX exports.
///
/// Loads a local model file and performs inference on RGB frames. Frames are
/// resized to the fixed model input, the `[1, 4+nc, N]` output head is decoded
/// into boxes, and duplicates are removed with per-label non-maximum
/// suppression. Boxes are reported in the original frame's coordinate space.
///
/// No network I/O; disk access is limited to loading the model.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_width: u32,
    input_height: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_input_size(model_path, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE)
    }

    pub fn with_input_size<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_width: width,
            input_height: height,
        })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let frame = RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("pixel buffer does not match frame dimensions"))?;
        let resized = image::imageops::resize(
            &frame,
            self.input_width,
            self.input_height,
            image::imageops::FilterType::Triangle,
        );

        let w = self.input_width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, w),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );

        Ok(input.into_tensor())
    }

    /// Decode a `[1, 4+nc, N]` output head into frame-space detections.
    fn decode(
        &self,
        outputs: TVec<TValue>,
        frame_width: u32,
        frame_height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(anyhow!(
                "unsupported output shape {:?}, expected [1, 4+nc, N]",
                shape
            ));
        }
        let classes = shape[1] - 4;
        let anchors = shape[2];
        let view = view
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output was not rank 3")?;

        let x_scale = frame_width as f32 / self.input_width as f32;
        let y_scale = frame_height as f32 / self.input_height as f32;

        let mut detections = Vec::new();
        for a in 0..anchors {
            let mut best_class = 0;
            let mut best_score = f32::NEG_INFINITY;
            for c in 0..classes {
                let score = view[[0, 4 + c, a]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if !best_score.is_finite() || best_score < confidence_threshold {
                continue;
            }

            let cx = view[[0, 0, a]] * x_scale;
            let cy = view[[0, 1, a]] * y_scale;
            let w = view[[0, 2, a]] * x_scale;
            let h = view[[0, 3, a]] * y_scale;

            let x1 = ((cx - w / 2.0).round() as i32).clamp(0, frame_width as i32 - 1);
            let y1 = ((cy - h / 2.0).round() as i32).clamp(0, frame_height as i32 - 1);
            let x2 = ((cx + w / 2.0).round() as i32).clamp(x1 + 1, frame_width as i32);
            let y2 = ((cy + h / 2.0).round() as i32).clamp(y1 + 1, frame_height as i32);
            let Ok(bbox) = BoundingBox::new(x1, y1, x2, y2) else {
                continue;
            };

            let label = CLASS_LABELS
                .get(best_class)
                .map(|l| l.to_string())
                .unwrap_or_else(|| format!("class_{best_class}"));
            detections.push(Detection::new(label, best_score, bbox));
        }

        Ok(non_max_suppression(detections, IOU_THRESHOLD))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, width, height, confidence_threshold)
    }
}

/// Classic non-maximum suppression: keep the highest-confidence detection,
/// drop any same-label detection whose overlap (IoU) exceeds the threshold.
fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept = Vec::with_capacity(detections.len());
    while let Some(seed) = detections.pop() {
        detections.retain(|other| {
            other.label != seed.label
                || seed.bounding_box.iou(&other.bounding_box) < iou_threshold
        });
        kept.push(seed);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_drops_same_label_overlaps() {
        let dets = vec![
            Detection::new(
                "gloved_hand",
                0.6,
                BoundingBox::new(12, 12, 102, 102).unwrap(),
            ),
            Detection::new(
                "gloved_hand",
                0.9,
                BoundingBox::new(10, 10, 100, 100).unwrap(),
            ),
            Detection::new("bare_hand", 0.7, BoundingBox::new(11, 11, 101, 101).unwrap()),
        ];

        let kept = non_max_suppression(dets, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].label, "gloved_hand");
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].label, "bare_hand");
    }

    #[test]
    fn nms_keeps_disjoint_detections() {
        let dets = vec![
            Detection::new("bare_hand", 0.8, BoundingBox::new(0, 0, 20, 20).unwrap()),
            Detection::new("bare_hand", 0.5, BoundingBox::new(200, 200, 240, 240).unwrap()),
        ];
        assert_eq!(non_max_suppression(dets, 0.45).len(), 2);
    }
}
