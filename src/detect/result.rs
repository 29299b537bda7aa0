use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in image pixel coordinates.
///
/// The invariant `x1 < x2 && y1 < y2` holds for every constructed value.
/// Serialized as the JSON array `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[i32; 4]", try_from = "[i32; 4]")]
pub struct BoundingBox {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        if x1 >= x2 || y1 >= y2 {
            return Err(anyhow!(
                "degenerate bounding box ({x1},{y1})-({x2},{y2}): corners must be ordered"
            ));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> i32 {
        self.x1
    }

    pub fn y1(&self) -> i32 {
        self.y1
    }

    pub fn x2(&self) -> i32 {
        self.x2
    }

    pub fn y2(&self) -> i32 {
        self.y2
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1) as u32
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Intersection-over-union with another box. Returns 0.0 for disjoint boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        if ix1 >= ix2 || iy1 >= iy2 {
            return 0.0;
        }
        let inter = (ix2 - ix1) as u64 * (iy2 - iy1) as u64;
        let union = self.area() + other.area() - inter;
        inter as f32 / union as f32
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl TryFrom<[i32; 4]> for BoundingBox {
    type Error = anyhow::Error;

    fn try_from([x1, y1, x2, y2]: [i32; 4]) -> Result<Self> {
        Self::new(x1, y1, x2, y2)
    }
}

/// One labeled, scored, localized object found by a detector backend.
///
/// Owned by the caller for the duration of one frame's processing and
/// discarded afterwards; nothing in the crate mutates a `Detection` once
/// a backend has produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    #[serde(rename = "bbox")]
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounding_box,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_rejects_unordered_corners() {
        assert!(BoundingBox::new(10, 20, 10, 120).is_err());
        assert!(BoundingBox::new(10, 20, 100, 20).is_err());
        assert!(BoundingBox::new(100, 20, 10, 120).is_err());
        assert!(BoundingBox::new(10, 20, 100, 120).is_ok());
    }

    #[test]
    fn bounding_box_serializes_as_array() {
        let b = BoundingBox::new(10, 20, 100, 120).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[10,20,100,120]");

        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn bounding_box_deserialization_validates() {
        assert!(serde_json::from_str::<BoundingBox>("[100,20,10,120]").is_err());
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0, 0, 10, 10).unwrap();
        let b = BoundingBox::new(20, 20, 30, 30).unwrap();
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(5, 5, 50, 40).unwrap();
        assert!((a.iou(&a) - 1.0).abs() < f32::EPSILON);
    }
}
