//! Label→color mapping for annotation overlays.

use std::collections::HashMap;

use image::Rgb;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Immutable label→color mapping, constructed once at startup and shared
/// read-only with the drawing routines.
///
/// Known labels: `gloved_hand` draws green, `bare_hand` draws red. Unmapped
/// labels fall back to the default color, which differs between the batch
/// annotator (red, matching its gloved/not-gloved color coding) and the live
/// viewer (white).
#[derive(Clone, Debug)]
pub struct Palette {
    colors: HashMap<String, Rgb<u8>>,
    default: Rgb<u8>,
}

impl Palette {
    pub fn new(default: Rgb<u8>) -> Self {
        let mut colors = HashMap::new();
        colors.insert("gloved_hand".to_string(), GREEN);
        colors.insert("bare_hand".to_string(), RED);
        Self { colors, default }
    }

    /// Palette used by the batch annotator.
    pub fn batch() -> Self {
        Self::new(RED)
    }

    /// Palette used by the live viewer.
    pub fn viewer() -> Self {
        Self::new(WHITE)
    }

    pub fn color_for(&self, label: &str) -> Rgb<u8> {
        self.colors.get(label).copied().unwrap_or(self.default)
    }
}
