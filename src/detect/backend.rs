use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// Backends wrap a pretrained hand/glove model (or a deterministic stand-in)
/// behind one capability: locate labeled objects in an RGB frame.
///
/// Implementations MUST:
/// - treat the pixel slice as read-only and ephemeral
/// - return only detections with `confidence >= confidence_threshold`
/// - preserve model output order
/// - keep every bounding box inside the frame
///
/// Implementations MUST NOT store pixels beyond the `detect` call or perform
/// network I/O.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one RGB8 frame (`width * height * 3` bytes).
    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
