//! Detector backends.
//!
//! Everything that actually finds hands lives behind [`DetectorBackend`]; the
//! batch annotator and the live viewer only consume the trait. `stub://` model
//! references select the deterministic [`StubBackend`], any other value is an
//! ONNX model path served by the tract backend (feature `backend-tract`).

mod backend;
mod backends;
mod result;

use anyhow::Result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BoundingBox, Detection};

/// Class set of the pretrained glove model, in class-index order.
pub const CLASS_LABELS: [&str; 2] = ["gloved_hand", "bare_hand"];

/// Scheme prefix selecting the stub backend instead of a model file.
pub const STUB_MODEL_SCHEME: &str = "stub://";

/// Resolve a model reference from the CLI/config into a backend.
pub fn load_backend(model: &str) -> Result<Box<dyn DetectorBackend>> {
    if model.starts_with(STUB_MODEL_SCHEME) {
        log::info!("using stub detector backend ({model})");
        return Ok(Box::new(StubBackend::new()));
    }

    #[cfg(feature = "backend-tract")]
    {
        log::info!("loading ONNX model from {model}");
        Ok(Box::new(TractBackend::new(model)?))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(anyhow::anyhow!(
            "model path '{model}' requires the backend-tract feature \
             (use a stub:// model reference to run without it)"
        ))
    }
}
