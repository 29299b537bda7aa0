//! Frame ingestion sources for the live viewer.
//!
//! - V4L2 devices such as `/dev/video0` (feature: `ingest-v4l2`)
//! - `stub://` synthetic source (testing, hardware-free runs)
//!
//! Sources produce [`Frame`](crate::frame::Frame) instances one at a time;
//! end-of-stream is reported as `Ok(None)`, never as an error.

mod camera;

pub use camera::{CameraConfig, CameraSource, CameraStats};
