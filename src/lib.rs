//! glovewatch
//!
//! Runs a pretrained hand/glove detector over images or a live camera feed,
//! draws labeled bounding boxes, and writes per-image JSON detection logs.
//!
//! Two entry points share one capability seam:
//!
//! - `annotate` (batch): walks an input directory, annotates every eligible
//!   image, and persists an annotated copy plus a detection log per file.
//! - `live`: captures camera frames, annotates them, and presents them in a
//!   preview window until end-of-stream or cancellation.
//!
//! # Module Structure
//!
//! - `detect`: detector backends behind the [`DetectorBackend`] seam
//! - `ingest`: camera sources (`stub://` synthetic, V4L2)
//! - `batch` / `viewer`: the two pipelines
//! - `draw` / `palette`: annotation overlay
//! - `log`: persisted per-image detection records

pub mod batch;
pub mod config;
pub mod detect;
pub mod draw;
pub mod frame;
#[cfg(feature = "viewer-gui")]
pub mod gui;
pub mod ingest;
pub mod log;
pub mod palette;
pub mod ui;
pub mod viewer;

pub use batch::{BatchAnnotator, BatchConfig, BatchSummary};
pub use config::ViewerConfig;
pub use detect::{load_backend, BoundingBox, Detection, DetectorBackend, StubBackend};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource};
pub use log::DetectionLog;
pub use palette::Palette;
pub use viewer::{FrameSink, HeadlessSink, SinkControl, Viewer};
