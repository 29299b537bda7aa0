//! Live viewer loop.
//!
//! Strictly sequential: capture one frame, run the detector, draw the
//! overlay, hand the frame to a [`FrameSink`], poll for cancellation. The
//! loop ends on end-of-stream, a sink stop request (window closed or quit
//! key), or the shared stop flag (SIGINT). The camera and the sink are
//! released by their owners' `Drop` on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::detect::{Detection, DetectorBackend};
use crate::draw;
use crate::frame::Frame;
use crate::ingest::CameraSource;
use crate::palette::Palette;

/// Where annotated frames go.
pub trait FrameSink {
    /// Present one annotated frame and poll pending UI events.
    fn present(&mut self, frame: &Frame, detections: &[Detection]) -> Result<SinkControl>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    /// The user asked to exit (window close / quit key).
    Stop,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewerSummary {
    pub frames: u64,
}

pub struct Viewer {
    confidence_threshold: f32,
    palette: Palette,
}

impl Viewer {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            palette: Palette::viewer(),
        }
    }

    pub fn run(
        &self,
        source: &mut CameraSource,
        backend: &mut dyn DetectorBackend,
        sink: &mut dyn FrameSink,
        stop: &AtomicBool,
    ) -> Result<ViewerSummary> {
        backend.warm_up()?;

        let mut summary = ViewerSummary::default();
        loop {
            if stop.load(Ordering::Relaxed) {
                log::info!("stop requested, leaving viewer loop");
                break;
            }
            let Some(frame) = source.next_frame()? else {
                log::info!("camera stream ended");
                break;
            };

            let detections = backend.detect(
                frame.pixels(),
                frame.width,
                frame.height,
                self.confidence_threshold,
            )?;

            let mut image = frame.into_image();
            draw::annotate(&mut image, &detections, &self.palette);
            let frame = Frame::from_image(image);

            summary.frames += 1;
            if sink.present(&frame, &detections)? == SinkControl::Stop {
                log::info!("viewer cancelled by user");
                break;
            }
        }
        Ok(summary)
    }
}

/// Sink for builds without a display: logs detections instead of rendering.
#[derive(Default)]
pub struct HeadlessSink {
    frames: u64,
}

impl FrameSink for HeadlessSink {
    fn present(&mut self, _frame: &Frame, detections: &[Detection]) -> Result<SinkControl> {
        self.frames += 1;
        for det in detections {
            log::debug!(
                "frame {}: {} {:.2} at {:?}",
                self.frames,
                det.label,
                det.confidence,
                <[i32; 4]>::from(det.bounding_box)
            );
        }
        Ok(SinkControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, StubBackend};
    use crate::ingest::CameraConfig;

    fn stub_source(frames: u32) -> CameraSource {
        let mut source = CameraSource::new(CameraConfig {
            device: format!("stub://{frames}"),
            target_fps: 10,
            width: 64,
            height: 48,
        })
        .unwrap();
        source.connect().unwrap();
        source
    }

    struct CountingSink {
        presented: u64,
        stop_after: Option<u64>,
    }

    impl FrameSink for CountingSink {
        fn present(&mut self, _frame: &Frame, _detections: &[Detection]) -> Result<SinkControl> {
            self.presented += 1;
            match self.stop_after {
                Some(n) if self.presented >= n => Ok(SinkControl::Stop),
                _ => Ok(SinkControl::Continue),
            }
        }
    }

    #[test]
    fn loop_ends_at_end_of_stream() -> Result<()> {
        let mut source = stub_source(5);
        let mut backend = StubBackend::scripted(vec![]);
        let mut sink = CountingSink {
            presented: 0,
            stop_after: None,
        };
        let stop = AtomicBool::new(false);

        let summary = Viewer::new(0.5).run(&mut source, &mut backend, &mut sink, &stop)?;
        assert_eq!(summary.frames, 5);
        assert_eq!(sink.presented, 5);
        Ok(())
    }

    #[test]
    fn sink_stop_request_cancels_the_loop() -> Result<()> {
        let mut source = stub_source(100);
        let mut backend = StubBackend::scripted(vec![Detection::new(
            "gloved_hand",
            0.9,
            BoundingBox::new(4, 4, 20, 20).unwrap(),
        )]);
        let mut sink = CountingSink {
            presented: 0,
            stop_after: Some(3),
        };
        let stop = AtomicBool::new(false);

        let summary = Viewer::new(0.5).run(&mut source, &mut backend, &mut sink, &stop)?;
        assert_eq!(summary.frames, 3);
        Ok(())
    }

    #[test]
    fn stop_flag_prevents_any_capture() -> Result<()> {
        let mut source = stub_source(100);
        let mut backend = StubBackend::scripted(vec![]);
        let mut sink = CountingSink {
            presented: 0,
            stop_after: None,
        };
        let stop = AtomicBool::new(true);

        let summary = Viewer::new(0.5).run(&mut source, &mut backend, &mut sink, &stop)?;
        assert_eq!(summary.frames, 0);
        assert_eq!(source.stats().frames_captured, 0);
        Ok(())
    }
}
