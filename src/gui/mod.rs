//! Preview window for the live viewer (feature `viewer-gui`).
//!
//! One non-resizable window showing the annotated camera frame. Events are
//! pumped from within the viewer loop via `run_return`, so the window and the
//! camera share a single thread; `q`, Escape, or closing the window stop the
//! loop. The GPU surface is released when the sink is dropped.

mod renderer;

use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use crate::detect::Detection;
use crate::frame::Frame;
use crate::viewer::{FrameSink, SinkControl};

use self::renderer::Renderer;

/// Single preview window presenting annotated frames.
pub struct PreviewWindow {
    event_loop: EventLoop<()>,
    renderer: Renderer,
}

impl PreviewWindow {
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self> {
        let event_loop = EventLoopBuilder::new().build();
        let window = WindowBuilder::new()
            .with_resizable(false)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_title(title)
            .build(&event_loop)?;

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let renderer = Renderer::new(instance, window)?;

        Ok(Self {
            event_loop,
            renderer,
        })
    }

    /// Drain pending window events. Returns true if the user requested exit.
    fn pump_events(&mut self) -> bool {
        let mut quit = false;
        let _ = self.event_loop.run_return(|event, _, flow| {
            // Drain what is queued, then hand control back to the caller.
            *flow = ControlFlow::Exit;
            if let Event::WindowEvent { event, .. } = event {
                match event {
                    WindowEvent::CloseRequested => quit = true,
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(VirtualKeyCode::Q | VirtualKeyCode::Escape),
                                ..
                            },
                        ..
                    } => quit = true,
                    _ => {}
                }
            }
        });
        quit
    }
}

impl FrameSink for PreviewWindow {
    fn present(&mut self, frame: &Frame, _detections: &[Detection]) -> Result<SinkControl> {
        self.renderer
            .update_texture(frame.width, frame.height, &frame.to_rgba())?;
        self.renderer.redraw()?;

        if self.pump_events() {
            Ok(SinkControl::Stop)
        } else {
            Ok(SinkControl::Continue)
        }
    }
}
