//! live - glove-detection live viewer
//!
//! Opens the configured camera, annotates every frame, and shows it in a
//! preview window (feature `viewer-gui`; headless otherwise). Exits on
//! end-of-stream, `q`/Escape, window close, or SIGINT. Configuration comes
//! from `GLOVEWATCH_CONFIG` / `GLOVEWATCH_*` environment variables.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use glovewatch::{detect, CameraSource, Viewer, ViewerConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = ViewerConfig::load()?;
    log::info!(
        "camera={} model={} threshold={}",
        cfg.camera.device,
        cfg.model,
        cfg.confidence_threshold
    );

    let mut backend = detect::load_backend(&cfg.model)?;
    let mut source = CameraSource::new(cfg.camera.clone())?;
    source.connect()?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))?;
    }

    let viewer = Viewer::new(cfg.confidence_threshold);

    #[cfg(feature = "viewer-gui")]
    let mut sink = glovewatch::gui::PreviewWindow::open(
        &cfg.window_title,
        cfg.camera.width,
        cfg.camera.height,
    )?;
    #[cfg(not(feature = "viewer-gui"))]
    let mut sink = {
        log::warn!("built without viewer-gui; running headless");
        glovewatch::HeadlessSink::default()
    };

    let summary = viewer.run(&mut source, backend.as_mut(), &mut sink, &stop)?;
    log::info!(
        "viewer done: {} frames from {}",
        summary.frames,
        source.stats().device
    );
    Ok(())
}
