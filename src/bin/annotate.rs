//! annotate - batch glove-detection annotator
//!
//! Walks `--input` for jpg/jpeg/png files, runs the detector on each, and
//! writes an annotated copy under `--output` plus a JSON detection log under
//! `--logs`. Unreadable files are skipped with a warning; the batch keeps
//! going.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use glovewatch::ui::Ui;
use glovewatch::{detect, BatchAnnotator, BatchConfig, BatchSummary};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Folder with input images.
    #[arg(long, default_value = "input/")]
    input: PathBuf,
    /// Folder where annotated images are written.
    #[arg(long, default_value = "output/")]
    output: PathBuf,
    /// Folder where detection logs are written.
    #[arg(long, default_value = "logs/")]
    logs: PathBuf,
    /// Confidence threshold for detections, in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    confidence: f32,
    /// Model reference: `stub://` or a path to an ONNX model.
    #[arg(long, env = "GLOVEWATCH_MODEL", default_value = "stub://")]
    model: String,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let mut backend = {
        let _stage = ui.stage("Load detector");
        detect::load_backend(&args.model)?
    };

    let annotator = BatchAnnotator::new(BatchConfig {
        input_dir: args.input,
        output_dir: args.output,
        logs_dir: args.logs,
        confidence_threshold: args.confidence,
    })?;

    let files = annotator.eligible_files()?;
    annotator.prepare_dirs()?;
    backend.warm_up()?;

    let bar = ui.batch_bar(files.len() as u64);
    let mut summary = BatchSummary::default();
    for path in &files {
        match annotator.process_file(backend.as_mut(), path) {
            Ok(log) => {
                summary.processed += 1;
                bar.file_done(&log.filename);
                log::debug!(
                    "processed {} ({} detections)",
                    log.filename,
                    log.detections.len()
                );
            }
            Err(err) => {
                summary.skipped += 1;
                log::warn!("skipping {}: {:#}", path.display(), err);
            }
        }
    }
    bar.finish();

    log::info!(
        "batch complete: {} processed, {} skipped",
        summary.processed,
        summary.skipped
    );
    Ok(())
}
