//! fire_watch - terminal fire detection monitor
//!
//! Runs one detection session against a webcam, an image or a video file:
//! 1. Loads config (FIRE_WATCH_CONFIG JSON + FIRE_WATCH_* env), applies CLI flags, validates
//! 2. Builds the detector backend (stub heuristic or ONNX via tract)
//! 3. Drives the session until EOF, Ctrl-C or a fatal source error
//! 4. Prints the event log, writes the CSV export and the run summary

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use fire_watch::config::{BackendKind, FireWatchConfig, Overrides};
use fire_watch::{
    AlertFanout, DetectorBackend, LogAlert, ModelDetector, Origin, Session, SessionLog,
    StubBackend, TerminalBell, Theme,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame origin (camera|image|video).
    #[arg(long)]
    source: Option<Origin>,
    /// Image or video file (or stub://<name>) for non-camera sources.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Camera device path (or stub://<name>).
    #[arg(long)]
    camera: Option<String>,
    /// Confidence threshold in [0.1, 1.0].
    #[arg(long)]
    threshold: Option<f32>,
    /// Disable alerts for this run.
    #[arg(long)]
    no_alert: bool,
    /// Do not print the event log after the run.
    #[arg(long)]
    hide_log: bool,
    /// Display theme (light|dark).
    #[arg(long)]
    theme: Option<Theme>,
    /// Detector backend (stub|tract).
    #[arg(long)]
    backend: Option<BackendKind>,
    /// ONNX model path for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Write the CSV event log here after the run.
    #[arg(long)]
    export: Option<PathBuf>,
    /// Minimum pause between cycles for camera and video sources.
    #[arg(long, value_name = "MS")]
    cycle_delay_ms: Option<u64>,
    /// Stop a video run after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut cfg = FireWatchConfig::from_env()?;
    cfg.apply_overrides(&args.overrides());
    cfg.validate()?;

    let detector = {
        let _stage = ui.stage(&format!("Loading {} detector", cfg.detector.backend));
        ModelDetector::new(build_backend(&cfg)?)?
    };
    log::info!("fire_watch: detector backend {}", detector.backend_name());

    let alerts = AlertFanout::new().with(LogAlert).with(TerminalBell);
    let mut session = Session::new(detector, cfg.controls.clone())
        .with_alert_sink(alerts)
        .with_cycle_delay(cfg.cycle_delay);

    let stop = session.stop_handle();
    ctrlc::set_handler(move || {
        log::info!("fire_watch: stop requested");
        stop.request();
    })
    .context("error setting Ctrl-C handler")?;

    session
        .start_input(cfg.source_input()?)
        .map_err(|e| anyhow!("failed to start {} source: {}", cfg.origin, e))?;

    let mut presenter = ui.presenter(cfg.controls.theme);
    let outcome = session.run(&mut presenter);

    if cfg.controls.show_log {
        print_log(session.log());
    }
    if let Some(path) = &cfg.export_path {
        session.log().export_to_path(path)?;
        log::info!("fire_watch: log exported to {}", path.display());
    }

    let summary = match outcome {
        Ok(summary) => summary,
        Err(err) => {
            // The source is already released; the closing line still applies.
            if let Some(message) = session.last_summary().and_then(|s| s.closing_message()) {
                eprintln!("{message}");
            }
            return Err(anyhow!("{} run failed: {}", cfg.origin, err));
        }
    };
    println!("{summary}");
    Ok(())
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            origin: self.source,
            input: self.input.clone(),
            camera: self.camera.clone(),
            threshold: self.threshold,
            no_alert: self.no_alert,
            hide_log: self.hide_log,
            theme: self.theme,
            backend: self.backend,
            model: self.model.clone(),
            export: self.export.clone(),
            cycle_delay_ms: self.cycle_delay_ms,
            max_frames: self.max_frames,
        }
    }
}

fn build_backend(cfg: &FireWatchConfig) -> Result<Box<dyn DetectorBackend>> {
    match cfg.detector.backend {
        BackendKind::Stub => Ok(Box::new(StubBackend::new())),
        BackendKind::Tract => build_tract_backend(cfg),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract_backend(cfg: &FireWatchConfig) -> Result<Box<dyn DetectorBackend>> {
    let model = cfg
        .detector
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("the tract backend requires --model"))?;
    Ok(Box::new(fire_watch::TractBackend::new(
        model,
        cfg.detector.input_size,
    )?))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract_backend(_cfg: &FireWatchConfig) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "the tract backend requires building with --features backend-tract"
    ))
}

fn print_log(log: &SessionLog) {
    let counts = log.counts();
    println!(
        "Detection log ({} entries, {} with fire)",
        counts.total, counts.detected
    );
    println!("{:<10} {}", "Time", "Event");
    for event in log.snapshot() {
        println!("{:<10} {}", event.clock_time(), event.label());
    }
}
