//! Detection session controller.
//!
//! A `Session` owns the run loop for one operator session:
//!
//! ```text
//!   Idle ──start()──▶ Running ──EOF / stop() / fatal error──▶ Stopped
//!                        ▲                                      │
//!                        └──────────────start()─────────────────┘
//! ```
//!
//! Each `tick()` is one cycle: pull a frame, detect, classify, append to the log, emit a
//! `CycleReport`. Cycles never overlap. `stop()` is polled at the next cycle boundary;
//! an in-flight detector call always completes. Threshold and alert-enabled are captured
//! at `start()` and held for the whole run, so operator changes apply to the next run.
//!
//! The frame source is owned by the run and closed on every exit path.

mod report;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;

use crate::alert::AlertSink;
use crate::classify::classify;
use crate::detect::Detector;
use crate::error::SessionError;
use crate::event_log::{LogReader, SessionEvent, SessionLog};
use crate::ingest::{Acquired, FrameSource, Origin, SourceInput};

pub use report::{CycleReport, Phase, RunSummary, Status, StopReason, Theme, Tick};

pub const DEFAULT_THRESHOLD: f32 = 0.6;
pub const MIN_THRESHOLD: f32 = 0.1;
pub const MAX_THRESHOLD: f32 = 1.0;

/// Minimum pause between cycles of continuous origins.
pub const DEFAULT_CYCLE_DELAY: Duration = Duration::from_millis(30);

/// Operator controls. May change at any time; a run only sees the values captured
/// when it started.
#[derive(Clone, Debug, PartialEq)]
pub struct Controls {
    pub threshold: f32,
    pub alert_enabled: bool,
    pub show_log: bool,
    pub theme: Theme,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            alert_enabled: true,
            show_log: true,
            theme: Theme::Light,
        }
    }
}

impl Controls {
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_threshold(self.threshold)
    }
}

pub fn validate_threshold(threshold: f32) -> anyhow::Result<()> {
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        Ok(())
    } else {
        Err(anyhow!(
            "confidence threshold {} outside {}..={}",
            threshold,
            MIN_THRESHOLD,
            MAX_THRESHOLD
        ))
    }
}

/// Configuration captured at `start()`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSettings {
    pub threshold: f32,
    pub alert_enabled: bool,
}

/// Receives controller output. Every method defaults to a no-op.
pub trait Presenter {
    fn on_cycle(&mut self, _report: &CycleReport) {}

    fn on_skipped(&mut self, _cycle: u64, _reason: &SessionError) {}

    fn on_stopped(&mut self, _summary: &RunSummary) {}

    fn on_error(&mut self, _error: &SessionError) {}
}

/// Presenter that discards everything.
#[derive(Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

/// Requests a stop from another thread (e.g. a Ctrl-C handler).
///
/// The request is honored at the next cycle boundary, exactly like `Session::stop`.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct ActiveRun {
    source: Box<dyn FrameSource>,
    origin: Origin,
    settings: RunSettings,
    frames: u64,
    logged: u64,
    detections: u64,
    skipped: u64,
}

impl ActiveRun {
    fn summary(&self, reason: StopReason) -> RunSummary {
        RunSummary {
            origin: self.origin,
            source: self.source.stats().label,
            frames: self.frames,
            logged: self.logged,
            detections: self.detections,
            skipped: self.skipped,
            reason,
        }
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.source.close();
    }
}

pub struct Session<D: Detector> {
    detector: D,
    controls: Controls,
    phase: Phase,
    log: SessionLog,
    run: Option<ActiveRun>,
    last_event: Option<SessionEvent>,
    last_summary: Option<RunSummary>,
    stop: StopHandle,
    alert_sink: Option<Box<dyn AlertSink>>,
    cycle_delay: Duration,
}

impl<D: Detector> Session<D> {
    pub fn new(detector: D, controls: Controls) -> Self {
        Self {
            detector,
            controls,
            phase: Phase::Idle,
            log: SessionLog::new(),
            run: None,
            last_event: None,
            last_summary: None,
            stop: StopHandle::default(),
            alert_sink: None,
            cycle_delay: DEFAULT_CYCLE_DELAY,
        }
    }

    pub fn with_alert_sink(mut self, sink: impl AlertSink + 'static) -> Self {
        self.alert_sink = Some(Box::new(sink));
        self
    }

    /// Override the pause between continuous cycles.
    pub fn with_cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = delay;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn set_threshold(&mut self, threshold: f32) -> anyhow::Result<()> {
        validate_threshold(threshold)?;
        self.controls.threshold = threshold;
        Ok(())
    }

    pub fn set_alert_enabled(&mut self, enabled: bool) {
        self.controls.alert_enabled = enabled;
    }

    pub fn set_show_log(&mut self, show: bool) {
        self.controls.show_log = show;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.controls.theme = theme;
    }

    /// Settings the current run captured, if one is active.
    pub fn run_settings(&self) -> Option<RunSettings> {
        self.run.as_ref().map(|run| run.settings)
    }

    pub fn last_event(&self) -> Option<&SessionEvent> {
        self.last_event.as_ref()
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn log_reader(&self) -> LogReader {
        self.log.reader()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Open `source` and enter `Running`.
    ///
    /// Rejected with `AlreadyRunning` while a run is active. If the source cannot be
    /// opened the session ends up `Stopped` and the error is returned.
    pub fn start(&mut self, mut source: Box<dyn FrameSource>) -> Result<(), SessionError> {
        if self.phase == Phase::Running {
            return Err(SessionError::AlreadyRunning);
        }

        let origin = source.origin();
        let settings = RunSettings {
            threshold: self.controls.threshold,
            alert_enabled: self.controls.alert_enabled,
        };
        self.stop.clear();

        if let Err(err) = source.open() {
            source.close();
            log::error!("session: failed to open {} source: {}", origin, err);
            self.phase = Phase::Stopped;
            self.last_summary = Some(RunSummary {
                origin,
                source: source.stats().label,
                frames: 0,
                logged: 0,
                detections: 0,
                skipped: 0,
                reason: StopReason::Failed(err.clone()),
            });
            return Err(err);
        }

        log::info!(
            "session: started {} run (threshold={:.2}, alerts={})",
            origin,
            settings.threshold,
            settings.alert_enabled
        );
        self.run = Some(ActiveRun {
            source,
            origin,
            settings,
            frames: 0,
            logged: 0,
            detections: 0,
            skipped: 0,
        });
        self.phase = Phase::Running;
        Ok(())
    }

    /// Build the source for `input` and start it.
    pub fn start_input(&mut self, input: SourceInput) -> Result<(), SessionError> {
        if self.phase == Phase::Running {
            return Err(SessionError::AlreadyRunning);
        }
        self.start(input.into_source())
    }

    /// Request a stop at the next cycle boundary. Rejected unless `Running`.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Running {
            return Err(SessionError::NotRunning);
        }
        self.stop.request();
        Ok(())
    }

    /// Run one cycle.
    ///
    /// Fatal source errors end the run (`Stopped`, source closed) and are returned as
    /// `Err`. Inference errors skip the cycle and are returned as `Tick::Skipped`.
    pub fn tick(&mut self) -> Result<Tick, SessionError> {
        if self.phase != Phase::Running {
            return Err(SessionError::NotRunning);
        }
        let Some(run) = self.run.as_mut() else {
            return Err(SessionError::NotRunning);
        };

        if self.stop.is_requested() {
            return Ok(Tick::Stopped(self.finish(StopReason::Requested).reason));
        }

        let frame = match run.source.next_frame() {
            Ok(Acquired::Frame(frame)) => frame,
            Ok(Acquired::EndOfStream) => {
                return Ok(Tick::Stopped(self.finish(StopReason::EndOfStream).reason));
            }
            Err(reason @ SessionError::Inference(_)) => {
                run.frames += 1;
                run.skipped += 1;
                log::warn!("session: cycle {} skipped: {}", run.frames, reason);
                return Ok(Tick::Skipped {
                    cycle: run.frames,
                    reason,
                });
            }
            Err(err) => {
                log::error!("session: {} source failed: {}", run.origin, err);
                self.finish(StopReason::Failed(err.clone()));
                return Err(err);
            }
        };
        run.frames += 1;
        let cycle = run.frames;

        let result = match self.detector.detect(&frame, run.settings.threshold) {
            Ok(result) => result,
            Err(reason) => {
                run.skipped += 1;
                log::warn!("session: cycle {} skipped: {}", cycle, reason);
                return Ok(Tick::Skipped { cycle, reason });
            }
        };

        let detected = classify(&result);
        let event = SessionEvent::now(detected);
        self.log.append(event.clone());
        run.logged += 1;
        if detected {
            run.detections += 1;
        }

        let alert = detected && run.settings.alert_enabled;
        let report = CycleReport {
            cycle,
            origin: run.origin,
            event: event.clone(),
            status: if detected {
                Status::Detected
            } else {
                Status::Clear
            },
            alert,
            progress: if detected { 100 } else { 0 },
            objects: result.objects.len(),
            annotated: result.annotated,
        };
        log::debug!(
            "session: cycle {} {} ({} objects)",
            cycle,
            event.label(),
            report.objects
        );

        if alert {
            if let Some(sink) = self.alert_sink.as_mut() {
                sink.notify(&event);
            }
        }
        self.last_event = Some(event);
        Ok(Tick::Cycle(report))
    }

    /// Drive `tick()` until the run ends, forwarding every outcome to `presenter`.
    ///
    /// Continuous origins pause `cycle_delay` between cycles; a single image runs once.
    pub fn run(&mut self, presenter: &mut dyn Presenter) -> Result<RunSummary, SessionError> {
        let origin = match &self.run {
            Some(run) if self.phase == Phase::Running => run.origin,
            _ => return Err(SessionError::NotRunning),
        };
        let delay = if origin.is_continuous() {
            self.cycle_delay
        } else {
            Duration::ZERO
        };

        loop {
            match self.tick() {
                Ok(Tick::Cycle(report)) => presenter.on_cycle(&report),
                Ok(Tick::Skipped { cycle, reason }) => presenter.on_skipped(cycle, &reason),
                Ok(Tick::Stopped(_)) => break,
                Err(err) => {
                    presenter.on_error(&err);
                    return Err(err);
                }
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }

        let summary = self
            .last_summary
            .clone()
            .ok_or(SessionError::NotRunning)?;
        presenter.on_stopped(&summary);
        Ok(summary)
    }

    /// Clear the log and return to `Idle`. Rejected while running.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Running {
            return Err(SessionError::AlreadyRunning);
        }
        self.log.reset();
        self.last_event = None;
        self.last_summary = None;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn finish(&mut self, reason: StopReason) -> RunSummary {
        // Dropping the run closes the source.
        let summary = match self.run.take() {
            Some(run) => run.summary(reason),
            None => RunSummary {
                origin: Origin::Camera,
                source: String::new(),
                frames: 0,
                logged: 0,
                detections: 0,
                skipped: 0,
                reason,
            },
        };
        self.phase = Phase::Stopped;
        self.stop.clear();
        log::info!("session: {}", summary);
        if let Some(message) = summary.closing_message() {
            log::info!("{}", message);
        }
        self.last_summary = Some(summary.clone());
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_bounds_are_inclusive() {
        assert!(validate_threshold(MIN_THRESHOLD).is_ok());
        assert!(validate_threshold(MAX_THRESHOLD).is_ok());
        assert!(validate_threshold(0.09).is_err());
        assert!(validate_threshold(1.01).is_err());
    }

    #[test]
    fn stop_handle_is_shared() {
        let handle = StopHandle::default();
        let clone = handle.clone();
        clone.request();
        assert!(handle.is_requested());
        handle.clear();
        assert!(!clone.is_requested());
    }

    #[test]
    fn default_controls_match_operator_defaults() {
        let controls = Controls::default();
        assert_eq!(controls.threshold, 0.6);
        assert!(controls.alert_enabled);
        assert!(controls.show_log);
        assert_eq!(controls.theme, Theme::Light);
    }
}
