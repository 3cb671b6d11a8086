//! Fire Watch
//!
//! This crate implements a detection session controller for fire monitoring.
//!
//! # Architecture
//!
//! A session repeatedly acquires a frame from one origin (webcam, uploaded image or
//! video file), runs an object detector over it, reduces the detections to a single
//! "fire present" flag, and appends that flag to an append-only, timestamped log.
//!
//! 1. **One source per run**: the controller owns the frame source and closes it on
//!    every exit path.
//! 2. **Sequential cycles**: acquire, detect, classify, log. Cycles never overlap.
//! 3. **Cooperative stop**: stop requests take effect at the next cycle boundary.
//! 4. **Append-only log**: every cycle is recorded, repeats included. Only an explicit
//!    reset clears it.
//!
//! # Module Structure
//!
//! - `frame`: RGB frame buffers
//! - `ingest`: Frame sources (camera, image, video)
//! - `detect`: Detector adapter, backends, annotation
//! - `classify`: Detection result → fire flag
//! - `event_log`: Session log, snapshots and CSV export
//! - `alert`: Alert sinks
//! - `session`: The controller state machine
//! - `config`: File + environment configuration

pub mod alert;
pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod event_log;
pub mod frame;
pub mod ingest;
pub mod session;

pub use alert::{AlertFanout, AlertSink, LogAlert, TerminalBell};
pub use classify::{classify, TARGET_CLASS_ID};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use detect::{
    annotate, BoundingBox, Detection, DetectionResult, Detector, DetectorBackend, ModelDetector,
    StubBackend,
};
pub use error::SessionError;
pub use event_log::{parse_export, LogCounts, LogReader, SessionEvent, SessionLog};
pub use frame::Frame;
pub use ingest::{
    Acquired, CameraConfig, CameraSource, FrameSource, ImageInput, ImageSource, Origin,
    SourceInput, SourceStats, VideoConfig, VideoInput, VideoSource,
};
pub use session::{
    Controls, CycleReport, NullPresenter, Phase, Presenter, RunSettings, RunSummary, Session,
    Status, StopHandle, StopReason, Theme, Tick,
};
