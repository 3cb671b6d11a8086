use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::event_log::SessionEvent;
use crate::frame::Frame;
use crate::ingest::Origin;

/// Lifecycle phase of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Stopped,
}

/// Display theme preference. Carried for the presenter; the controller ignores it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow!("unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

/// Per-cycle status indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Detected,
    Clear,
}

/// Everything the presenter needs after one completed cycle.
#[derive(Clone, Debug)]
pub struct CycleReport {
    /// 1-based index of the frame within the run.
    pub cycle: u64,
    pub origin: Origin,
    pub event: SessionEvent,
    pub status: Status,
    /// `detected && alert_enabled` for this run.
    pub alert: bool,
    /// 100 when detected, 0 otherwise.
    pub progress: u8,
    pub objects: usize,
    pub annotated: Frame,
}

impl CycleReport {
    pub fn status_text(&self) -> &'static str {
        match (self.origin, self.status) {
            (Origin::Image, Status::Detected) => "Fire Detected in Image!",
            (Origin::Image, Status::Clear) => "No Fire in Image.",
            (_, Status::Detected) => "Fire Detected!",
            (_, Status::Clear) => "No Fire Detected.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of frames.
    EndOfStream,
    /// `stop()` or a `StopHandle` took effect at a cycle boundary.
    Requested,
    /// A fatal source error ended the run.
    Failed(SessionError),
}

/// Outcome of one `tick()`.
#[derive(Debug)]
pub enum Tick {
    Cycle(CycleReport),
    /// The detector rejected the frame; nothing was logged.
    Skipped { cycle: u64, reason: SessionError },
    Stopped(StopReason),
}

/// Totals for one finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub origin: Origin,
    /// Source label (device path, file name or upload size).
    pub source: String,
    /// Frames pulled from the source.
    pub frames: u64,
    /// Cycles that produced a log entry.
    pub logged: u64,
    pub detections: u64,
    pub skipped: u64,
    pub reason: StopReason,
}

impl RunSummary {
    /// Closing line shown to the operator, if the origin has one. Shown after
    /// failures too, once the source has been released.
    pub fn closing_message(&self) -> Option<&'static str> {
        match self.origin {
            Origin::Camera => Some("Webcam detection stopped."),
            Origin::Video => Some("Video processing completed."),
            Origin::Image => None,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} run on {}: {} frames, {} logged, {} with fire, {} skipped",
            self.origin, self.source, self.frames, self.logged, self.detections, self.skipped
        )
    }
}
