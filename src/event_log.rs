//! Session event log.
//!
//! Append-only, insertion-ordered record of every classification tick. Nothing is
//! collapsed: consecutive identical events are each recorded, so the log reads as an
//! audit trail rather than a list of transitions.
//!
//! The session controller is the only writer. Presentation threads read through a
//! `LogReader`, which always observes whole events.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, SecondsFormat, SubsecRound};

pub const EXPORT_HEADER: &str = "timestamp,event";

/// Default file name for CSV exports.
pub const DEFAULT_EXPORT_FILE: &str = "fire_detection_log.csv";

const LABEL_DETECTED: &str = "Fire Detected";
const LABEL_CLEAR: &str = "No Fire";

/// One classification tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEvent {
    pub timestamp: DateTime<Local>,
    pub detected: bool,
}

impl SessionEvent {
    /// Stamp an event with the current local time (millisecond precision).
    pub fn now(detected: bool) -> Self {
        Self::at(Local::now(), detected)
    }

    pub fn at(timestamp: DateTime<Local>, detected: bool) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(3),
            detected,
        }
    }

    pub fn label(&self) -> &'static str {
        if self.detected {
            LABEL_DETECTED
        } else {
            LABEL_CLEAR
        }
    }

    /// Wall-clock time as shown in the log table.
    pub fn clock_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Entry totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogCounts {
    pub total: usize,
    pub detected: usize,
}

/// Append-only session log.
#[derive(Debug, Default)]
pub struct SessionLog {
    entries: Arc<RwLock<Vec<SessionEvent>>>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: SessionEvent) {
        write_guard(&self.entries).push(event);
    }

    /// Explicit session reset. Starting a run never calls this.
    pub fn reset(&self) {
        write_guard(&self.entries).clear();
    }

    pub fn len(&self) -> usize {
        read_guard(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> LogCounts {
        counts(&read_guard(&self.entries))
    }

    /// Events, most recent first.
    pub fn snapshot(&self) -> Vec<SessionEvent> {
        snapshot(&read_guard(&self.entries))
    }

    /// CSV export in insertion order.
    pub fn export(&self) -> Vec<u8> {
        export(&read_guard(&self.entries))
    }

    pub fn export_to_path(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.export())
            .with_context(|| format!("write log export {}", path.display()))
    }

    /// Read handle for another thread.
    pub fn reader(&self) -> LogReader {
        LogReader {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// Snapshot-consistent read handle onto a `SessionLog`.
#[derive(Clone, Debug)]
pub struct LogReader {
    entries: Arc<RwLock<Vec<SessionEvent>>>,
}

impl LogReader {
    pub fn len(&self) -> usize {
        read_guard(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> LogCounts {
        counts(&read_guard(&self.entries))
    }

    pub fn snapshot(&self) -> Vec<SessionEvent> {
        snapshot(&read_guard(&self.entries))
    }

    pub fn export(&self) -> Vec<u8> {
        export(&read_guard(&self.entries))
    }
}

// A writer that panicked mid-push cannot leave a half-written event behind, so the
// data behind a poisoned lock is still whole.
fn read_guard(lock: &RwLock<Vec<SessionEvent>>) -> RwLockReadGuard<'_, Vec<SessionEvent>> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_guard(lock: &RwLock<Vec<SessionEvent>>) -> RwLockWriteGuard<'_, Vec<SessionEvent>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn counts(entries: &[SessionEvent]) -> LogCounts {
    LogCounts {
        total: entries.len(),
        detected: entries.iter().filter(|e| e.detected).count(),
    }
}

fn snapshot(entries: &[SessionEvent]) -> Vec<SessionEvent> {
    // Reverse first so equal timestamps keep the later insertion on top.
    let mut events: Vec<SessionEvent> = entries.iter().rev().cloned().collect();
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

fn export(entries: &[SessionEvent]) -> Vec<u8> {
    let mut out = String::with_capacity(32 * (entries.len() + 1));
    out.push_str(EXPORT_HEADER);
    out.push('\n');
    for event in entries {
        let _ = writeln!(
            out,
            "{},{}",
            event
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, false),
            event.label()
        );
    }
    out.into_bytes()
}

/// Parse bytes produced by `SessionLog::export`.
pub fn parse_export(bytes: &[u8]) -> Result<Vec<SessionEvent>> {
    let text = std::str::from_utf8(bytes).context("log export is not UTF-8")?;
    let mut lines = text.lines();
    match lines.next() {
        Some(EXPORT_HEADER) => {}
        other => {
            return Err(anyhow!(
                "log export header mismatch: expected '{}', found {:?}",
                EXPORT_HEADER,
                other
            ))
        }
    }

    lines
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| -> Result<SessionEvent> {
            let (timestamp, label) = line
                .split_once(',')
                .ok_or_else(|| anyhow!("row {}: missing ',' separator", i + 1))?;
            let timestamp = DateTime::parse_from_rfc3339(timestamp)
                .with_context(|| format!("row {}: bad timestamp '{}'", i + 1, timestamp))?
                .with_timezone(&Local);
            let detected = match label {
                LABEL_DETECTED => true,
                LABEL_CLEAR => false,
                other => return Err(anyhow!("row {}: unknown event '{}'", i + 1, other)),
            };
            Ok(SessionEvent {
                timestamp,
                detected,
            })
        })
        .collect()
}
