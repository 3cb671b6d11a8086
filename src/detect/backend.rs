use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend wraps one object-detection capability (a model, a heuristic). It returns
/// raw candidates for every class it scores; threshold filtering, annotation and shape
/// validation belong to the adapter (`ModelDetector`), so every backend gets them.
///
/// Implementations must treat the frame as read-only and must not retain it past the
/// `detect` call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a validated RGB frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once when the adapter is built.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
