use crate::detect::annotate::annotate;
use crate::detect::backend::DetectorBackend;
use crate::detect::result::DetectionResult;
use crate::error::SessionError;
use crate::frame::Frame;

/// What the session controller calls once per cycle.
///
/// Contract:
/// - Only objects with `confidence >= threshold` are reported.
/// - An annotated frame is always returned, even with no objects.
/// - A malformed frame fails with `SessionError::Inference`.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame, threshold: f32) -> Result<DetectionResult, SessionError>;
}

/// Production detector: validates, delegates to a backend, filters, annotates.
pub struct ModelDetector {
    backend: Box<dyn DetectorBackend>,
}

impl ModelDetector {
    /// Wrap a backend and run its warm-up hook.
    pub fn new(mut backend: Box<dyn DetectorBackend>) -> anyhow::Result<Self> {
        backend.warm_up()?;
        log::info!("detector backend '{}' ready", backend.name());
        Ok(Self { backend })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

impl Detector for ModelDetector {
    fn detect(&mut self, frame: &Frame, threshold: f32) -> Result<DetectionResult, SessionError> {
        frame.validate().map_err(SessionError::inference)?;
        let mut objects = self
            .backend
            .detect(frame)
            .map_err(SessionError::inference)?;
        objects.retain(|object| object.confidence >= threshold);
        let annotated = annotate(frame, &objects);
        Ok(DetectionResult { objects, annotated })
    }
}
