mod adapter;
mod annotate;
mod backend;
mod backends;
mod result;

pub use adapter::{Detector, ModelDetector};
pub use annotate::annotate;
pub use backend::DetectorBackend;
pub use backends::{yolo, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BoundingBox, Detection, DetectionResult};
