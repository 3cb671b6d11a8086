//! Frame ingestion sources.
//!
//! This module provides the three origins a session can run against:
//! - Camera (V4L2 devices, feature: ingest-v4l2; `stub://` synthetic otherwise)
//! - Image (a single uploaded JPEG/PNG buffer)
//! - Video (local files or uploaded bytes, feature: ingest-video-ffmpeg; `stub://` clips)
//!
//! Every source implements `FrameSource`. The session controller owns the source for
//! the duration of one run and calls `close()` on every exit path.
//!
//! Sources MUST NOT:
//! - Store decoded frames to disk
//! - Log raw frame content

pub mod camera;
pub mod image;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod synthetic;
pub mod video;
#[cfg(feature = "ingest-video-ffmpeg")]
pub(crate) mod video_ffmpeg;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::frame::Frame;

pub use self::camera::{CameraConfig, CameraSource};
pub use self::image::{ImageInput, ImageSource};
pub use self::video::{VideoConfig, VideoInput, VideoSource};

/// Where frames for a run come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Camera,
    Image,
    Video,
}

impl Origin {
    /// Continuous origins produce many frames and are paced between cycles.
    pub fn is_continuous(self) -> bool {
        !matches!(self, Origin::Image)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Camera => "camera",
            Origin::Image => "image",
            Origin::Video => "video",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "camera" | "webcam" => Ok(Origin::Camera),
            "image" => Ok(Origin::Image),
            "video" => Ok(Origin::Video),
            other => Err(anyhow!(
                "unknown source '{}' (expected camera, image or video)",
                other
            )),
        }
    }
}

/// One pull from a source.
#[derive(Debug)]
pub enum Acquired {
    Frame(Frame),
    EndOfStream,
}

/// Statistics for a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub label: String,
}

/// A lazily pulled, finite or infinite sequence of frames.
pub trait FrameSource: Send {
    fn origin(&self) -> Origin;

    /// Acquire the underlying device or file handle.
    fn open(&mut self) -> Result<(), SessionError>;

    /// Pull the next frame.
    ///
    /// Camera failures are `SessionError::Acquisition`; undecodable image uploads are
    /// `SessionError::Decode`; video decode failures and EOF are `EndOfStream`.
    fn next_frame(&mut self) -> Result<Acquired, SessionError>;

    /// Release the handle. Must be idempotent.
    fn close(&mut self);

    fn stats(&self) -> SourceStats;
}

/// Operator-selected input for a run.
#[derive(Clone, Debug)]
pub enum SourceInput {
    Camera(CameraConfig),
    Image(ImageInput),
    Video(VideoConfig),
}

impl SourceInput {
    pub fn origin(&self) -> Origin {
        match self {
            SourceInput::Camera(_) => Origin::Camera,
            SourceInput::Image(_) => Origin::Image,
            SourceInput::Video(_) => Origin::Video,
        }
    }

    /// Build the (unopened) source for this input.
    pub fn into_source(self) -> Box<dyn FrameSource> {
        match self {
            SourceInput::Camera(config) => Box::new(CameraSource::new(config)),
            SourceInput::Image(input) => Box::new(ImageSource::new(input)),
            SourceInput::Video(config) => Box::new(VideoSource::new(config)),
        }
    }
}

pub(crate) fn is_stub_path(path: &str) -> bool {
    path.starts_with("stub://")
}

/// Reject uploads whose extension is not in `allowed` (case-insensitive).
pub(crate) fn check_extension(path: &Path, allowed: &[&str]) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("{} has no file extension", path.display()))?;
    if allowed.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(anyhow!(
            "unsupported file type '.{}' (expected one of: {})",
            ext,
            allowed.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_parses_operator_spellings() -> Result<()> {
        assert_eq!("Webcam".parse::<Origin>()?, Origin::Camera);
        assert_eq!(" image ".parse::<Origin>()?, Origin::Image);
        assert_eq!("VIDEO".parse::<Origin>()?, Origin::Video);
        assert!("rtsp".parse::<Origin>().is_err());
        Ok(())
    }

    #[test]
    fn only_image_origin_is_single_shot() {
        assert!(Origin::Camera.is_continuous());
        assert!(Origin::Video.is_continuous());
        assert!(!Origin::Image.is_continuous());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let allowed = ["mp4", "avi", "mov"];
        assert!(check_extension(Path::new("/tmp/clip.MP4"), &allowed).is_ok());
        assert!(check_extension(Path::new("/tmp/clip.mkv"), &allowed).is_err());
        assert!(check_extension(Path::new("/tmp/clip"), &allowed).is_err());
    }

    #[test]
    fn source_input_reports_origin() {
        let input = SourceInput::Image(ImageInput::Bytes(vec![1, 2, 3]));
        assert_eq!(input.origin(), Origin::Image);
        let source = input.into_source();
        assert_eq!(source.origin(), Origin::Image);
    }
}
