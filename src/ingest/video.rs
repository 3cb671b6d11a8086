//! Stored video frame source.
//!
//! This module provides `VideoSource` for reading frames from a local video file or an
//! uploaded byte buffer.
//! The video source is responsible for:
//! - Spooling uploaded bytes to a temporary file that is deleted on close
//! - Decoding frames in-memory (feature: ingest-video-ffmpeg)
//! - Ending the stream at EOF, at `max_frames`, or on the first decode failure
//!
//! Decode failures are not errors for this origin: they end the stream the same way
//! EOF does. Only failing to open the file is an acquisition error.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::synthetic::SyntheticScene;
#[cfg(feature = "ingest-video-ffmpeg")]
use super::video_ffmpeg::FfmpegVideoDecoder;
use super::{Acquired, FrameSource, Origin, SourceStats};
use crate::error::SessionError;
use crate::frame::Frame;

/// Upload kinds accepted for video runs.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// Length of a `stub://` clip when no `max_frames` is configured.
pub const SYNTHETIC_CLIP_FRAMES: u64 = 150;

const SYNTHETIC_WIDTH: u32 = 320;
const SYNTHETIC_HEIGHT: u32 = 240;

#[derive(Clone, Debug)]
pub enum VideoInput {
    /// Local file path or `stub://<name>`.
    Path(PathBuf),
    /// Raw uploaded bytes.
    Bytes(Vec<u8>),
}

/// Configuration for a video source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    pub input: VideoInput,
    /// Stop after this many frames even if the file has more.
    pub max_frames: Option<u64>,
}

impl VideoConfig {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            input: VideoInput::Path(path.into()),
            max_frames: None,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            input: VideoInput::Bytes(bytes),
            max_frames: None,
        }
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }
}

/// Video frame source.
pub struct VideoSource {
    config: VideoConfig,
    backend: Option<VideoBackend>,
    /// Upload spool; dropping it deletes the file.
    spool: Option<NamedTempFile>,
    frames_captured: u64,
}

enum VideoBackend {
    Synthetic(SyntheticScene),
    #[cfg(feature = "ingest-video-ffmpeg")]
    Ffmpeg(FfmpegVideoDecoder),
}

impl VideoSource {
    pub fn new(config: VideoConfig) -> Self {
        Self {
            config,
            backend: None,
            spool: None,
            frames_captured: 0,
        }
    }

    fn label(&self) -> String {
        match &self.config.input {
            VideoInput::Path(path) => path.display().to_string(),
            VideoInput::Bytes(bytes) => format!("upload ({} bytes)", bytes.len()),
        }
    }

    fn frame_limit(&self) -> Option<u64> {
        match (&self.backend, self.config.max_frames) {
            (_, Some(limit)) => Some(limit),
            (Some(VideoBackend::Synthetic(_)), None) => Some(SYNTHETIC_CLIP_FRAMES),
            _ => None,
        }
    }

    fn connect(&mut self) -> Result<VideoBackend> {
        let path = match &self.config.input {
            VideoInput::Path(path) => {
                let raw = path.to_string_lossy();
                if super::is_stub_path(&raw) {
                    log::info!("VideoSource: opened {} (synthetic)", raw);
                    return Ok(VideoBackend::Synthetic(SyntheticScene::new(
                        SYNTHETIC_WIDTH,
                        SYNTHETIC_HEIGHT,
                    )));
                }
                super::check_extension(path, VIDEO_EXTENSIONS)?;
                path.clone()
            }
            VideoInput::Bytes(bytes) => {
                let spool = spool_upload(bytes)?;
                let path = spool.path().to_path_buf();
                self.spool = Some(spool);
                path
            }
        };
        open_decoder(&path)
    }
}

#[cfg(feature = "ingest-video-ffmpeg")]
fn open_decoder(path: &Path) -> Result<VideoBackend> {
    let decoder = FfmpegVideoDecoder::open(path)?;
    log::info!("VideoSource: opened {} (ffmpeg)", path.display());
    Ok(VideoBackend::Ffmpeg(decoder))
}

#[cfg(not(feature = "ingest-video-ffmpeg"))]
fn open_decoder(path: &Path) -> Result<VideoBackend> {
    Err(anyhow::anyhow!(
        "decoding {} requires the ingest-video-ffmpeg feature",
        path.display()
    ))
}

fn spool_upload(bytes: &[u8]) -> Result<NamedTempFile> {
    let mut spool = tempfile::Builder::new()
        .prefix("fire-watch-upload-")
        .tempfile()
        .context("create upload spool file")?;
    spool
        .write_all(bytes)
        .and_then(|_| spool.flush())
        .context("write upload spool file")?;
    Ok(spool)
}

impl FrameSource for VideoSource {
    fn origin(&self) -> Origin {
        Origin::Video
    }

    fn open(&mut self) -> Result<(), SessionError> {
        self.frames_captured = 0;
        match self.connect() {
            Ok(backend) => {
                self.backend = Some(backend);
                Ok(())
            }
            Err(err) => {
                self.spool = None;
                Err(SessionError::acquisition(err))
            }
        }
    }

    fn next_frame(&mut self) -> Result<Acquired, SessionError> {
        if self
            .frame_limit()
            .is_some_and(|limit| self.frames_captured >= limit)
        {
            return Ok(Acquired::EndOfStream);
        }

        let frame = match self.backend.as_mut() {
            None => return Ok(Acquired::EndOfStream),
            Some(VideoBackend::Synthetic(scene)) => Some(Frame::from_rgb(
                scene.next_pixels(),
                SYNTHETIC_WIDTH,
                SYNTHETIC_HEIGHT,
            )),
            #[cfg(feature = "ingest-video-ffmpeg")]
            Some(VideoBackend::Ffmpeg(decoder)) => match decoder.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("VideoSource: decode stopped: {:#}", err);
                    None
                }
            },
        };

        match frame {
            Some(frame) => {
                self.frames_captured += 1;
                Ok(Acquired::Frame(frame))
            }
            None => Ok(Acquired::EndOfStream),
        }
    }

    fn close(&mut self) {
        if self.backend.take().is_some() {
            log::info!(
                "VideoSource: released {} after {} frames",
                self.label(),
                self.frames_captured
            );
        }
        if let Some(spool) = self.spool.take() {
            if let Err(err) = spool.close() {
                log::warn!("VideoSource: failed to remove upload spool: {}", err);
            }
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames_captured,
            label: self.label(),
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        self.close();
    }
}
