//! Live camera frame source.
//!
//! This module provides `CameraSource` for pulling frames from a local camera.
//!
//! The camera source is responsible for:
//! - Opening a local device node (e.g., /dev/video0) through V4L2 (feature: ingest-v4l2)
//! - Capturing frames in-memory and normalizing them to RGB24
//! - Producing `Frame` instances until the device fails or the run stops
//!
//! `stub://` devices generate a synthetic scene and never fail.

#[cfg(feature = "ingest-v4l2")]
use anyhow::Context;
use anyhow::Result;
#[cfg(feature = "ingest-v4l2")]
use ouroboros::self_referencing;

use super::synthetic::SyntheticScene;
use super::{Acquired, FrameSource, Origin, SourceStats};
use crate::error::SessionError;
use crate::frame::Frame;

/// Message surfaced when a camera read fails.
pub const CAMERA_READ_FAILED: &str = "Failed to read webcam frame.";

/// Configuration for a camera source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or `stub://<name>`.
    pub device: String,
    /// Requested frame rate. The device may ignore it.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    config: CameraConfig,
    backend: Option<CameraBackend>,
    frames_captured: u64,
}

enum CameraBackend {
    Synthetic(SyntheticScene),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            backend: None,
            frames_captured: 0,
        }
    }

    fn connect(&mut self) -> Result<CameraBackend> {
        if super::is_stub_path(&self.config.device) {
            log::info!(
                "CameraSource: connected to {} (synthetic)",
                self.config.device
            );
            return Ok(CameraBackend::Synthetic(SyntheticScene::new(
                self.config.width,
                self.config.height,
            )));
        }

        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(CameraBackend::Device(DeviceCamera::open(&self.config)?))
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow::anyhow!(
                "camera {} requires the ingest-v4l2 feature",
                self.config.device
            ))
        }
    }
}

impl FrameSource for CameraSource {
    fn origin(&self) -> Origin {
        Origin::Camera
    }

    fn open(&mut self) -> Result<(), SessionError> {
        let backend = self.connect().map_err(SessionError::acquisition)?;
        self.backend = Some(backend);
        self.frames_captured = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Acquired, SessionError> {
        let frame = match self.backend.as_mut() {
            None => {
                return Err(SessionError::Acquisition(format!(
                    "{} (camera {} is not open)",
                    CAMERA_READ_FAILED, self.config.device
                )))
            }
            Some(CameraBackend::Synthetic(scene)) => {
                Frame::from_rgb(scene.next_pixels(), self.config.width, self.config.height)
            }
            #[cfg(feature = "ingest-v4l2")]
            Some(CameraBackend::Device(device)) => device.capture().map_err(|err| {
                log::warn!("CameraSource: capture failed on {}: {:#}", self.config.device, err);
                SessionError::Acquisition(format!("{}: {:#}", CAMERA_READ_FAILED, err))
            })?,
        };
        self.frames_captured += 1;
        Ok(Acquired::Frame(frame))
    }

    fn close(&mut self) {
        if self.backend.take().is_some() {
            log::info!(
                "CameraSource: released {} after {} frames",
                self.config.device,
                self.frames_captured
            );
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames_captured,
            label: self.config.device.clone(),
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}

// ----------------------------------------------------------------------------
// V4L2 device capture
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
struct DeviceCamera {
    state: DeviceState,
    format: super::normalize::PixelFormat,
    width: u32,
    height: u32,
}

#[cfg(feature = "ingest-v4l2")]
#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceCamera {
    fn open(config: &CameraConfig) -> Result<Self> {
        use super::normalize::PixelFormat;
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&config.device)
            .with_context(|| format!("open v4l2 device {}", config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"YUYV");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).with_context(|| {
            format!(
                "unsupported v4l2 pixel format {} on {}",
                format.fourcc, config.device
            )
        })?;

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    config.device,
                    err
                );
            }
        }

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "CameraSource: connected to {} ({}x{} {:?})",
            config.device,
            format.width,
            format.height,
            pixel_format
        );
        Ok(Self {
            state,
            format: pixel_format,
            width: format.width,
            height: format.height,
        })
    }

    fn capture(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let (width, height, format) = (self.width, self.height, self.format);
        self.state.with_mut(|fields| {
            let (buf, meta) = fields
                .stream
                .next()
                .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;
            let used = (meta.bytesused as usize).min(buf.len());
            let rgb = super::normalize::normalize_to_rgb(&buf[..used], width, height, format)?;
            Ok(Frame::from_rgb(rgb, width, height))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            target_fps: 30,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn stub_camera_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config());
        source.open()?;

        for _ in 0..3 {
            match source.next_frame()? {
                Acquired::Frame(frame) => {
                    assert_eq!(frame.width, 64);
                    assert_eq!(frame.height, 48);
                    frame.validate()?;
                }
                Acquired::EndOfStream => panic!("camera stream must not end"),
            }
        }
        assert_eq!(source.stats().frames_captured, 3);
        Ok(())
    }

    #[test]
    fn unopened_camera_reports_acquisition_error() {
        let mut source = CameraSource::new(stub_config());
        let err = source.next_frame().unwrap_err();
        assert!(matches!(err, SessionError::Acquisition(_)));
    }

    #[test]
    fn close_is_idempotent_and_releases_handle() -> Result<()> {
        let mut source = CameraSource::new(stub_config());
        source.open()?;
        source.close();
        source.close();
        assert!(source.next_frame().is_err());
        Ok(())
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn device_camera_requires_feature() {
        let mut source = CameraSource::new(CameraConfig::default());
        let err = source.open().unwrap_err();
        assert!(matches!(err, SessionError::Acquisition(msg) if msg.contains("ingest-v4l2")));
    }
}
