//! Single-image frame source.
//!
//! Yields exactly one frame decoded from an uploaded JPEG or PNG buffer, then
//! `EndOfStream`. Bytes that do not decode fail the run with `SessionError::Decode`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{Acquired, FrameSource, Origin, SourceStats};
use crate::error::SessionError;
use crate::frame::Frame;

/// Upload kinds accepted for image runs.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Clone, Debug)]
pub enum ImageInput {
    /// Local image file, read when the source opens.
    Path(PathBuf),
    /// Raw uploaded bytes.
    Bytes(Vec<u8>),
}

pub struct ImageSource {
    input: ImageInput,
    bytes: Option<Vec<u8>>,
    delivered: bool,
}

impl ImageSource {
    pub fn new(input: ImageInput) -> Self {
        Self {
            input,
            bytes: None,
            delivered: false,
        }
    }

    fn label(&self) -> String {
        match &self.input {
            ImageInput::Path(path) => path.display().to_string(),
            ImageInput::Bytes(bytes) => format!("upload ({} bytes)", bytes.len()),
        }
    }
}

impl FrameSource for ImageSource {
    fn origin(&self) -> Origin {
        Origin::Image
    }

    fn open(&mut self) -> Result<(), SessionError> {
        let bytes = match &self.input {
            ImageInput::Path(path) => {
                super::check_extension(path, IMAGE_EXTENSIONS)
                    .and_then(|_| {
                        std::fs::read(path)
                            .with_context(|| format!("read image {}", path.display()))
                    })
                    .map_err(SessionError::acquisition)?
            }
            ImageInput::Bytes(bytes) => bytes.clone(),
        };
        self.bytes = Some(bytes);
        self.delivered = false;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Acquired, SessionError> {
        if self.delivered {
            return Ok(Acquired::EndOfStream);
        }
        let bytes = self
            .bytes
            .take()
            .ok_or_else(|| SessionError::Acquisition("image source is not open".to_string()))?;
        self.delivered = true;
        let frame = decode_image(&bytes).map_err(SessionError::decode)?;
        log::debug!(
            "ImageSource: decoded {}x{} from {}",
            frame.width,
            frame.height,
            self.label()
        );
        Ok(Acquired::Frame(frame))
    }

    fn close(&mut self) {
        self.bytes = None;
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: u64::from(self.delivered),
            label: self.label(),
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory(bytes).context("decode image upload")?;
    Ok(Frame::from_image(image.into_rgb8()))
}
