//! Frame container.
//!
//! - `Frame`: immutable RGB24 raster for one acquisition step.
//!
//! A frame is produced by an ingest source, handed to the detector for one cycle and
//! dropped when the cycle ends. There is no mutable pixel access; the annotated copy a
//! detector returns is a new `Frame`.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// Channel depth of every frame (packed RGB).
pub const CHANNELS: u32 = 3;

/// Immutable RGB raster.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packed RGB24, row-major.
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap packed RGB24 pixels.
    ///
    /// The length is not checked here; a malformed frame is rejected by the detector
    /// (see `validate`) so it costs a skipped cycle instead of a dead source.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgb(image.into_raw(), width, height)
    }

    pub fn channels(&self) -> u32 {
        CHANNELS
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Byte length implied by the dimensions, `None` on overflow.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(CHANNELS as usize))
    }

    /// Check that the raster shape matches its pixel buffer.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "frame has zero dimension ({}x{})",
                self.width,
                self.height
            ));
        }
        let expected = self
            .expected_len()
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if self.data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                self.width,
                self.height,
                self.data.len()
            ));
        }
        Ok(())
    }

    /// Copy into an `RgbImage` for drawing or resizing.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        self.validate()?;
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| anyhow!("frame buffer does not fit {}x{}", self.width, self.height))
    }
}

// Pixel content stays out of debug output and logs.
impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_frame_validates() -> Result<()> {
        let frame = Frame::from_rgb(vec![0u8; 4 * 2 * 3], 4, 2);
        frame.validate()?;
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.expected_len(), Some(24));
        Ok(())
    }

    #[test]
    fn short_buffer_is_rejected() {
        let frame = Frame::from_rgb(vec![0u8; 10], 4, 2);
        assert!(frame.validate().is_err());
        assert!(frame.to_rgb_image().is_err());
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let frame = Frame::from_rgb(Vec::new(), 0, 10);
        assert!(frame.validate().is_err());
    }

    #[test]
    fn image_round_trip_keeps_pixels() -> Result<()> {
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(1, 1, image::Rgb([10, 20, 30]));
        let frame = Frame::from_image(image.clone());
        assert_eq!(frame.width, 3);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.to_rgb_image()?, image);
        Ok(())
    }

    #[test]
    fn debug_output_hides_pixels() {
        let frame = Frame::from_rgb(vec![7u8; 12], 2, 2);
        let rendered = format!("{frame:?}");
        assert!(rendered.contains("bytes: 12"));
        assert!(!rendered.contains("7, 7"));
    }
}
