use anyhow::Result;

use crate::classify::TARGET_CLASS_ID;
use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::Frame;

/// Share of flame-colored pixels below which nothing is reported.
const MIN_FLAME_FRACTION: f32 = 0.005;

/// Stub backend for demos and tests. Scores fire by counting flame-colored pixels.
///
/// A pixel counts as flame when it is bright, red-dominant and ordered r > g > b.
/// Confidence grows with the flame share of the frame; the box is the bounding
/// rectangle of all flame pixels.
#[derive(Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

fn is_flame(r: u8, g: u8, b: u8) -> bool {
    r >= 180 && r > g && g > b && r.saturating_sub(b) >= 60
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let mut count = 0usize;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (usize::MAX, usize::MAX, 0, 0);

        for (i, px) in frame.pixels().chunks_exact(3).enumerate() {
            if is_flame(px[0], px[1], px[2]) {
                let (x, y) = (i % width, i / width);
                count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        let fraction = count as f32 / (width * height).max(1) as f32;
        if fraction < MIN_FLAME_FRACTION {
            return Ok(Vec::new());
        }

        let bbox = BoundingBox::new(
            min_x as f32 / width as f32,
            min_y as f32 / height as f32,
            (max_x + 1 - min_x) as f32 / width as f32,
            (max_y + 1 - min_y) as f32 / height as f32,
        );
        Ok(vec![Detection {
            class_id: TARGET_CLASS_ID,
            confidence: (0.5 + fraction * 5.0).min(0.99),
            bbox,
        }])
    }
}
