//! Synthetic scene generator for `stub://` camera and video sources.
//!
//! Produces a static gradient background. Every `FLAME_PERIOD` frames the scene toggles a
//! flame-colored patch covering a quarter of each axis, so a color-based detector sees
//! alternating "fire" and "clear" stretches.

/// Frames between flame on/off toggles.
pub(crate) const FLAME_PERIOD: u64 = 50;

const FLAME_RGB: [u8; 3] = [255, 120, 20];

pub(crate) struct SyntheticScene {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticScene {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
        }
    }

    /// Whether the frame with this 1-based index carries the flame patch.
    pub(crate) fn flame_visible(index: u64) -> bool {
        (index / FLAME_PERIOD) % 2 == 1
    }

    pub(crate) fn next_pixels(&mut self) -> Vec<u8> {
        self.frame_count += 1;
        let w = self.width as usize;
        let h = self.height as usize;
        let mut pixels = vec![0u8; w * h * 3];

        for y in 0..h {
            for x in 0..w {
                let offset = (y * w + x) * 3;
                let shade = ((x + y + self.frame_count as usize) % 96) as u8 + 40;
                pixels[offset] = shade;
                pixels[offset + 1] = shade;
                pixels[offset + 2] = shade.saturating_add(10);
            }
        }

        if Self::flame_visible(self.frame_count) {
            let (x0, y0) = (w * 3 / 8, h * 3 / 8);
            let (x1, y1) = (x0 + w / 4, y0 + h / 4);
            for y in y0..y1 {
                for x in x0..x1 {
                    let offset = (y * w + x) * 3;
                    pixels[offset..offset + 3].copy_from_slice(&FLAME_RGB);
                }
            }
        }

        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_full_rgb_frames() {
        let mut scene = SyntheticScene::new(16, 8);
        let pixels = scene.next_pixels();
        assert_eq!(pixels.len(), 16 * 8 * 3);
    }

    #[test]
    fn flame_patch_toggles_each_period() {
        assert!(!SyntheticScene::flame_visible(1));
        assert!(!SyntheticScene::flame_visible(FLAME_PERIOD - 1));
        assert!(SyntheticScene::flame_visible(FLAME_PERIOD));
        assert!(SyntheticScene::flame_visible(2 * FLAME_PERIOD - 1));
        assert!(!SyntheticScene::flame_visible(2 * FLAME_PERIOD));
    }

    #[test]
    fn flame_patch_is_drawn_in_the_center() {
        let mut scene = SyntheticScene::new(16, 16);
        let mut pixels = Vec::new();
        for _ in 0..FLAME_PERIOD {
            pixels = scene.next_pixels();
        }
        let center = (8 * 16 + 8) * 3;
        assert_eq!(&pixels[center..center + 3], &FLAME_RGB);
        assert_ne!(&pixels[0..3], &FLAME_RGB);
    }
}
