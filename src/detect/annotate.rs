//! Box overlays for the annotated frame.

use image::{Rgb, RgbImage};

use crate::classify::TARGET_CLASS_ID;
use crate::detect::result::Detection;
use crate::frame::Frame;

const TARGET_COLOR: Rgb<u8> = Rgb([255, 32, 32]);
const OTHER_COLOR: Rgb<u8> = Rgb([255, 208, 0]);
const LINE_WIDTH: u32 = 2;

/// Copy `frame` and outline each detection. With no detections the copy is unchanged.
pub fn annotate(frame: &Frame, detections: &[Detection]) -> Frame {
    if detections.is_empty() {
        return frame.clone();
    }
    let Ok(mut image) = frame.to_rgb_image() else {
        return frame.clone();
    };
    for detection in detections {
        let color = if detection.class_id == TARGET_CLASS_ID {
            TARGET_COLOR
        } else {
            OTHER_COLOR
        };
        draw_box(&mut image, detection, color);
    }
    Frame::from_image(image)
}

fn draw_box(image: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    let bbox = detection.bbox.clamped();
    let to_px = |v: f32, extent: u32| ((v * extent as f32).round() as u32).min(extent - 1);

    let x0 = to_px(bbox.x, width);
    let y0 = to_px(bbox.y, height);
    let x1 = to_px(bbox.x + bbox.w, width).max(x0);
    let y1 = to_px(bbox.y + bbox.h, height).max(y0);

    for t in 0..LINE_WIDTH {
        for x in x0..=x1 {
            put(image, x, y0 + t, color);
            put(image, x, y1.saturating_sub(t), color);
        }
        for y in y0..=y1 {
            put(image, x0 + t, y, color);
            put(image, x1.saturating_sub(t), y, color);
        }
    }
}

fn put(image: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::from_rgb(vec![90u8; (width * height * 3) as usize], width, height)
    }

    #[test]
    fn no_detections_pass_frame_through() {
        let frame = gray_frame(10, 10);
        assert_eq!(annotate(&frame, &[]), frame);
    }

    #[test]
    fn target_box_is_drawn_in_red() {
        let frame = gray_frame(20, 20);
        let detection = Detection {
            class_id: TARGET_CLASS_ID,
            confidence: 0.9,
            bbox: BoundingBox::new(0.25, 0.25, 0.5, 0.5),
        };
        let annotated = annotate(&frame, &[detection]);
        let image = annotated.to_rgb_image().expect("valid frame");

        assert_eq!(*image.get_pixel(5, 5), TARGET_COLOR);
        assert_eq!(*image.get_pixel(10, 10), Rgb([90, 90, 90]));
        assert_eq!(*image.get_pixel(0, 0), Rgb([90, 90, 90]));
        // Input is untouched.
        assert_eq!(frame.pixels()[5 * 20 * 3 + 5 * 3], 90);
    }

    #[test]
    fn boxes_touching_the_edge_stay_in_bounds() {
        let frame = gray_frame(8, 8);
        let detection = Detection {
            class_id: 3,
            confidence: 0.5,
            bbox: BoundingBox::new(0.5, 0.5, 0.9, 0.9),
        };
        let annotated = annotate(&frame, &[detection]);
        let image = annotated.to_rgb_image().expect("valid frame");
        assert_eq!(*image.get_pixel(7, 7), OTHER_COLOR);
    }
}
