use crate::frame::Frame;

/// Result of running the detector adapter on one frame.
#[derive(Clone, Debug)]
pub struct DetectionResult {
    /// Objects at or above the run's confidence threshold.
    pub objects: Vec<Detection>,
    /// Copy of the input with reported objects outlined.
    pub annotated: Frame,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    /// Confidence in 0..=1.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Bounding box in normalized 0..1 coordinates (top-left origin).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Clamp to the unit square.
    pub fn clamped(self) -> Self {
        let x0 = self.x.clamp(0.0, 1.0);
        let y0 = self.y.clamp(0.0, 1.0);
        let x1 = (self.x + self.w).clamp(0.0, 1.0);
        let y1 = (self.y + self.h).clamp(0.0, 1.0);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(0.1, 0.1, 0.2, 0.2);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 0.1, 0.1);
        let b = BoundingBox::new(0.5, 0.5, 0.1, 0.1);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn clamped_box_stays_in_unit_square() {
        let b = BoundingBox::new(-0.2, 0.9, 0.5, 0.5).clamped();
        assert_eq!(b.x, 0.0);
        assert!((b.w - 0.3).abs() < 1e-6);
        assert!((b.y + b.h - 1.0).abs() < 1e-6);
    }
}
