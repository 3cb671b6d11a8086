//! Decoding for YOLOv8-style detection heads.
//!
//! The head emits a `[1, 4 + classes, anchors]` tensor: rows 0..4 are the box center and
//! size in input pixels, the remaining rows are per-class scores. Decoding keeps the best
//! class per anchor, drops anchors under a candidate floor and runs per-class NMS.

use anyhow::{anyhow, Result};

use crate::detect::result::{BoundingBox, Detection};

/// Scores below this are never candidates. Operator thresholds start at 0.1.
pub const CANDIDATE_FLOOR: f32 = 0.05;

/// IoU above which a lower-scored box of the same class is suppressed.
pub const NMS_IOU: f32 = 0.45;

/// Decode a flattened head output (row-major over `[channels, anchors]`).
pub fn decode(raw: &[f32], channels: usize, anchors: usize, input_size: u32) -> Result<Vec<Detection>> {
    if channels < 5 {
        return Err(anyhow!(
            "detection head needs at least 5 rows, model produced {}",
            channels
        ));
    }
    let expected = channels
        .checked_mul(anchors)
        .ok_or_else(|| anyhow!("detection head dimensions overflow"))?;
    if raw.len() != expected {
        return Err(anyhow!(
            "detection head has {} values, expected {}x{}",
            raw.len(),
            channels,
            anchors
        ));
    }

    let at = |row: usize, anchor: usize| raw[row * anchors + anchor];
    let scale = input_size as f32;
    let mut candidates = Vec::new();

    for anchor in 0..anchors {
        let (class_id, score) = (4..channels)
            .map(|row| (row - 4, at(row, anchor)))
            .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if !score.is_finite() || score < CANDIDATE_FLOOR {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        let bbox = BoundingBox::new(
            (cx - w / 2.0) / scale,
            (cy - h / 2.0) / scale,
            w / scale,
            h / scale,
        )
        .clamped();
        candidates.push(Detection {
            class_id: class_id as u32,
            confidence: score.min(1.0),
            bbox,
        });
    }

    Ok(nms(candidates, NMS_IOU))
}

/// Greedy per-class non-maximum suppression. Output is sorted by confidence.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        if keep
            .iter()
            .filter(|kept| kept.class_id == detection.class_id)
            .all(|kept| kept.bbox.iou(&detection.bbox) <= iou_threshold)
        {
            keep.push(detection);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `[4 + classes, anchors]` buffer from (cx, cy, w, h, scores) columns.
    fn head(columns: &[(f32, f32, f32, f32, Vec<f32>)]) -> (Vec<f32>, usize, usize) {
        let anchors = columns.len();
        let channels = 4 + columns[0].4.len();
        let mut raw = vec![0.0; channels * anchors];
        for (a, (cx, cy, w, h, scores)) in columns.iter().enumerate() {
            raw[a] = *cx;
            raw[anchors + a] = *cy;
            raw[2 * anchors + a] = *w;
            raw[3 * anchors + a] = *h;
            for (c, score) in scores.iter().enumerate() {
                raw[(4 + c) * anchors + a] = *score;
            }
        }
        (raw, channels, anchors)
    }

    #[test]
    fn decodes_best_class_and_normalizes_box() -> Result<()> {
        let (raw, channels, anchors) = head(&[(320.0, 320.0, 64.0, 128.0, vec![0.8, 0.1])]);
        let detections = decode(&raw, channels, anchors, 640)?;
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.class_id, 0);
        assert!((d.confidence - 0.8).abs() < 1e-6);
        assert!((d.bbox.x - 0.45).abs() < 1e-6);
        assert!((d.bbox.y - 0.4).abs() < 1e-6);
        assert!((d.bbox.w - 0.1).abs() < 1e-6);
        assert!((d.bbox.h - 0.2).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn low_scores_are_dropped() -> Result<()> {
        let (raw, channels, anchors) = head(&[(10.0, 10.0, 5.0, 5.0, vec![0.01, 0.02])]);
        assert!(decode(&raw, channels, anchors, 640)?.is_empty());
        Ok(())
    }

    #[test]
    fn overlapping_boxes_of_same_class_are_suppressed() -> Result<()> {
        let (raw, channels, anchors) = head(&[
            (100.0, 100.0, 50.0, 50.0, vec![0.9, 0.0]),
            (102.0, 101.0, 50.0, 50.0, vec![0.7, 0.0]),
            (102.0, 101.0, 50.0, 50.0, vec![0.0, 0.6]),
            (500.0, 500.0, 40.0, 40.0, vec![0.5, 0.0]),
        ]);
        let detections = decode(&raw, channels, anchors, 640)?;
        let summary: Vec<(u32, f32)> = detections
            .iter()
            .map(|d| (d.class_id, d.confidence))
            .collect();
        assert_eq!(summary, vec![(0, 0.9), (1, 0.6), (0, 0.5)]);
        Ok(())
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        assert!(decode(&[0.0; 9], 5, 2, 640).is_err());
        assert!(decode(&[0.0; 8], 4, 2, 640).is_err());
    }
}
