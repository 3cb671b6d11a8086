//! Event classification: detector result → "fire present" boolean.

use crate::detect::DetectionResult;

/// Class index the fire model assigns to flames.
pub const TARGET_CLASS_ID: u32 = 0;

/// True iff any reported object is of the target class.
///
/// Threshold filtering has already happened in the detector adapter.
pub fn classify(result: &DetectionResult) -> bool {
    result
        .objects
        .iter()
        .any(|object| object.class_id == TARGET_CLASS_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection};
    use crate::frame::Frame;

    fn result_with(classes: &[u32]) -> DetectionResult {
        DetectionResult {
            objects: classes
                .iter()
                .map(|&class_id| Detection {
                    class_id,
                    confidence: 0.9,
                    bbox: BoundingBox::new(0.0, 0.0, 0.5, 0.5),
                })
                .collect(),
            annotated: Frame::from_rgb(vec![0u8; 3], 1, 1),
        }
    }

    #[test]
    fn empty_result_is_clear() {
        assert!(!classify(&result_with(&[])));
    }

    #[test]
    fn other_classes_are_clear() {
        assert!(!classify(&result_with(&[1, 2, 7])));
    }

    #[test]
    fn any_target_object_is_detected() {
        assert!(classify(&result_with(&[3, TARGET_CLASS_ID])));
    }

    #[test]
    fn classification_is_repeatable() {
        let result = result_with(&[TARGET_CLASS_ID]);
        assert_eq!(classify(&result), classify(&result));
    }
}
