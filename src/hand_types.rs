// src/hand_types.rs

use serde::{Deserialize, Serialize};

/// Number of skeletal points in one detected hand.
pub const LANDMARK_COUNT: usize = 21;

/// Hand landmark indices (MediaPipe hand landmark model convention).
///
/// 0 is the wrist; each finger then runs base to tip. Only the joints the
/// finger-count heuristic compares are named individually here.
pub mod landmark_idx {
    pub const WRIST: usize = 0;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;
}

/// One tracked skeletal point, in coordinates normalized to image size.
///
/// `x` and `y` are in [0, 1] relative to frame width/height, with y growing
/// downward. `z` is relative depth supplied by some detectors; nothing in
/// this crate reads it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

/// A single detected hand: all 21 landmarks plus detector metadata.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HandLandmarks {
    pub landmarks: Vec<Landmark>,
    /// Detector confidence that a hand was present, 0.0 to 1.0.
    pub confidence: f32,
    /// "Left" or "Right" where the detector reports it. The finger-count
    /// heuristic does not consult this; see `finger_count`.
    #[serde(default)]
    pub handedness: Option<String>,
}

impl HandLandmarks {
    /// Position of a landmark in pixel coordinates for a given frame size,
    /// or `None` when the index is outside the landmark set.
    pub fn pixel_position(&self, index: usize, width: f32, height: f32) -> Option<(f32, f32)> {
        let lm = self.landmarks.get(index)?;
        Some((lm.x * width, lm.y * height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_position_scales_normalized_coordinates() {
        let mut landmarks = vec![Landmark::default(); LANDMARK_COUNT];
        landmarks[landmark_idx::INDEX_TIP] = Landmark {
            x: 0.25,
            y: 0.5,
            z: 0.0,
        };
        let hand = HandLandmarks {
            landmarks,
            confidence: 0.9,
            handedness: None,
        };

        let (x, y) = hand
            .pixel_position(landmark_idx::INDEX_TIP, 640.0, 480.0)
            .unwrap();
        assert_eq!((x, y), (160.0, 240.0));
    }

    #[test]
    fn test_pixel_position_out_of_range_index() {
        let hand = HandLandmarks {
            landmarks: vec![Landmark::default(); LANDMARK_COUNT],
            confidence: 0.9,
            handedness: None,
        };

        assert_eq!(hand.pixel_position(LANDMARK_COUNT, 640.0, 480.0), None);
    }

    #[test]
    fn test_landmark_deserializes_without_z() {
        let lm: Landmark = serde_json::from_str(r#"{"x": 0.3, "y": 0.7}"#).unwrap();

        assert_eq!(lm.x, 0.3);
        assert_eq!(lm.y, 0.7);
        assert_eq!(lm.z, 0.0);
    }
}
