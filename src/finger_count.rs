// src/finger_count.rs
// Raised-finger counting from 21 hand landmarks

use crate::hand_types::{landmark_idx, Landmark, LANDMARK_COUNT};

/// Fingertip/proximal-joint index pairs for the four non-thumb fingers.
const TIP_PIP_PAIRS: [(usize, usize); 4] = [
    (landmark_idx::INDEX_TIP, landmark_idx::INDEX_PIP),
    (landmark_idx::MIDDLE_TIP, landmark_idx::MIDDLE_PIP),
    (landmark_idx::RING_TIP, landmark_idx::RING_PIP),
    (landmark_idx::PINKY_TIP, landmark_idx::PINKY_PIP),
];

/// Counts raised fingers from a full set of 21 hand landmarks.
///
/// A non-thumb finger counts as raised when its tip sits above its proximal
/// interphalangeal joint on screen (`tip.y < pip.y`; image y grows
/// downward). The thumb counts as raised when its tip is to the right of
/// its interphalangeal joint (`tip.x > ip.x`).
///
/// Known limitation: the thumb rule assumes a right hand in a mirrored
/// (selfie-view) frame. A left hand, or a non-mirrored feed, will have its
/// thumb misclassified. Callers that need handedness-aware counting must
/// handle that upstream; changing the comparison here would change observed
/// counts for every existing caller.
///
/// The caller must pass exactly 21 points; partial detections are not valid
/// input and are rejected rather than silently miscounted.
pub fn count_raised_fingers(landmarks: &[Landmark]) -> Result<u8, String> {
    if landmarks.len() != LANDMARK_COUNT {
        return Err(format!(
            "expected {} hand landmarks, got {}",
            LANDMARK_COUNT,
            landmarks.len()
        ));
    }

    let mut count = 0u8;

    if landmarks[landmark_idx::THUMB_TIP].x > landmarks[landmark_idx::THUMB_IP].x {
        count += 1;
    }

    for (tip, pip) in TIP_PIP_PAIRS {
        if landmarks[tip].y < landmarks[pip].y {
            count += 1;
        }
    }

    Ok(count)
}
