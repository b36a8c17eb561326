// src/lib.rs

//! Finger-count rating capture engine.
//!
//! Connects a live video source, a hand-landmark detector, and a review
//! backend into the flow behind a "rate with your fingers" feature: a
//! continuous detection loop keeps a raised-finger count fresh, a timed
//! countdown freezes a single still frame, the frame is rated by an
//! external endpoint, and the rated frame plus an optional remark can be
//! submitted as a review.
//!
//! All three collaborators are traits ([`camera::VideoSource`],
//! [`detector::HandDetector`], [`review::ReviewBackend`]); HTTP-backed
//! implementations are provided for the detector and the review backend.

pub mod camera;
pub mod detector;
pub mod finger_count;
pub mod hand_types;
pub mod review;
pub mod session;
pub mod vision;

pub use camera::{decode_data_url, VideoFrame, VideoSource};
pub use detector::{DetectorConfig, HandDetector, RemoteHandDetector};
pub use finger_count::count_raised_fingers;
pub use hand_types::{HandLandmarks, Landmark, LANDMARK_COUNT};
pub use review::{filled_stars, BackendError, HttpReviewBackend, ReviewBackend, MAX_RATING};
pub use session::{CapturePhase, CaptureSession, SessionConfig, SessionEvent, COUNTDOWN_START};
