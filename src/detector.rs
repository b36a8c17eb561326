// src/detector.rs
// Hand-landmark detector seam and the hosted-service client implementation

use std::io::Cursor;
use std::time::Duration;

use anyhow::Context;
use futures_util::future::BoxFuture;
use image::DynamicImage;
use serde::Deserialize;
use tracing::debug;

use crate::camera::VideoFrame;
use crate::hand_types::{HandLandmarks, Landmark, LANDMARK_COUNT};

/// Detector tuning. Mirrors the knobs the hosted landmark services expose;
/// deployments differ only in thresholds, so they are parameters rather
/// than per-site copies of this module.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Maximum hands tracked per frame. The rating flow only ever reads
    /// one hand, so this defaults to 1.
    pub max_num_hands: u32,
    /// Minimum confidence, in (0, 1), for a detection to be reported.
    pub min_detection_confidence: f32,
    /// Minimum confidence, in (0, 1), to keep tracking across frames.
    pub min_tracking_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_num_hands: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Produces at most one hand's worth of landmarks per frame.
///
/// `Ok(None)` means the frame was processed and no hand was found; errors
/// are reserved for the detector itself failing.
pub trait HandDetector: Send + Sync {
    fn detect<'a>(
        &'a self,
        frame: &'a VideoFrame,
    ) -> BoxFuture<'a, anyhow::Result<Option<HandLandmarks>>>;
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    status: String,
    #[serde(default)]
    landmarks: Vec<Landmark>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    handedness: Option<String>,
}

/// Client for a hosted hand-landmark service.
///
/// Frames are JPEG-encoded and posted as multipart form data; the service
/// answers with the 21 landmark points of the most confident hand, or an
/// empty landmark list when it saw none.
pub struct RemoteHandDetector {
    endpoint: String,
    config: DetectorConfig,
    client: reqwest::Client,
}

impl RemoteHandDetector {
    pub fn new(endpoint: impl Into<String>, config: DetectorConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("failed to build detector HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            config,
            client,
        })
    }

    async fn detect_inner(&self, frame: &DynamicImage) -> anyhow::Result<Option<HandLandmarks>> {
        let jpeg = encode_jpeg(frame)?;

        let part = reqwest::multipart::Part::bytes(jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("max_num_hands", self.config.max_num_hands.to_string())
            .text(
                "min_detection_confidence",
                self.config.min_detection_confidence.to_string(),
            )
            .text(
                "min_tracking_confidence",
                self.config.min_tracking_confidence.to_string(),
            );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .context("landmark service unreachable")?;

        if !response.status().is_success() {
            anyhow::bail!("landmark service returned error: {}", response.status());
        }

        let payload: DetectResponse = response
            .json()
            .await
            .context("failed to parse landmark service response")?;

        if payload.status != "success" || payload.landmarks.is_empty() {
            return Ok(None);
        }

        if payload.landmarks.len() != LANDMARK_COUNT {
            anyhow::bail!(
                "landmark service returned {} points, expected {}",
                payload.landmarks.len(),
                LANDMARK_COUNT
            );
        }

        if payload.confidence < self.config.min_detection_confidence {
            debug!(
                confidence = payload.confidence,
                "discarding low-confidence detection"
            );
            return Ok(None);
        }

        Ok(Some(HandLandmarks {
            landmarks: payload.landmarks,
            confidence: payload.confidence,
            handedness: payload.handedness,
        }))
    }
}

impl HandDetector for RemoteHandDetector {
    fn detect<'a>(
        &'a self,
        frame: &'a VideoFrame,
    ) -> BoxFuture<'a, anyhow::Result<Option<HandLandmarks>>> {
        Box::pin(self.detect_inner(frame))
    }
}

/// JPEG-encodes a frame for upload. RGBA inputs are flattened to RGB first
/// since JPEG has no alpha channel.
pub fn encode_jpeg(frame: &DynamicImage) -> anyhow::Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());

    let mut bytes = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .context("failed to encode frame as JPEG")?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_default_config_tracks_one_hand() {
        let config = DetectorConfig::default();

        assert_eq!(config.max_num_hands, 1);
        assert!(config.min_detection_confidence > 0.0 && config.min_detection_confidence < 1.0);
        assert!(config.min_tracking_confidence > 0.0 && config.min_tracking_confidence < 1.0);
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let frame = DynamicImage::ImageRgba8(RgbaImage::new(16, 16));
        let bytes = encode_jpeg(&frame).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_detect_response_parses_landmarks() {
        let json = r#"{
            "status": "success",
            "landmarks": [{"x": 0.1, "y": 0.2}, {"x": 0.3, "y": 0.4, "z": -0.05}],
            "confidence": 0.92,
            "handedness": "Right"
        }"#;

        let payload: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.status, "success");
        assert_eq!(payload.landmarks.len(), 2);
        assert_eq!(payload.landmarks[1].z, -0.05);
        assert_eq!(payload.handedness.as_deref(), Some("Right"));
    }

    #[test]
    fn test_detect_response_tolerates_missing_fields() {
        let payload: DetectResponse = serde_json::from_str(r#"{"status": "no_hand"}"#).unwrap();

        assert_eq!(payload.status, "no_hand");
        assert!(payload.landmarks.is_empty());
        assert_eq!(payload.confidence, 0.0);
    }
}
