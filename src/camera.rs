// src/camera.rs
// Live video source abstraction shared by the detection loop and the capture step

use base64::{engine::general_purpose, Engine as _};
use futures_util::future::BoxFuture;
use image::DynamicImage;

/// One live frame, as delivered by the video source.
pub type VideoFrame = DynamicImage;

/// A live video feed with a single-shot still capture.
///
/// The continuous frame stream and the still capture read the same
/// underlying feed; the detection loop consumes `next_frame` while only the
/// capture step ever calls `capture_still`. Implementations are expected to
/// come from the embedding application (a webcam wrapper, a test double).
pub trait VideoSource: Send + Sync {
    /// Resolves once the feed is actually delivering frames. Callers await
    /// this instead of polling for readiness before attaching a detector.
    fn ready(&self) -> BoxFuture<'_, Result<(), String>>;

    /// The next live frame, or `None` once the feed has ended.
    fn next_frame(&self) -> BoxFuture<'_, Option<VideoFrame>>;

    /// Freezes a single still frame as a base64 data URL (JPEG payload).
    /// Returns `None` when the feed is not ready to produce one.
    fn capture_still(&self) -> Option<String>;

    /// Stops all active media tracks. Must be safe to call more than once.
    fn stop(&self);
}

/// Decodes a base64 still capture into raw image bytes.
///
/// Accepts both a bare base64 string and a `data:<mime>;base64,` data URL,
/// which is what browser-style still captures produce.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, String> {
    let payload = match data_url.split_once(";base64,") {
        Some((header, payload)) => {
            if !header.starts_with("data:") {
                return Err(format!("malformed data URL header: {}", header));
            }
            payload
        }
        None => data_url,
    };

    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("failed to decode base64 image data: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url_with_prefix() {
        let encoded = general_purpose::STANDARD.encode(b"jpegbytes");
        let url = format!("data:image/jpeg;base64,{}", encoded);

        assert_eq!(decode_data_url(&url).unwrap(), b"jpegbytes");
    }

    #[test]
    fn test_decode_bare_base64() {
        let encoded = general_purpose::STANDARD.encode(b"stillframe");
        assert_eq!(decode_data_url(&encoded).unwrap(), b"stillframe");
    }

    #[test]
    fn test_decode_rejects_invalid_payload() {
        assert!(decode_data_url("data:image/jpeg;base64,!!!not-base64!!!").is_err());
    }

    #[test]
    fn test_decode_rejects_malformed_header() {
        let encoded = general_purpose::STANDARD.encode(b"x");
        let url = format!("image/jpeg;base64,{}", encoded);
        assert!(decode_data_url(&url).is_err());
    }
}
