// src/review.rs
// Rating and review-submission endpoint client

use futures_util::future::BoxFuture;
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Shared HTTP client for the review endpoints.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Number of star indicators a rating is rendered with.
pub const MAX_RATING: u8 = 5;

/// How a backend call failed. Endpoint-reported rejections and transport
/// errors carry different user-facing messages, so the seam keeps them
/// apart even though the orchestrator treats both as terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The endpoint answered, but reported failure or sent an unusable
    /// payload.
    Rejected(String),
    /// The endpoint could not be reached or the exchange broke down.
    Transport(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Rejected(reason) => write!(f, "endpoint rejected request: {}", reason),
            BackendError::Transport(reason) => write!(f, "transport error: {}", reason),
        }
    }
}

impl std::error::Error for BackendError {}

/// The rating and submission endpoints, as a seam the orchestrator can be
/// tested against.
pub trait ReviewBackend: Send + Sync {
    /// Posts a captured JPEG for rating; resolves to the detected rating.
    fn rate(&self, image_jpeg: Vec<u8>) -> BoxFuture<'_, Result<u8, BackendError>>;

    /// Posts the held image plus remark; resolves to the success message.
    fn submit(
        &self,
        image_jpeg: Vec<u8>,
        remark: String,
    ) -> BoxFuture<'_, Result<String, BackendError>>;
}

#[derive(Debug, Deserialize)]
pub struct RateResponse {
    pub status: String,
    /// Left as raw JSON so a non-numeric rating is an endpoint failure
    /// rather than a deserialization error.
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Extracts a usable rating from the endpoint's response.
///
/// Anything other than `status == "success"` with an integer rating in
/// [0, MAX_RATING] counts as an endpoint failure.
pub fn parse_rating(response: &RateResponse) -> Result<u8, BackendError> {
    if response.status != "success" {
        return Err(BackendError::Rejected(format!(
            "status was {:?}",
            response.status
        )));
    }

    let rating = response
        .rating
        .as_ref()
        .and_then(|value| value.as_u64())
        .filter(|&value| value <= MAX_RATING as u64);

    match rating {
        Some(value) => Ok(value as u8),
        None => Err(BackendError::Rejected(format!(
            "rating missing or not a valid number: {:?}",
            response.rating
        ))),
    }
}

/// Extracts the confirmation message from a submission response, falling
/// back to a default when the endpoint did not supply one.
pub fn parse_submission(response: &SubmitResponse) -> Result<String, BackendError> {
    if response.status != "success" {
        return Err(BackendError::Rejected(format!(
            "status was {:?}",
            response.status
        )));
    }

    Ok(response
        .message
        .clone()
        .unwrap_or_else(|| "Review submitted successfully!".to_string()))
}

/// Which of the five star indicators are filled for a given rating.
pub fn filled_stars(rating: u8) -> [bool; MAX_RATING as usize] {
    let mut stars = [false; MAX_RATING as usize];
    for (i, star) in stars.iter_mut().enumerate() {
        *star = (i as u8) < rating;
    }
    stars
}

/// Client for the hosted review backend. The base URL is a parameter so
/// staging and production deployments share this one implementation.
pub struct HttpReviewBackend {
    base_url: String,
}

impl HttpReviewBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn rate_inner(&self, image_jpeg: Vec<u8>) -> Result<u8, BackendError> {
        let part = reqwest::multipart::Part::bytes(image_jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = HTTP_CLIENT
            .post(format!("{}/rate", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Rejected(format!(
                "rating endpoint returned {}",
                response.status()
            )));
        }

        let payload: RateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        parse_rating(&payload)
    }

    async fn submit_inner(
        &self,
        image_jpeg: Vec<u8>,
        remark: String,
    ) -> Result<String, BackendError> {
        let part = reqwest::multipart::Part::bytes(image_jpeg)
            .file_name("final_review.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("remark", remark);

        let response = HTTP_CLIENT
            .post(format!("{}/submit_review_image", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Rejected(format!(
                "submission endpoint returned {}",
                response.status()
            )));
        }

        let payload: SubmitResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        parse_submission(&payload)
    }
}

impl ReviewBackend for HttpReviewBackend {
    fn rate(&self, image_jpeg: Vec<u8>) -> BoxFuture<'_, Result<u8, BackendError>> {
        Box::pin(self.rate_inner(image_jpeg))
    }

    fn submit(
        &self,
        image_jpeg: Vec<u8>,
        remark: String,
    ) -> BoxFuture<'_, Result<String, BackendError>> {
        Box::pin(self.submit_inner(image_jpeg, remark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_response(json: &str) -> RateResponse {
        serde_json::from_str(json).unwrap()
    }

    fn submit_response(json: &str) -> SubmitResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_rating_success() {
        let response = rate_response(r#"{"status": "success", "rating": 4}"#);
        assert_eq!(parse_rating(&response).unwrap(), 4);
    }

    #[test]
    fn test_parse_rating_error_status_rejected() {
        let response = rate_response(r#"{"status": "error"}"#);
        assert!(matches!(
            parse_rating(&response),
            Err(BackendError::Rejected(_))
        ));
    }

    #[test]
    fn test_parse_rating_non_numeric_rejected() {
        let response = rate_response(r#"{"status": "success", "rating": "four"}"#);
        assert!(parse_rating(&response).is_err());
    }

    #[test]
    fn test_parse_rating_out_of_range_rejected() {
        let response = rate_response(r#"{"status": "success", "rating": 11}"#);
        assert!(parse_rating(&response).is_err());
    }

    #[test]
    fn test_parse_rating_missing_rejected() {
        let response = rate_response(r#"{"status": "success"}"#);
        assert!(parse_rating(&response).is_err());
    }

    #[test]
    fn test_parse_submission_uses_endpoint_message() {
        let response = submit_response(r#"{"status": "success", "message": "Thanks!"}"#);
        assert_eq!(parse_submission(&response).unwrap(), "Thanks!");
    }

    #[test]
    fn test_parse_submission_falls_back_to_default() {
        let response = submit_response(r#"{"status": "success"}"#);
        assert_eq!(
            parse_submission(&response).unwrap(),
            "Review submitted successfully!"
        );
    }

    #[test]
    fn test_parse_submission_failure_rejected() {
        let response = submit_response(r#"{"status": "error", "message": "nope"}"#);
        assert!(parse_submission(&response).is_err());
    }

    #[test]
    fn test_filled_stars_for_rating_four() {
        assert_eq!(filled_stars(4), [true, true, true, true, false]);
    }

    #[test]
    fn test_filled_stars_bounds() {
        assert_eq!(filled_stars(0), [false; 5]);
        assert_eq!(filled_stars(5), [true; 5]);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpReviewBackend::new("https://reviews.example.com/");
        assert_eq!(backend.base_url, "https://reviews.example.com");
    }
}
