//! Image generation call.
//!
//! Unlike chat completions this endpoint answers with a single JSON body,
//! not a chunked event stream; the first result URL becomes the archived
//! message content.

use super::{ApiConfig, send_cancellable};
use crate::error::ChatError;
use crate::utils::cancel::CancelHandle;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

/// Image generation response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    /// Generated images, in request order.
    pub data: Vec<GeneratedImage>,
}

/// One generated image.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedImage {
    /// Hosted URL of the image.
    pub url: String,
}

/// POST the prompt to `/v1/images/generations`.
///
/// The prompt arrives exactly as the user typed it; the image-mode prefix
/// gates path selection upstream but is not stripped.
pub async fn send_generate_image(
    client: &reqwest::Client,
    config: &ApiConfig,
    prompt: &str,
    cancel: &CancelHandle,
) -> Result<reqwest::Response, ChatError> {
    let body = ImageRequest {
        prompt,
        n: 1,
        size: "256x256",
    };
    tracing::debug!(prompt_len = prompt.len(), "dispatching image generation");
    let request = client
        .post(config.endpoint("/v1/images/generations"))
        .bearer_auth(config.api_key.expose_secret())
        .json(&body);
    send_cancellable(request, cancel).await
}

/// Parse the image response body, racing the read against cancellation.
pub(crate) async fn parse_image_response(
    response: reqwest::Response,
    cancel: &CancelHandle,
) -> Result<ImageResponse, ChatError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ChatError::Http("request cancelled".to_string())),
        parsed = response.json::<ImageResponse>() => {
            parsed.map_err(|e| ChatError::Parse(format!("invalid image response: {e}")))
        }
    }
}
