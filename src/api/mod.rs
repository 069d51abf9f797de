//! Outbound API surface.
//!
//! Thin, typed wrappers over the three OpenAI-style endpoints the client
//! talks to: chat completions (streamed), image generation, and the billing
//! query. Each call takes the shared HTTP client, the API configuration,
//! and (where the transfer is cancellable) a [`CancelHandle`].

mod billing;
mod chat;
mod images;

pub use billing::{CreditGrants, get_credit_grants};
pub use chat::send_chat_completions;
pub use images::{GeneratedImage, ImageResponse, send_generate_image};
pub(crate) use images::parse_image_response;

use crate::error::ChatError;
use crate::utils::cancel::CancelHandle;
use secrecy::SecretString;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Connection parameters for the outbound calls.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API host, no trailing slash required.
    pub base_url: String,
    /// Chat model id.
    pub model: String,
    /// Bearer credential.
    pub api_key: SecretString,
}

impl ApiConfig {
    /// Config for the default host and model with the given credential.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key,
        }
    }

    /// Override the API host (used against mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Map a non-success status to [`ChatError::Api`], passing successes through.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    // Error bodies normally carry an {"error":{"message":..}} envelope.
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);
    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };
    Err(ChatError::api(status.as_u16(), message))
}

/// Send a request, racing the transfer against the cancel handle. A
/// triggered handle drops the in-flight future, which closes the
/// connection.
pub(crate) async fn send_cancellable(
    request: reqwest::RequestBuilder,
    cancel: &CancelHandle,
) -> Result<reqwest::Response, ChatError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ChatError::Http("request cancelled".to_string())),
        result = request.send() => {
            result.map_err(|e| ChatError::Http(format!("request failed: {e}")))
        }
    }
}
