//! Chat completions call.

use super::{ApiConfig, send_cancellable};
use crate::error::ChatError;
use crate::types::{Message, Role};
use crate::utils::cancel::CancelHandle;
use secrecy::ExposeSecret;
use serde::Serialize;

/// Wire form of one context-window message.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

/// POST the context window to `/v1/chat/completions` with `stream: true`.
///
/// Returns the raw response (status not yet checked) so the controller can
/// count the dispatch before inspecting it, then hand the body to the
/// streaming pipeline.
pub async fn send_chat_completions(
    client: &reqwest::Client,
    config: &ApiConfig,
    messages: &[Message],
    cancel: &CancelHandle,
) -> Result<reqwest::Response, ChatError> {
    let body = ChatCompletionsRequest {
        model: &config.model,
        messages: messages
            .iter()
            .map(|message| WireMessage {
                role: message.role,
                content: &message.content,
            })
            .collect(),
        stream: true,
    };
    tracing::debug!(model = %config.model, window = messages.len(), "dispatching chat completion");
    let request = client
        .post(config.endpoint("/v1/chat/completions"))
        .bearer_auth(config.api_key.expose_secret())
        .json(&body);
    send_cancellable(request, cancel).await
}
