//! Streaming response pipeline: SSE decoding and delta extraction.
//!
//! The chat completion endpoint answers with a chunked body framed as
//! server-sent events, each carrying a JSON envelope of shape
//! `{"choices":[{"delta":{"content":"..."}}]}` and terminated by a literal
//! `[DONE]` payload. This module decodes that framing with
//! `eventsource-stream` (which buffers lines internally, so event
//! boundaries split across chunk boundaries are handled) and republishes
//! the extracted text deltas as a plain byte stream for the reader loop.
//!
//! Fault policy: a malformed event line or JSON payload is skipped and the
//! stream continues; only transport faults abort it.

use crate::error::ChatError;
use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;

/// Sentinel payload that closes the stream.
pub const DONE_MARKER: &str = "[DONE]";

/// The delta extractor's output: a lazy, forward-only byte stream, bounded
/// by the upstream HTTP response lifetime.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// Chat completion stream event envelope
#[derive(Debug, Clone, Deserialize)]
struct StreamEvent {
    choices: Option<Vec<StreamChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Extract the first choice's delta text from one event payload.
///
/// Malformed JSON is swallowed: a corrupt frame must not abort the whole
/// response. Missing fields count as an empty delta.
fn extract_delta(data: &str) -> Option<String> {
    let event = match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(error = %err, "skipping malformed stream frame");
            return None;
        }
    };
    event
        .choices?
        .into_iter()
        .next()?
        .delta?
        .content
        .filter(|content| !content.is_empty())
}

/// Turn a chat completion HTTP response into a [`DeltaStream`].
pub fn delta_stream(response: reqwest::Response) -> DeltaStream {
    delta_stream_from_bytes(response.bytes_stream())
}

/// Turn any byte-chunk stream of SSE frames into a [`DeltaStream`].
///
/// Exposed separately so the pipeline can be exercised without a live HTTP
/// response.
pub fn delta_stream_from_bytes<S, B, E>(byte_stream: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut events = Box::pin(byte_stream).eventsource();
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    let data = event.data.trim();
                    if data == DONE_MARKER {
                        break;
                    }
                    if data.is_empty() {
                        continue;
                    }
                    if let Some(text) = extract_delta(data) {
                        yield Ok(Bytes::from(text));
                    }
                }
                // Framing faults degrade to a skipped line, never an abort.
                Err(EventStreamError::Utf8(err)) => {
                    tracing::warn!(error = %err, "skipping undecodable event line");
                }
                Err(EventStreamError::Parser(err)) => {
                    tracing::warn!(error = %err, "skipping malformed event line");
                }
                // Transport faults terminate the session.
                Err(EventStreamError::Transport(err)) => {
                    yield Err(ChatError::Http(format!("stream error: {err}")));
                    break;
                }
            }
        }
    };
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;

    fn sse(frames: &[&str]) -> Vec<Result<Vec<u8>, Infallible>> {
        frames
            .iter()
            .map(|frame| Ok(format!("data: {frame}\n\n").into_bytes()))
            .collect()
    }

    async fn collect(chunks: Vec<Result<Vec<u8>, Infallible>>) -> Vec<Result<Bytes, ChatError>> {
        delta_stream_from_bytes(stream::iter(chunks)).collect().await
    }

    #[tokio::test]
    async fn extracts_content_deltas() {
        let out = collect(sse(&[
            r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
            DONE_MARKER,
        ]))
        .await;
        let text: Vec<_> = out.into_iter().map(|b| b.unwrap()).collect();
        assert_eq!(text, vec![Bytes::from("Hel"), Bytes::from("lo")]);
    }

    #[tokio::test]
    async fn done_marker_terminates_even_with_trailing_events() {
        let out = collect(sse(&[
            r#"{"choices":[{"delta":{"content":"a"}}]}"#,
            DONE_MARKER,
            r#"{"choices":[{"delta":{"content":"never"}}]}"#,
        ]))
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &Bytes::from("a"));
    }

    #[tokio::test]
    async fn malformed_json_emits_nothing_and_continues() {
        let out = collect(sse(&[
            r#"{"choices":[{"delta":{"content":"a"}}]}"#,
            "{not json",
            r#"{"choices":[{"delta":{"content":"b"}}]}"#,
            DONE_MARKER,
        ]))
        .await;
        let text: Vec<_> = out.into_iter().map(|b| b.unwrap()).collect();
        assert_eq!(text, vec![Bytes::from("a"), Bytes::from("b")]);
    }

    #[tokio::test]
    async fn missing_delta_field_counts_as_empty() {
        let out = collect(sse(&[
            r#"{"choices":[{"delta":{}}]}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"delta":{"content":""}}]}"#,
            DONE_MARKER,
        ]))
        .await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn event_split_across_chunk_boundary_is_reassembled() {
        let whole = "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\ndata: [DONE]\n\n";
        let (left, right) = whole.as_bytes().split_at(17);
        let chunks: Vec<Result<Vec<u8>, Infallible>> =
            vec![Ok(left.to_vec()), Ok(right.to_vec())];
        let out = collect(chunks).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), &Bytes::from("hi"));
    }
}
