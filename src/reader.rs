//! Response stream reader.
//!
//! The single consumer of the delta byte stream: decodes chunks with
//! persistent UTF-8 state, deduplicates provider blank-line runs, maintains
//! the accumulated assistant reply, and publishes every change to the view.
//! Cancellation is a finalize-early operation: the partial accumulator is
//! returned as a successful result so the controller archives it, not a
//! discarded draft.

use crate::error::Result;
use crate::streaming::DeltaStream;
use crate::utils::cancel::CancelHandle;
use crate::utils::throttle::Throttle;
use crate::utils::utf8::Utf8StreamDecoder;
use crate::view::ChatView;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// One scroll notification per window at most.
pub const SCROLL_THROTTLE: Duration = Duration::from_millis(300);

/// Drain the delta stream into the complete assistant reply.
///
/// Returns the accumulated text on stream exhaustion, or the partial text
/// accumulated so far when `cancel` fires. Transport faults propagate as
/// errors and the partial content is discarded by the caller.
pub async fn read_to_end(
    mut stream: DeltaStream,
    cancel: &CancelHandle,
    view: &Arc<dyn ChatView>,
) -> Result<String> {
    let mut decoder = Utf8StreamDecoder::new();
    let mut scroll = Throttle::new(SCROLL_THROTTLE);
    let mut reply = String::new();

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(accumulated = reply.len(), "read loop cancelled");
                break;
            }
            item = stream.next() => item,
        };
        let Some(item) = item else { break };
        let chunk = decoder.decode(&item?);
        if chunk.is_empty() {
            continue;
        }
        // Some providers emit runs of blank lines between paragraphs;
        // collapse a lone newline when the reply already ends with one.
        if chunk == "\n" && reply.ends_with('\n') {
            continue;
        }
        reply.push_str(&chunk);
        view.assistant_message_updated(&reply);
        if scroll.ready() {
            view.scroll_to_bottom();
        }
    }

    let tail = decoder.flush();
    if !tail.is_empty() {
        reply.push_str(&tail);
        view.assistant_message_updated(&reply);
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::streaming::DeltaStream;
    use bytes::Bytes;
    use futures_util::stream;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingView {
        updates: Mutex<Vec<String>>,
    }

    impl ChatView for RecordingView {
        fn assistant_message_updated(&self, text: &str) {
            self.updates
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(text.to_string());
        }
    }

    fn chunks(parts: &[&str]) -> DeltaStream {
        let items: Vec<std::result::Result<Bytes, ChatError>> = parts
            .iter()
            .map(|part| Ok(Bytes::from(part.to_string())))
            .collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn accumulates_chunks_in_order() {
        let view: Arc<dyn ChatView> = Arc::new(RecordingView::default());
        let reply = read_to_end(chunks(&["Hel", "lo"]), &CancelHandle::new(), &view)
            .await
            .unwrap();
        assert_eq!(reply, "Hello");
    }

    #[tokio::test]
    async fn lone_newline_after_newline_is_deduplicated() {
        let view: Arc<dyn ChatView> = Arc::new(RecordingView::default());
        let reply = read_to_end(chunks(&["a", "\n", "\n", "b"]), &CancelHandle::new(), &view)
            .await
            .unwrap();
        assert_eq!(reply, "a\nb");
    }

    #[tokio::test]
    async fn publishes_the_running_reply() {
        let recording = Arc::new(RecordingView::default());
        let view: Arc<dyn ChatView> = recording.clone();
        read_to_end(chunks(&["one", " two"]), &CancelHandle::new(), &view)
            .await
            .unwrap();
        let updates = recording
            .updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        assert_eq!(updates, vec!["one".to_string(), "one two".to_string()]);
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks_decodes_once() {
        let view: Arc<dyn ChatView> = Arc::new(RecordingView::default());
        let bytes = "你".as_bytes();
        let items: Vec<std::result::Result<Bytes, ChatError>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..1])),
            Ok(Bytes::copy_from_slice(&bytes[1..])),
        ];
        let stream: DeltaStream = Box::pin(stream::iter(items));
        let reply = read_to_end(stream, &CancelHandle::new(), &view)
            .await
            .unwrap();
        assert_eq!(reply, "你");
    }

    #[tokio::test]
    async fn cancellation_returns_partial_reply() {
        let view: Arc<dyn ChatView> = Arc::new(RecordingView::default());
        let cancel = CancelHandle::new();
        let trigger = cancel.clone();
        // Two prompt chunks, then a chunk that only arrives after a long
        // sleep; cancellation must interrupt the outstanding read.
        let stream: DeltaStream = Box::pin(async_stream::stream! {
            yield Ok(Bytes::from("Hello, "));
            yield Ok(Bytes::from("wor"));
            tokio::time::sleep(Duration::from_secs(60)).await;
            yield Ok(Bytes::from("ld"));
        });
        let reader = tokio::spawn(async move {
            let view = view;
            read_to_end(stream, &cancel, &view).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
        let reply = reader.await.expect("reader task").unwrap();
        assert_eq!(reply, "Hello, wor");
    }

    #[tokio::test]
    async fn transport_fault_discards_partial_content() {
        let view: Arc<dyn ChatView> = Arc::new(RecordingView::default());
        let items: Vec<std::result::Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from("partial")),
            Err(ChatError::Http("connection reset".into())),
        ];
        let stream: DeltaStream = Box::pin(stream::iter(items));
        let result = read_to_end(stream, &CancelHandle::new(), &view).await;
        assert!(matches!(result, Err(ChatError::Http(_))));
    }
}
