//! Shared test support: a recording view sink and a hand-rolled chunked SSE
//! server for tests that need the response body to trickle or hang (wiremock
//! serves bodies whole, which makes mid-stream cancellation untestable).
#![allow(dead_code)]

use lightgpt::view::ChatView;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// View that records every notification it receives.
#[derive(Default)]
pub struct RecordingView {
    updates: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    scrolls: Mutex<usize>,
    credential_panel_opened: Mutex<bool>,
}

impl RecordingView {
    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn scrolls(&self) -> usize {
        *self.scrolls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn credential_panel_opened(&self) -> bool {
        *self
            .credential_panel_opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl ChatView for RecordingView {
    fn assistant_message_updated(&self, text: &str) {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
    }

    fn scroll_to_bottom(&self) {
        *self.scrolls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }

    fn notify_warning(&self, message: &str) {
        self.warnings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }

    fn notify_error(&self, message: &str) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }

    fn open_credential_settings(&self) {
        *self
            .credential_panel_opened
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = true;
    }
}

/// Format one SSE data frame.
pub fn sse_frame(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// Serve one HTTP request with a chunked `text/event-stream` body, writing
/// one chunk per frame with a short pause between them. When `hold_open` is
/// set the body never terminates, so the client sees an idle stream until it
/// cancels. Returns the base URL.
pub async fn spawn_trickle_sse_server(frames: Vec<String>, hold_open: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");

        // Drain the request head; the body is JSON we do not care about.
        let mut buf = vec![0u8; 8192];
        let mut head = Vec::new();
        loop {
            let n = socket.read(&mut buf).await.expect("read request");
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
            if head.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\n\
                  \r\n",
            )
            .await
            .expect("write head");

        for frame in frames {
            let chunk = format!("{:x}\r\n{frame}\r\n", frame.len());
            socket.write_all(chunk.as_bytes()).await.expect("write chunk");
            socket.flush().await.expect("flush");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        if hold_open {
            // Keep the connection open without terminating the body.
            tokio::time::sleep(Duration::from_secs(300)).await;
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });

    format!("http://{addr}")
}

/// Poll until `predicate` holds or the deadline passes.
pub async fn wait_until(mut predicate: impl FnMut() -> bool, deadline: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
