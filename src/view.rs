//! UI seam.
//!
//! The rendering layer (component tree, toasts, scroll container) is an
//! external collaborator. The core only needs a sink for its observable
//! side effects; every method is a notification, never a query.

/// Sink for the side effects the core triggers on the UI layer.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// streaming read loop.
pub trait ChatView: Send + Sync {
    /// The in-flight assistant reply changed; `text` is the full
    /// accumulated content so far. Called with `""` when the draft state is
    /// cleared after archival.
    fn assistant_message_updated(&self, text: &str) {
        let _ = text;
    }

    /// Scroll the conversation to the bottom. Already throttled by the
    /// caller; implementations need no further rate limiting.
    fn scroll_to_bottom(&self) {}

    /// A recoverable rejection the user should see as a warning toast.
    fn notify_warning(&self, message: &str) {
        let _ = message;
    }

    /// A failed session the user should see as a dismissible banner.
    fn notify_error(&self, message: &str) {
        let _ = message;
    }

    /// No credential is configured; the settings panel should open.
    fn open_credential_settings(&self) {}
}

/// View that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl ChatView for NullView {}
