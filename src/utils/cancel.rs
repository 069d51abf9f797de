//! Cancellation utilities
//!
//! Provides a first-class cancellation handle for streams and long-running
//! operations.

use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
///
/// Cloning is cheap; all clones observe the same flag. The read loop selects
/// on [`CancelHandle::cancelled`] so an outstanding read resolves promptly,
/// and dropping the cancelled stream closes the underlying HTTP connection
/// so the provider stops generating tokens.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new, untriggered handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
