//! Error Handling
//!
//! All faults the client core can produce, in one enum. Pre-dispatch
//! rejections (rate limit, missing credential, empty input) are recoverable
//! warnings; transport and API faults terminate the session and surface as a
//! banner. Parse faults inside the streaming pipeline are absorbed there and
//! never reach the controller.

use thiserror::Error;

/// Chat client error type
#[derive(Error, Debug)]
pub enum ChatError {
    /// Per-minute request budget exhausted; nothing was sent.
    #[error("Api requests are too frequent, try again later!")]
    RateLimited,

    /// No API credential is configured; nothing was sent.
    #[error("Please set API KEY")]
    MissingCredential,

    /// A fresh submission with no user text; nothing was sent.
    #[error("Please enter your question first")]
    EmptyInput,

    /// A session is already active. Requests are single-flight; the old
    /// cancellation handle is never silently replaced.
    #[error("A request is already in flight")]
    SessionInFlight,

    /// Non-success HTTP status from the API.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport failure: connect/send/read faults, or a user-independent
    /// abort of the response body.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response carried no usable payload.
    #[error("No Data")]
    NoData,

    /// Malformed JSON payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed event-stream framing.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Export requested over an empty message list.
    #[error("There is nothing to export yet")]
    NothingToExport,
}

impl ChatError {
    /// Create an API error from an HTTP status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code, when the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for rejections raised before anything was dispatched. These are
    /// surfaced as warnings and leave no state to clean up.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::MissingCredential
                | Self::EmptyInput
                | Self::SessionInFlight
                | Self::NothingToExport
        )
    }

    /// Banner text for a failed session. API errors keep the provider's
    /// message; everything else falls back to a generic label.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            _ => "Service Error".to_string(),
        }
    }
}

/// Result type alias for chat client operations
pub type Result<T> = std::result::Result<T, ChatError>;
