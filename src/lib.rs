//! lightgpt
//!
//! The core of a streaming chat client for OpenAI-style APIs. This crate
//! implements the engineering-heavy part of such a client:
//! - `streaming`: SSE decoding and delta extraction into a byte stream
//! - `reader`: incremental assembly of the assistant reply, UTF-8 safe
//! - `controller`: the per-request state machine (rate limiting, context
//!   truncation, cancellation, archival)
//! - `api`: the outbound chat/image/billing calls
//! - `store` / `view`: seams for the persistence engine and the UI layer,
//!   which are external collaborators
#![deny(unsafe_code)]

pub mod api;
pub mod controller;
pub mod error;
pub mod reader;
pub mod store;
pub mod streaming;
pub mod types;
pub mod utils;
pub mod view;

pub use controller::RequestController;
pub use error::{ChatError, Result};
pub use types::{Message, Role};
pub use utils::cancel::CancelHandle;
