//! Shared utilities: cancellation, throttling, incremental UTF-8 decoding.

pub mod cancel;
pub mod throttle;
pub mod utf8;

pub use cancel::CancelHandle;
pub use throttle::Throttle;
pub use utf8::Utf8StreamDecoder;
