//! Incremental UTF-8 decoding.
//!
//! Streamed response chunks can split a multi-byte character across chunk
//! boundaries, so decoder state must persist between reads instead of being
//! reset per chunk. Incomplete trailing sequences are buffered until the
//! next chunk arrives; genuinely invalid bytes become replacement
//! characters rather than aborting the stream.

/// Stateful UTF-8 decoder for byte-chunk streams.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a decoder with no buffered state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all complete characters. A trailing
    /// incomplete sequence is held back for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid_len]));
                    match err.error_len() {
                        // Invalid sequence in the middle: replace and move on.
                        Some(bad_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_len + bad_len);
                        }
                        // Incomplete sequence at the end: keep for next chunk.
                        None => {
                            self.pending.drain(..valid_len);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Drain whatever is still buffered at end of stream. A dangling partial
    /// sequence decodes lossily.
    pub fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}
