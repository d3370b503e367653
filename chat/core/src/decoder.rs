//! Frame Decoder
//!
//! Turns the incrementally arriving response body into complete event lines.
//!
//! # Wire Format
//!
//! ```text
//! data: {"type":"token","data":"Hel"}\n
//! \n
//! data: {"type":"token","data":"lo"}\n
//! ```
//!
//! Chunks may split a line, the `\n` delimiter, or a multi-byte UTF-8
//! character anywhere. The decoder buffers raw bytes and only decodes a line
//! once its delimiter has arrived, so chunking is invisible to callers.
//!
//! Lines that do not start with [`EVENT_MARKER`] are discarded. Keep-alive
//! comments and blank separators are expected on some transports and are not
//! treated as errors.

/// Prefix every event line carries
pub const EVENT_MARKER: &str = "data: ";

/// Minimum buffer capacity for the decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Line decoder for one response stream
///
/// Create one per request; never reuse across requests.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes of the trailing line that has not been terminated yet
    buffer: Vec<u8>,
    /// Complete frames emitted so far
    frames: usize,
    /// Non-empty lines discarded for lacking the marker
    dropped: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            frames: 0,
            dropped: 0,
        }
    }

    /// Append a chunk and return every frame it completed, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let residue = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, residue);

        let mut frames = Vec::new();
        for raw in complete.split(|&b| b == b'\n') {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }
            let line = String::from_utf8_lossy(raw);
            if line.starts_with(EVENT_MARKER) {
                frames.push(line.into_owned());
            } else {
                self.dropped += 1;
                tracing::trace!(line = %line, "Dropping non-event line");
            }
        }

        self.frames += frames.len();
        frames
    }

    /// Close out the stream
    ///
    /// An unterminated trailing fragment is never a frame; it is reported in
    /// the returned stats and discarded.
    pub fn finish(&mut self) -> DecoderStats {
        let residue_bytes = self.buffer.len();
        if residue_bytes > 0 {
            tracing::debug!(
                residue_bytes,
                "Discarding unterminated fragment at end of stream"
            );
            self.buffer.clear();
        }
        DecoderStats {
            frames: self.frames,
            dropped_lines: self.dropped,
            residue_bytes,
        }
    }

    /// Non-empty lines discarded so far
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Bytes currently held for an incomplete line
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Counters reported when a stream ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames emitted
    pub frames: usize,
    /// Non-event lines dropped
    pub dropped_lines: usize,
    /// Unterminated bytes discarded at the end
    pub residue_bytes: usize,
}
