//! Byte-stream framing for the DCC++ text protocol.
//!
//! Transports deliver bytes in arbitrary chunks: a TCP segment may carry half
//! a command, or three of them. [`FrameExtractor`] buffers the stream and
//! pulls out every complete `<...>` frame, handing the interior text to a
//! dispatch callback and concatenating the responses.
//!
//! # Framing Rules
//!
//! - A frame is emitted only once both `<` and a later `>` are buffered.
//! - Bytes before a `<` are garbage and dropped, as is a `>` with no opener.
//! - If a second `<` appears before the `>`, the frame restarts at the later
//!   `<`; the unterminated fragment is discarded.
//! - Trailing bytes of an unfinished frame are kept for the next feed.
//!
//! # Overflow Policy
//!
//! The buffer is a fixed-capacity `heapless::Vec`. When incoming bytes do not
//! fit after an extraction pass, the oldest buffered bytes are dropped to make
//! room. A frame longer than the capacity can therefore never complete; the
//! extractor resynchronizes on the next `<`. Dropped bytes are counted in
//! [`dropped_bytes`](FrameExtractor::dropped_bytes).
//!
//! # Example
//!
//! ```rust
//! use rs_cmdstation::frame::FrameExtractor;
//!
//! let mut extractor: FrameExtractor = FrameExtractor::new();
//! let mut seen = Vec::new();
//!
//! extractor.feed(b"<s><T 1", |frame| { seen.push(frame.to_string()); String::new() });
//! extractor.feed(b" 0>", |frame| { seen.push(frame.to_string()); String::new() });
//!
//! assert_eq!(seen, vec!["s", "T 1 0"]);
//! ```

use heapless::Vec as HVec;

use crate::registry::COMMAND_FAILED_RESPONSE;

/// Default buffer capacity in bytes.
pub const DEFAULT_FRAME_CAPACITY: usize = 256;

/// Frame start marker.
pub const FRAME_START: u8 = b'<';

/// Frame end marker.
pub const FRAME_END: u8 = b'>';

/// Extracts `<...>` frames from a fragmented byte stream.
///
/// One extractor belongs to exactly one input stream (a TCP client, the radio
/// link). Frames fed through one extractor are dispatched strictly in arrival
/// order.
#[derive(Debug)]
pub struct FrameExtractor<const N: usize = DEFAULT_FRAME_CAPACITY> {
    buffer: HVec<u8, N>,
    dropped: usize,
}

impl<const N: usize> Default for FrameExtractor<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameExtractor<N> {
    /// Creates an empty extractor.
    pub fn new() -> Self {
        Self {
            buffer: HVec::new(),
            dropped: 0,
        }
    }

    /// Buffer capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes currently held for an unfinished frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes discarded by the overflow policy.
    pub fn dropped_bytes(&self) -> usize {
        self.dropped
    }

    /// Discards any partially received frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Appends `data` and dispatches every completed frame.
    ///
    /// `dispatch` receives the frame interior (markers stripped) and returns
    /// the response text. The concatenated responses are returned. Never
    /// blocks.
    pub fn feed<F>(&mut self, data: &[u8], mut dispatch: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut response = String::new();
        let mut input = data;

        while !input.is_empty() {
            let room = N - self.buffer.len();
            if room == 0 {
                self.make_room(input.len());
                if N == self.buffer.len() {
                    // Zero-capacity extractor: nothing can ever be framed
                    self.dropped += input.len();
                    break;
                }
                continue;
            }

            let take = room.min(input.len());
            // Cannot fail: `take` never exceeds the remaining room
            let _ = self.buffer.extend_from_slice(&input[..take]);
            input = &input[take..];

            self.extract(&mut dispatch, &mut response);
        }

        response
    }

    /// Scans the buffer, dispatching complete frames and discarding consumed
    /// bytes and garbage.
    fn extract<F>(&mut self, dispatch: &mut F, response: &mut String)
    where
        F: FnMut(&str) -> String,
    {
        let mut consumed = 0;
        let mut pos = 0;

        loop {
            let Some(start) = find(&self.buffer[pos..], FRAME_START).map(|i| pos + i) else {
                // No opener left: everything scanned is garbage
                consumed = self.buffer.len();
                break;
            };

            let Some(end) = find(&self.buffer[start + 1..], FRAME_END).map(|i| start + 1 + i)
            else {
                // Keep the unfinished frame for the next feed
                consumed = start;
                break;
            };

            // A later opener supersedes an unterminated earlier one
            let frame_start = rfind(&self.buffer[start..end], FRAME_START)
                .map(|i| start + i)
                .unwrap_or(start);

            match core::str::from_utf8(&self.buffer[frame_start + 1..end]) {
                Ok(frame) => response.push_str(&dispatch(frame)),
                Err(_) => {
                    log::warn!("[Frame] Discarding frame with invalid UTF-8");
                    response.push_str(COMMAND_FAILED_RESPONSE);
                }
            }

            pos = end + 1;
            consumed = pos;
        }

        self.discard(consumed);
    }

    /// Drops the oldest bytes so that up to `needed` more bytes fit.
    fn make_room(&mut self, needed: usize) {
        let drop = needed.min(self.buffer.len());
        if drop == 0 {
            return;
        }
        log::warn!(
            "[Frame] Buffer full ({} bytes), dropping {} oldest bytes",
            N,
            drop
        );
        self.discard(drop);
        self.dropped += drop;
    }

    fn discard(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let len = self.buffer.len();
        if count >= len {
            self.buffer.clear();
            return;
        }
        self.buffer.copy_within(count.., 0);
        self.buffer.truncate(len - count);
    }
}

fn find(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

fn rfind(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().rposition(|&b| b == needle)
}
