//! Stream-to-lines decoder.
//!
//! TCP delivers bytes in whatever chunks the network produced. A single read
//! may carry half a line, several lines, or a line plus the start of the next
//! one. [`LineDecoder`] buffers the leftovers so the sequence of lines it
//! yields is the same no matter where the chunk boundaries fall.
//!
//! # Invariants
//!
//! - Between deliveries the buffer holds at most one unterminated line, as
//!   long as callers drain [`Lines`] after each feed.
//! - Bytes are never dropped or duplicated, except the bytes of a line
//!   rejected as too long. Complete lines that a caller did not pull from
//!   [`Lines`] stay buffered for the next call.
//! - Decoding happens per complete line, so a multi-byte character split
//!   across reads is reassembled before it is decoded.

use bytes::BytesMut;

use crate::{CARRIAGE_RETURN, DEFAULT_MAX_LINE_LEN, LINE_FEED, ProtocolError, Result};

/// Incremental line decoder.
///
/// Owned by whoever reads the socket: first the handshake step, then the
/// reader task, which continues from the same state.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already searched without finding a line feed.
    scanned: usize,
    max_line_len: usize,
    /// Inside a rejected line; everything up to the next line feed is dropped.
    discarding: bool,
}

/// Outcome of feeding one read result into the decoder.
#[must_use = "lines are only extracted when the iterator is consumed"]
#[derive(Debug)]
pub enum Decoded<'a> {
    /// Zero or more complete lines are available.
    Lines(Lines<'a>),
    /// The read returned no bytes: the peer closed its side.
    EndOfStream,
}

/// Lazy iterator over the complete lines currently buffered.
///
/// Yields `Err` once for each line that exceeds the limit and carries on with
/// the lines after it.
#[derive(Debug)]
pub struct Lines<'a> {
    decoder: &'a mut LineDecoder,
}

impl LineDecoder {
    /// Create a decoder with [`DEFAULT_MAX_LINE_LEN`].
    pub fn new() -> Self {
        Self::with_max_line_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Create a decoder that rejects lines longer than `max_line_len` bytes.
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(4096), scanned: 0, max_line_len, discarding: false }
    }

    /// Append one read result.
    ///
    /// An empty `chunk` means the read hit end-of-stream and yields
    /// [`Decoded::EndOfStream`], which is distinct from a chunk that simply
    /// does not complete a line.
    pub fn feed(&mut self, chunk: &[u8]) -> Decoded<'_> {
        if chunk.is_empty() {
            return Decoded::EndOfStream;
        }

        self.buffer.extend_from_slice(chunk);
        Decoded::Lines(Lines { decoder: self })
    }

    /// Iterate over lines already buffered, without feeding new bytes.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { decoder: self }
    }

    /// Pop the next complete line, if one is buffered.
    ///
    /// A line longer than the limit is reported once and skipped through its
    /// terminator; lines after it decode normally.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == LINE_FEED)
            else {
                return self.hold_unterminated().map(|()| None);
            };

            let end = self.scanned + offset;
            let mut line = self.buffer.split_to(end + 1);
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            line.truncate(end);
            if line.last() == Some(&CARRIAGE_RETURN) {
                line.truncate(end - 1);
            }
            if line.len() > self.max_line_len {
                return Err(ProtocolError::LineTooLong { len: line.len(), max: self.max_line_len });
            }

            return Ok(Some(decode_text(&line)));
        }
    }

    /// Take whatever unterminated bytes remain after end-of-stream.
    ///
    /// Returns `None` if the stream ended on a line boundary or inside a line
    /// that was already rejected as too long.
    pub fn finish(&mut self) -> Option<String> {
        let discarding = std::mem::take(&mut self.discarding);
        self.scanned = 0;
        if self.buffer.is_empty() || discarding {
            self.buffer.clear();
            return None;
        }

        let rest = self.buffer.split();
        Some(decode_text(&rest))
    }

    /// Bytes buffered but not yet delivered.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.discarding = false;
    }

    /// Keep an unterminated tail, or reject it once it can no longer fit.
    ///
    /// A trailing carriage return does not count: it may be the start of a
    /// CRLF terminator.
    fn hold_unterminated(&mut self) -> Result<()> {
        let len = self.buffer.len();
        if self.discarding {
            self.buffer.clear();
            self.scanned = 0;
            return Ok(());
        }

        self.scanned = len;
        let content = if self.buffer.last() == Some(&CARRIAGE_RETURN) { len - 1 } else { len };
        if content <= self.max_line_len {
            return Ok(());
        }

        self.buffer.clear();
        self.scanned = 0;
        self.discarding = true;
        Err(ProtocolError::LineTooLong { len: content, max: self.max_line_len })
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Lines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_line().transpose()
    }
}

/// Decode one line's bytes, substituting U+FFFD for invalid sequences.
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
