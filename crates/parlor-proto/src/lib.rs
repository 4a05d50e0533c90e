//! Parlor wire protocol
//!
//! Plain UTF-8 text over TCP. Every logical message is one line terminated by
//! a line feed. A carriage return before the line feed is tolerated on
//! receipt and never emitted on send.
//!
//! # Session shape
//!
//! 1. Server sends one greeting line.
//! 2. Client replies with exactly one line: its username.
//! 3. Both sides exchange lines freely. The client may send the control
//!    strings in [`Command`]; the server alone decides what they mean.
//!
//! # Components
//!
//! - [`LineDecoder`]: Reassembles lines from arbitrarily fragmented reads
//! - [`encode_line`]: Frames one outbound line
//! - [`Command`]: Control strings the server recognizes
//! - [`ProtocolError`]: Framing failures

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod decoder;
pub mod errors;

use bytes::{BufMut, Bytes, BytesMut};
pub use command::Command;
pub use decoder::{Decoded, LineDecoder, Lines};
pub use errors::{ProtocolError, Result};

/// Line terminator.
pub const LINE_FEED: u8 = b'\n';

/// Optional byte before [`LINE_FEED`], stripped on receipt.
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Host the reference server listens on by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the reference server listens on by default.
pub const DEFAULT_PORT: u16 = 5000;

/// Longest line (in bytes, terminator excluded) a decoder buffers by default.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

/// Encode `text` as one wire line.
///
/// Appends the line feed terminator. Text that already contains a line feed
/// or carriage return is rejected: it would reach the peer as more than one
/// message.
pub fn encode_line(text: &str) -> Result<Bytes> {
    if text.bytes().any(|b| b == LINE_FEED || b == CARRIAGE_RETURN) {
        return Err(ProtocolError::EmbeddedLineBreak);
    }

    let mut buf = BytesMut::with_capacity(text.len() + 1);
    buf.put_slice(text.as_bytes());
    buf.put_u8(LINE_FEED);
    Ok(buf.freeze())
}
