//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Framing errors.
///
/// Both are fatal for the line in question. A decoder that reports
/// [`ProtocolError::LineTooLong`] skips that line through its terminator and
/// keeps decoding, but callers usually end the connection anyway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A line grew past the decoder's limit before its terminator arrived.
    #[error("line of {len} bytes exceeds limit of {max} bytes")]
    LineTooLong {
        /// Line length in bytes, terminator excluded, when the limit was hit.
        len: usize,
        /// Configured limit.
        max: usize,
    },

    /// Outbound text contains a line feed or carriage return.
    #[error("outbound text contains a line break")]
    EmbeddedLineBreak,
}
