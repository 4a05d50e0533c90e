//! Client error types.
//!
//! Setup failures ([`ClientError::Connect`], [`ClientError::ConnectTimeout`],
//! [`ClientError::Handshake`]) end that connection attempt and leave the
//! session `Disconnected`. [`ClientError::Send`] is reported per call and
//! does not end the session. Failures while streaming are never returned as
//! errors: the reader task turns them into one terminal inbox message.

use std::{io, time::Duration};

use parlor_proto::ProtocolError;
use thiserror::Error;

use crate::SessionState;

/// Errors surfaced to the caller of [`Session`](crate::Session) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// DNS resolution or TCP connect failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address as requested (`host:port`).
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout {
        /// Address as requested (`host:port`).
        addr: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// Greeting/username exchange failed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Writing a line to the socket failed.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Outbound text cannot be framed as a single line.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Username is empty or whitespace.
    #[error("username must not be empty")]
    EmptyUsername,

    /// Operation not valid in the current session state.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// Operation attempted.
        operation: &'static str,
        /// State at the time of the call.
        state: SessionState,
    },
}

/// Handshake failures. Treated as connect failures.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Peer closed before a complete greeting line arrived.
    #[error("server closed the connection before greeting")]
    PeerClosed,

    /// Reading the greeting failed.
    #[error("reading greeting failed: {0}")]
    Read(#[from] ReadError),

    /// Sending the username failed.
    #[error("sending username failed: {0}")]
    Send(#[source] io::Error),
}

/// Failure while reading lines off the socket.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Socket read failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Server sent a line the decoder refuses.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
