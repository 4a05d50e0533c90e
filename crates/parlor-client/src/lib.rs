//! Client
//!
//! Concurrent client session for the Parlor line protocol. One [`Session`]
//! owns one TCP connection to a chat server, performs the greeting/username
//! handshake, and runs a background reader task that forwards every server
//! line to an [`Inbox`].
//!
//! # Architecture
//!
//! Two concurrent activities share a single connection:
//!
//! - The caller drives the [`Session`]: `connect`, `send`, `send_command`,
//!   `shutdown`. Sends write directly to the socket.
//! - The reader task owns the read half, decodes lines, and pushes them to
//!   the inbox. When the stream ends it pushes exactly one
//!   [`Incoming::Closed`] and exits.
//!
//! The consumer polls the inbox with [`Inbox::try_pop`] (never blocks) or
//! awaits [`Inbox::recv`].
//!
//! # Components
//!
//! - [`Session`]: lifecycle and outbound lines
//! - [`Inbox`]: ordered hand-off of inbound lines and the terminal message
//! - [`Connection`]: socket ownership and line I/O
//! - [`SessionConfig`]: timeouts and buffer limits

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod connection;
mod error;
mod inbox;
mod reader;
mod session;
mod state;

pub use config::SessionConfig;
pub use connection::{Connection, Peer};
pub use error::{ClientError, HandshakeError, ReadError};
pub use inbox::{CloseReason, Inbox, Incoming};
pub use parlor_proto::Command;
pub use session::Session;
pub use state::SessionState;
