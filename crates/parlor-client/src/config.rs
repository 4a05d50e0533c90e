//! Session configuration.

use std::time::Duration;

use parlor_proto::DEFAULT_MAX_LINE_LEN;

/// Timeouts and limits for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on establishing the TCP connection (DNS included).
    pub connect_timeout: Duration,
    /// Upper bound on receiving the server greeting.
    pub handshake_timeout: Duration,
    /// Bytes requested per socket read.
    pub read_chunk_size: usize,
    /// Longest line accepted from the server.
    pub max_line_len: usize,
    /// How long `shutdown` waits for the reader task before aborting it.
    pub shutdown_grace: Duration,
}

impl SessionConfig {
    /// Short timeouts for local testing.
    pub fn development() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_millis(200),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            read_chunk_size: 4096,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            shutdown_grace: Duration::from_secs(1),
        }
    }
}
