//! Session controller.
//!
//! Orchestrates one client session: connect, handshake, start the reader
//! task, send lines and commands, and shut everything down in order.
//!
//! The session owns the write capability and the only close path. The reader
//! task owns the read capability and reports the end of the stream through
//! the shared [`SessionLink`]. Nothing else is shared.

use std::sync::Arc;

use parlor_proto::Command;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::watch,
    task::JoinHandle,
};

use crate::{
    ClientError, SessionConfig, SessionState,
    connection::{Connection, Peer},
    error::HandshakeError,
    inbox::{self, CloseReason, Inbox, InboxSender, Incoming},
    reader::ReaderTask,
    state::SessionLink,
};

/// A client session with one chat server.
///
/// Created with [`Session::new`], which also returns the [`Inbox`] the
/// consumer polls for server lines.
///
/// # Invariants
///
/// - `send` touches the socket only while the session is `Active`.
/// - The inbox receives exactly one terminal message per established
///   connection, after every line from that connection.
/// - `shutdown` never fails and always ends in `Closed`.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    link: Arc<SessionLink>,
    inbox: InboxSender,
    connection: Option<Connection>,
    reader: Option<JoinHandle<()>>,
    stop: Option<watch::Sender<bool>>,
    username: Option<String>,
    disconnect_requested: bool,
}

impl Session {
    /// Create a disconnected session and the inbox it delivers to.
    pub fn new(config: SessionConfig) -> (Self, Inbox) {
        let (inbox, rx) = inbox::channel();
        let session = Self {
            config,
            link: Arc::new(SessionLink::new()),
            inbox,
            connection: None,
            reader: None,
            stop: None,
            username: None,
            disconnect_requested: false,
        };
        (session, rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.link.state()
    }

    /// Watch lifecycle changes, including the reader's `Active -> Closed`.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.link.subscribe()
    }

    /// Whether lines can be sent.
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Remote endpoint of the current connection.
    pub fn peer(&self) -> Option<&Peer> {
        self.connection.as_ref().map(Connection::peer)
    }

    /// Username sent during the last successful handshake.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Whether the logout command has been sent.
    ///
    /// Display-only: the server decides whether the session actually ends,
    /// and the consumer learns that from the inbox.
    pub fn disconnect_requested(&self) -> bool {
        self.disconnect_requested
    }

    /// Connect to `host:port` and log in as `username`.
    ///
    /// Valid only while `Disconnected`. On failure the session returns to
    /// `Disconnected` and may be connected again.
    pub async fn connect(
        &mut self,
        host: &str,
        port: u16,
        username: &str,
    ) -> Result<(), ClientError> {
        self.begin_connect(username)?;

        match Connection::open(host, port, &self.config).await {
            Ok(conn) => self.establish(conn, username).await,
            Err(e) => Err(self.abort_connect(e)),
        }
    }

    /// Like [`Session::connect`], over a stream the caller already opened.
    pub async fn attach<S>(
        &mut self,
        peer: Peer,
        stream: S,
        username: &str,
    ) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.begin_connect(username)?;

        let conn = Connection::from_stream(peer, stream, &self.config);
        self.establish(conn, username).await
    }

    /// Send one chat line.
    ///
    /// A no-op for empty text or when the session is not `Active`. A send
    /// failure is returned but does not end the session; only the reader
    /// task decides that the connection is gone.
    pub async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        if text.is_empty() || !self.is_active() {
            tracing::debug!(state = %self.state(), empty = text.is_empty(), "send ignored");
            return Ok(());
        }
        let Some(conn) = self.connection.as_mut() else {
            return Ok(());
        };

        conn.send_line(text).await.inspect_err(|e| {
            tracing::warn!(error = %e, "send failed");
        })?;

        if Command::is_logout(text) {
            self.disconnect_requested = true;
        }
        Ok(())
    }

    /// Send a pre-defined control command.
    pub async fn send_command(&mut self, command: Command) -> Result<(), ClientError> {
        self.send(command.as_str()).await
    }

    /// Close the session from any state.
    ///
    /// Sends the logout command if still connected, stops the reader task,
    /// and closes the connection. Each step is attempted even if an earlier
    /// one fails. Idempotent.
    pub async fn shutdown(&mut self) {
        let prev = self.state();
        if prev == SessionState::Closed && self.connection.is_none() && self.reader.is_none() {
            return;
        }
        self.link.set(SessionState::Closing);

        if prev == SessionState::Active
            && let Some(conn) = self.connection.as_mut()
        {
            match conn.send_line(Command::Quit.as_str()).await {
                Ok(()) => self.disconnect_requested = true,
                Err(e) => tracing::debug!(error = %e, "logout on shutdown failed"),
            }
        }

        if let Some(stop) = self.stop.take() {
            stop.send_replace(true);
        }

        if let Some(mut conn) = self.connection.take() {
            conn.close().await;
        }

        if let Some(handle) = self.reader.take() {
            self.join_reader(handle).await;
        }

        self.link.set(SessionState::Closed);
        tracing::info!("session closed");
    }

    fn begin_connect(&mut self, username: &str) -> Result<(), ClientError> {
        if !self.link.transition(SessionState::Disconnected, SessionState::Connecting) {
            return Err(ClientError::InvalidState { operation: "connect", state: self.state() });
        }
        if username.trim().is_empty() {
            self.link.set(SessionState::Disconnected);
            return Err(ClientError::EmptyUsername);
        }
        Ok(())
    }

    fn abort_connect(&mut self, error: ClientError) -> ClientError {
        tracing::warn!(%error, "connect failed");
        self.link.set(SessionState::Disconnected);
        error
    }

    async fn establish(&mut self, mut conn: Connection, username: &str) -> Result<(), ClientError> {
        self.link.set(SessionState::Handshaking);

        let reader = match self.handshake(&mut conn, username).await {
            Ok(()) => conn.detach_reader(),
            Err(e) => {
                conn.close().await;
                return Err(self.abort_connect(e));
            },
        };
        let Some(reader) = reader else {
            conn.close().await;
            return Err(self.abort_connect(ClientError::Handshake(HandshakeError::PeerClosed)));
        };

        let (stop, stop_rx) = watch::channel(false);
        self.link.set(SessionState::Active);
        let handle = ReaderTask::new(reader, self.inbox.clone(), Arc::clone(&self.link), stop_rx)
            .spawn();

        tracing::info!(peer = %conn.peer(), %username, "session active");
        self.connection = Some(conn);
        self.reader = Some(handle);
        self.stop = Some(stop);
        self.username = Some(username.to_string());
        self.disconnect_requested = false;
        Ok(())
    }

    async fn handshake(&self, conn: &mut Connection, username: &str) -> Result<(), ClientError> {
        let greeting = conn.read_handshake_line(self.config.handshake_timeout).await?;
        tracing::debug!(%greeting, "received greeting");
        if !greeting.is_empty() {
            self.inbox.push(Incoming::Line(greeting));
        }

        conn.send_line(username).await.map_err(|e| match e {
            ClientError::Send(io) => ClientError::Handshake(HandshakeError::Send(io)),
            other => other,
        })
    }

    /// Wait for the reader to exit; abort it if it overstays the grace period.
    async fn join_reader(&self, mut handle: JoinHandle<()>) {
        match tokio::time::timeout(self.config.shutdown_grace, &mut handle).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "reader task failed");
                self.link.terminate(CloseReason::Failed(e.to_string()), &self.inbox);
            },
            Err(_) => {
                tracing::warn!(grace = ?self.config.shutdown_grace, "reader task did not stop, aborting");
                handle.abort();
                // Wait for the abort to land so nothing is pushed after the terminal message.
                let _ = handle.await;
                self.link.terminate(CloseReason::Cancelled, &self.inbox);
            },
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.send_replace(true);
        }
    }
}
