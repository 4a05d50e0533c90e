//! Session lifecycle state.
//!
//! ```text
//! Disconnected -> Connecting -> Handshaking -> Active -> Closing -> Closed
//!       ^              |              |           |                   ^
//!       +--------------+--------------+           +-------------------+
//!          (connect or handshake failure)          (reader saw the end)
//! ```
//!
//! The [`SessionLink`] is the only state shared with the reader task. The
//! session drives every transition except one: the reader moves `Active` to
//! `Closed` when it observes the end of the stream.

use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use tokio::sync::watch;

use crate::inbox::{CloseReason, Incoming, InboxSender};

/// Lifecycle state of a [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection. `connect` is allowed.
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// Waiting for the greeting and sending the username.
    Handshaking,
    /// Reader task running; `send` is allowed.
    Active,
    /// `shutdown` in progress.
    Closing,
    /// Terminal. The connection is gone and will not be reopened.
    Closed,
}

impl SessionState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared between the session and its reader task.
#[derive(Debug)]
pub(crate) struct SessionLink {
    state: watch::Sender<SessionState>,
    /// Set once the terminal message has been pushed.
    terminated: AtomicBool,
}

impl SessionLink {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self { state, terminated: AtomicBool::new(false) }
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn set(&self, next: SessionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::debug!(from = %prev, to = %next, "session state");
        }
    }

    /// Move `from` to `to`. Returns `false` and leaves the state untouched if
    /// the current state is not `from`.
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let moved = self.state.send_if_modified(|state| {
            if *state != from {
                return false;
            }
            *state = to;
            true
        });
        if moved {
            tracing::debug!(from = %from, to = %to, "session state");
        }
        moved
    }

    /// Push the terminal message and leave `Active`.
    ///
    /// Only the first call has any effect, however many paths race to report
    /// the end of the connection.
    pub(crate) fn terminate(&self, reason: CloseReason, inbox: &InboxSender) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::info!(%reason, "connection ended");
        inbox.push(Incoming::Closed(reason));
        self.transition(SessionState::Active, SessionState::Closed);
    }

    #[cfg(test)]
    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}
