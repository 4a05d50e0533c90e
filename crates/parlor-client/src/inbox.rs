//! Hand-off queue from the reader task to the consumer.
//!
//! Unbounded and FIFO: lines come out in the order they arrived on the wire,
//! and the terminal [`Incoming::Closed`] message is always last. Pushing
//! never blocks, so a slow consumer can never stall the socket reader, and
//! [`Inbox::try_pop`] never blocks, so the consumer can poll on its own
//! cadence (a render timer, for instance) without waiting on the network.

use std::fmt;

use tokio::sync::mpsc;

/// Why the connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Server closed its side (read returned zero bytes).
    PeerClosed,
    /// Socket read failed or the server sent an unacceptable line.
    Failed(String),
    /// Local shutdown stopped the reader.
    Cancelled,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("[client] connection closed by server."),
            Self::Failed(reason) => write!(f, "[client] connection lost: {reason}"),
            Self::Cancelled => f.write_str("[client] connection closed."),
        }
    }
}

/// A message delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// One decoded line from the server (terminator stripped).
    Line(String),
    /// The connection ended. Delivered exactly once, after every line.
    Closed(CloseReason),
}

impl Incoming {
    /// Whether this is the terminal message.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    /// The line text, if this is a line.
    pub fn as_line(&self) -> Option<&str> {
        match self {
            Self::Line(line) => Some(line),
            Self::Closed(_) => None,
        }
    }
}

impl fmt::Display for Incoming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => f.write_str(line),
            Self::Closed(reason) => fmt::Display::fmt(reason, f),
        }
    }
}

/// Consumer end of the queue.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Incoming>,
}

impl Inbox {
    /// Next message if one is queued. Never blocks.
    pub fn try_pop(&mut self) -> Option<Incoming> {
        self.rx.try_recv().ok()
    }

    /// Everything queued right now, in order. Never blocks.
    pub fn drain(&mut self) -> Vec<Incoming> {
        std::iter::from_fn(|| self.try_pop()).collect()
    }

    /// Wait for the next message.
    ///
    /// For consumers that select over several sources instead of polling.
    /// Returns `None` once the owning session is gone and the queue is empty.
    pub async fn recv(&mut self) -> Option<Incoming> {
        self.rx.recv().await
    }
}

/// Producer end of the queue. Held by the session and its reader task.
#[derive(Debug, Clone)]
pub(crate) struct InboxSender {
    tx: mpsc::UnboundedSender<Incoming>,
}

impl InboxSender {
    /// Enqueue a message. Never blocks and never fails; messages pushed after
    /// the consumer dropped its [`Inbox`] are discarded.
    pub(crate) fn push(&self, message: Incoming) {
        if self.tx.send(message).is_err() {
            tracing::trace!("inbox dropped, discarding message");
        }
    }
}

/// Create a connected producer/consumer pair.
pub(crate) fn channel() -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboxSender { tx }, Inbox { rx })
}
