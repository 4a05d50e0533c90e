//! Background reader task.
//!
//! Pulls lines off the socket and forwards them to the inbox until the peer
//! closes, the read fails, or the session asks it to stop. Whatever the exit
//! path, it leaves exactly one [`Incoming::Closed`] as the last message.
//!
//! # Cancellation
//!
//! The stop signal is checked before every read and also raced against the
//! pending read, so a reader parked on an idle socket exits as soon as the
//! session signals. Reads are cancel safe, so stopping mid-read loses nothing
//! that was already decoded.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    connection::LineReader,
    inbox::{CloseReason, Incoming, InboxSender},
    state::SessionLink,
};

/// Reader task state, moved into the spawned task.
pub(crate) struct ReaderTask {
    reader: LineReader,
    inbox: InboxSender,
    link: Arc<SessionLink>,
    stop: watch::Receiver<bool>,
}

impl ReaderTask {
    pub(crate) fn new(
        reader: LineReader,
        inbox: InboxSender,
        link: Arc<SessionLink>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self { reader, inbox, link, stop }
    }

    /// Start the task on the current tokio runtime.
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::debug!("reader task started");
        let reason = self.pump().await;
        self.link.terminate(reason, &self.inbox);
        tracing::debug!("reader task finished");
    }

    async fn pump(&mut self) -> CloseReason {
        loop {
            // Drains lines left over from the handshake on the first pass.
            for line in self.reader.lines() {
                match line {
                    Ok(line) => {
                        tracing::trace!(len = line.len(), "received line");
                        self.inbox.push(Incoming::Line(line));
                    },
                    Err(e) => return CloseReason::Failed(e.to_string()),
                }
            }

            if *self.stop.borrow() {
                return CloseReason::Cancelled;
            }

            tokio::select! {
                biased;

                _ = self.stop.changed() => return CloseReason::Cancelled,

                filled = self.reader.fill() => match filled {
                    Ok(true) => {},
                    Ok(false) => {
                        if let Some(rest) = self.reader.finish() {
                            self.inbox.push(Incoming::Line(rest));
                        }
                        return CloseReason::PeerClosed;
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "socket read failed");
                        return CloseReason::Failed(e.to_string());
                    },
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
        time::Duration,
    };

    use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

    use super::*;
    use crate::{
        SessionConfig, SessionState,
        connection::{Connection, Peer},
        inbox::{self, Inbox},
    };

    struct Harness<P = tokio::io::DuplexStream> {
        server: P,
        inbox: Inbox,
        link: Arc<SessionLink>,
        stop: watch::Sender<bool>,
        handle: JoinHandle<()>,
        // Keeps the write half alive so the reader sees only server-side closes.
        _conn: Connection,
    }

    fn start(config: &SessionConfig) -> Harness {
        let (client, server) = tokio::io::duplex(64);
        start_over(client, server, config)
    }

    fn start_over<S, P>(client: S, server: P, config: &SessionConfig) -> Harness<P>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let peer = Peer { host: "test".into(), port: 1 };
        let mut conn = Connection::from_stream(peer, client, config);
        let reader = conn.detach_reader().unwrap();

        let (tx, inbox) = inbox::channel();
        let link = Arc::new(SessionLink::new());
        link.set(SessionState::Active);
        let (stop, stop_rx) = watch::channel(false);

        let handle = ReaderTask::new(reader, tx, Arc::clone(&link), stop_rx).spawn();
        Harness { server, inbox, link, stop, handle, _conn: conn }
    }

    #[tokio::test]
    async fn forwards_lines_then_terminal_on_peer_close() {
        let mut h = start(&SessionConfig::default());

        h.server.write_all(b"Welcome\n").await.unwrap();
        h.server.write_all(b"Hi\r\nBye\n").await.unwrap();
        drop(h.server);

        h.handle.await.unwrap();
        assert_eq!(h.inbox.drain(), vec![
            Incoming::Line("Welcome".into()),
            Incoming::Line("Hi".into()),
            Incoming::Line("Bye".into()),
            Incoming::Closed(CloseReason::PeerClosed),
        ]);
        assert_eq!(h.link.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn trailing_partial_line_is_delivered_before_terminal() {
        let mut h = start(&SessionConfig::default());

        h.server.write_all(b"done\nno newline").await.unwrap();
        drop(h.server);

        h.handle.await.unwrap();
        assert_eq!(h.inbox.drain(), vec![
            Incoming::Line("done".into()),
            Incoming::Line("no newline".into()),
            Incoming::Closed(CloseReason::PeerClosed),
        ]);
    }

    #[tokio::test]
    async fn stop_signal_interrupts_idle_read() {
        let mut h = start(&SessionConfig::default());

        h.server.write_all(b"one\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.stop.send_replace(true);

        tokio::time::timeout(Duration::from_secs(1), h.handle).await.unwrap().unwrap();
        assert_eq!(h.inbox.drain(), vec![
            Incoming::Line("one".into()),
            Incoming::Closed(CloseReason::Cancelled),
        ]);
    }

    #[tokio::test]
    async fn dropped_stop_sender_ends_reader() {
        let h = start(&SessionConfig::default());
        drop(h.stop);

        tokio::time::timeout(Duration::from_secs(1), h.handle).await.unwrap().unwrap();
        assert!(h.link.is_terminated());
    }

    #[tokio::test]
    async fn oversized_line_fails_the_connection() {
        let config = SessionConfig { max_line_len: 8, ..SessionConfig::default() };
        let mut h = start(&config);

        h.server.write_all(b"ok\nthis line is far too long\n").await.unwrap();

        h.handle.await.unwrap();
        let messages = h.inbox.drain();
        assert_eq!(messages[0], Incoming::Line("ok".into()));
        assert!(matches!(&messages[1], Incoming::Closed(CloseReason::Failed(_))));
        assert_eq!(messages.len(), 2);
    }

    /// Yields `data` on the first read, then fails every read after it.
    struct ResetAfter {
        data: Option<&'static [u8]>,
    }

    impl AsyncRead for ResetAfter {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(data);
                    Poll::Ready(Ok(()))
                },
                None => Poll::Ready(Err(io::ErrorKind::ConnectionReset.into())),
            }
        }
    }

    impl AsyncWrite for ResetAfter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn socket_error_ends_with_one_failed_terminal() {
        let stream = ResetAfter { data: Some(b"last words\n") };
        let mut h = start_over(stream, (), &SessionConfig::default());

        tokio::time::timeout(Duration::from_secs(1), &mut h.handle).await.unwrap().unwrap();
        let messages = h.inbox.drain();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Incoming::Line("last words".into()));
        assert!(
            matches!(&messages[1], Incoming::Closed(CloseReason::Failed(reason)) if reason.contains("reset")),
            "unexpected terminal: {:?}",
            messages[1],
        );
        assert_eq!(messages.iter().filter(|m| m.is_closed()).count(), 1);
        assert_eq!(h.link.state(), SessionState::Closed);
        assert!(h.link.is_terminated());
    }
}
