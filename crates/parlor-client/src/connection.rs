//! Socket ownership and line I/O.
//!
//! A [`Connection`] splits its stream into two capabilities:
//!
//! - [`LineReader`]: the read half plus the [`LineDecoder`]. Used once for
//!   the handshake, then handed to the reader task, which continues from the
//!   same decoder state so nothing is lost or repeated at the boundary.
//! - The write half, which stays with the connection for [`Connection::send_line`]
//!   and [`Connection::close`].
//!
//! The halves are independent, so sending from the session task while the
//! reader task is parked in a read is fine. Sends are serialized by `&mut`.

use std::{fmt, io, time::Duration};

use parlor_proto::{Decoded, LineDecoder, Lines, encode_line};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    ClientError, SessionConfig,
    error::{HandshakeError, ReadError},
};

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Remote endpoint as the caller named it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// An open connection to a chat server.
pub struct Connection {
    peer: Peer,
    reader: Option<LineReader>,
    writer: Option<BoxedWrite>,
}

impl Connection {
    /// Open a TCP connection, bounded by `config.connect_timeout`.
    pub async fn open(host: &str, port: u16, config: &SessionConfig) -> Result<Self, ClientError> {
        let peer = Peer { host: host.to_string(), port };
        let addr = peer.to_string();

        let stream =
            match tokio::time::timeout(config.connect_timeout, TcpStream::connect((host, port)))
                .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(source)) => return Err(ClientError::Connect { addr, source }),
                Err(_) => {
                    return Err(ClientError::ConnectTimeout {
                        addr,
                        timeout: config.connect_timeout,
                    });
                },
            };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        tracing::info!(%peer, "tcp connection established");
        Ok(Self::from_stream(peer, stream, config))
    }

    /// Wrap an already-connected stream.
    pub fn from_stream<S>(peer: Peer, stream: S, config: &SessionConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        let reader = LineReader::new(Box::new(read), config);
        Self { peer, reader: Some(reader), writer: Some(Box::new(write)) }
    }

    /// Remote endpoint.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Whether sends are still possible.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Read the server greeting, bounded by `limit`.
    ///
    /// A server that stays silent past `limit` yields an empty greeting and
    /// the handshake carries on. Partial bytes and later lines stay in the
    /// decoder for the reader task.
    pub async fn read_handshake_line(&mut self, limit: Duration) -> Result<String, HandshakeError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ReadError::Io(io::ErrorKind::NotConnected.into()))?;

        match tokio::time::timeout(limit, reader.read_line()).await {
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => Err(HandshakeError::PeerClosed),
            Ok(Err(e)) => Err(HandshakeError::Read(e)),
            Err(_) => {
                tracing::debug!(?limit, "no greeting before timeout");
                Ok(String::new())
            },
        }
    }

    /// Hand the read capability to the reader task.
    pub(crate) fn detach_reader(&mut self) -> Option<LineReader> {
        self.reader.take()
    }

    /// Send `text` followed by a line feed.
    ///
    /// `write_all` retries partial writes until every byte is out.
    pub async fn send_line(&mut self, text: &str) -> Result<(), ClientError> {
        let line = encode_line(text)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ClientError::Send(io::ErrorKind::NotConnected.into()))?;

        writer.write_all(&line).await.map_err(ClientError::Send)?;
        writer.flush().await.map_err(ClientError::Send)?;

        tracing::debug!(bytes = line.len(), "sent line");
        Ok(())
    }

    /// Half-close the write side, then release the socket.
    ///
    /// Idempotent. Failures are logged, never returned.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(peer = %self.peer, error = %e, "write shutdown failed");
            }
            tracing::info!(peer = %self.peer, "connection closed");
        }
        self.reader = None;
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("reader_attached", &self.reader.is_some())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Read capability: the read half of the socket plus decoder state.
pub(crate) struct LineReader {
    source: BoxedRead,
    decoder: LineDecoder,
    chunk: Vec<u8>,
}

impl LineReader {
    fn new(source: BoxedRead, config: &SessionConfig) -> Self {
        Self {
            source,
            decoder: LineDecoder::with_max_line_len(config.max_line_len),
            chunk: vec![0; config.read_chunk_size.max(1)],
        }
    }

    /// Next complete line, reading as needed. `None` at end-of-stream.
    ///
    /// Cancel safe: the decoder only changes after a read completes.
    pub(crate) async fn read_line(&mut self) -> Result<Option<String>, ReadError> {
        loop {
            if let Some(line) = self.decoder.next_line()? {
                return Ok(Some(line));
            }
            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    /// Perform one read and feed it to the decoder.
    ///
    /// Returns `false` at end-of-stream. Cancel safe.
    pub(crate) async fn fill(&mut self) -> io::Result<bool> {
        let n = self.source.read(&mut self.chunk).await?;
        match self.decoder.feed(&self.chunk[..n]) {
            Decoded::EndOfStream => Ok(false),
            // Lines stay buffered until the caller pulls them.
            Decoded::Lines(_) => Ok(true),
        }
    }

    /// Complete lines currently buffered.
    pub(crate) fn lines(&mut self) -> Lines<'_> {
        self.decoder.lines()
    }

    /// Unterminated bytes left after end-of-stream.
    pub(crate) fn finish(&mut self) -> Option<String> {
        self.decoder.finish()
    }
}
