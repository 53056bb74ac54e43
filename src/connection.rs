//! Single-use connection to the echo server.
//!
//! Each iteration gets a fresh `EchoConnection` that walks
//! `Unopened -> Connected -> Sent -> Received -> Closed`. The connection
//! owns its stream, so every exit path releases the socket. Dropping a
//! connection that never reached `Closed` is how error paths close it.

use crate::error::{ProbeError, Stage};
use bytes::{Bytes, BytesMut};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// No socket yet.
    Unopened,
    /// TCP handshake complete.
    Connected,
    /// Payload fully written.
    Sent,
    /// Reply read.
    Received,
    /// Socket released.
    Closed,
}

/// A connection used for exactly one request/reply exchange.
#[derive(Debug)]
pub struct EchoConnection {
    /// Iteration this connection belongs to.
    index: usize,
    stream: Option<TcpStream>,
    state: ConnState,
    timeout: Option<Duration>,
}

impl EchoConnection {
    /// Create a connection for iteration `index`, not yet opened.
    ///
    /// `timeout` bounds each later operation individually; `None` blocks
    /// for as long as the peer takes.
    pub fn new(index: usize, timeout: Option<Duration>) -> Self {
        Self {
            index,
            stream: None,
            state: ConnState::Unopened,
            timeout,
        }
    }

    /// Current state, for tests
    #[cfg(test)]
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Open the TCP connection.
    pub async fn connect(&mut self, endpoint: &str) -> Result<(), ProbeError> {
        debug_assert_eq!(self.state, ConnState::Unopened);
        let index = self.index;

        let stream = bounded(self.timeout, index, Stage::Connect, TcpStream::connect(endpoint))
            .await?
            .map_err(|source| ProbeError::Connect {
                index,
                endpoint: endpoint.to_string(),
                source,
            })?;

        // Payloads are tiny; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            debug!(index, error = %e, "Failed to set TCP_NODELAY");
        }

        self.stream = Some(stream);
        self.transition(ConnState::Connected);
        Ok(())
    }

    /// Write the whole payload.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), ProbeError> {
        debug_assert_eq!(self.state, ConnState::Connected);
        let index = self.index;
        let timeout = self.timeout;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ProbeError::Write {
                index,
                source: not_connected(),
            })?;

        bounded(timeout, index, Stage::Write, stream.write_all(payload))
            .await?
            .map_err(|source| ProbeError::Write { index, source })?;

        self.transition(ConnState::Sent);
        Ok(())
    }

    /// Read the reply with a single read of at most `buffer_size` bytes.
    ///
    /// A peer that closes without replying yields an empty reply.
    pub async fn receive(&mut self, buffer_size: usize) -> Result<Bytes, ProbeError> {
        debug_assert_eq!(self.state, ConnState::Sent);
        let index = self.index;
        let timeout = self.timeout;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ProbeError::Read {
                index,
                source: not_connected(),
            })?;

        let mut buffer = BytesMut::zeroed(buffer_size);
        let n = bounded(timeout, index, Stage::Read, stream.read(&mut buffer[..]))
            .await?
            .map_err(|source| ProbeError::Read { index, source })?;
        buffer.truncate(n);

        self.transition(ConnState::Received);
        Ok(buffer.freeze())
    }

    /// Release the socket.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.state == ConnState::Closed {
            return;
        }
        if self.state != ConnState::Received && self.state != ConnState::Unopened {
            trace!(index = self.index, state = ?self.state, "Closing connection after error");
        }
        // Dropping the stream closes the socket.
        self.stream = None;
        self.transition(ConnState::Closed);
    }

    fn transition(&mut self, next: ConnState) {
        trace!(index = self.index, from = ?self.state, to = ?next, "Connection state");
        self.state = next;
    }
}

impl Drop for EchoConnection {
    fn drop(&mut self) {
        self.release();
    }
}

fn not_connected() -> std::io::Error {
    std::io::Error::from(std::io::ErrorKind::NotConnected)
}

/// Await `fut`, giving up after `timeout` if one is configured.
async fn bounded<F: Future>(
    timeout: Option<Duration>,
    index: usize,
    stage: Stage,
    fut: F,
) -> Result<F::Output, ProbeError> {
    match timeout {
        None => Ok(fut.await),
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| ProbeError::Timeout {
                index,
                stage,
                after,
            }),
    }
}
