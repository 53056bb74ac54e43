//! In-process echo server used by the tests.
//!
//! Raw echo with no framing: every read is written straight back. The
//! `Behavior` knob scripts the ways a broken server can misbehave.

use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::config::Config;

const BUFFER_SIZE: usize = 8192;

/// How the fixture answers a connection.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Echo every read back unchanged.
    Echo,
    /// Echo, but flip the last byte of any read equal to this payload.
    CorruptOn(Bytes),
    /// Read the request, then close without replying.
    SwallowAndClose,
    /// Read the request and never reply.
    Stall,
    /// Read the request, then abort the connection with a RST.
    Reset,
}

/// Running fixture. The accept loop is aborted on drop.
pub struct TestServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// Connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Driver config aimed at this server, `requests` iterations.
    pub fn config(&self, requests: usize) -> Config {
        Config {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            requests,
            ..Config::default()
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind on an ephemeral loopback port and start accepting.
pub async fn spawn_server(behavior: Behavior) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    let task = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let behavior = behavior.clone();
            tokio::spawn(async move {
                let _ = handle_connection(stream, behavior).await;
            });
        }
    });

    TestServer {
        addr,
        accepted,
        task,
    }
}

/// An endpoint nothing is listening on.
pub async fn unused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

async fn handle_connection(mut stream: TcpStream, behavior: Behavior) -> std::io::Result<()> {
    let mut buffer = BytesMut::zeroed(BUFFER_SIZE);

    loop {
        let n = stream.read(&mut buffer[..]).await?;
        if n == 0 {
            return Ok(());
        }
        let data = &mut buffer[..n];

        match &behavior {
            Behavior::Echo => {}
            Behavior::CorruptOn(payload) => {
                if *data == payload[..] {
                    data[n - 1] ^= 0xff;
                }
            }
            Behavior::SwallowAndClose => return Ok(()),
            Behavior::Stall => {
                std::future::pending::<()>().await;
            }
            Behavior::Reset => {
                // Zero linger turns the close into a RST.
                stream.set_linger(Some(Duration::ZERO))?;
                return Ok(());
            }
        }

        stream.write_all(data).await?;
    }
}
