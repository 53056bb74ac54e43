//! Sequential echo load driver.
//!
//! Runs `requests` iterations one after another. Each iteration opens a
//! fresh connection, sends its payload, reads one reply and compares it
//! byte-for-byte. The run stops at the first failure of any kind.

use crate::config::Config;
use crate::connection::EchoConnection;
use crate::error::{Mismatch, ProbeError};
use crate::payload;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Summary of a run where every iteration passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Iterations that completed and matched.
    pub completed: usize,
    /// Total payload bytes echoed back.
    pub bytes_echoed: u64,
    /// Wall-clock time for the whole run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Completed iterations per second.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives an echo server with the settings from `Config`.
pub struct Driver {
    endpoint: String,
    buffer_size: usize,
    requests: usize,
    timeout: Option<Duration>,
}

impl Driver {
    pub fn new(config: &Config) -> Self {
        Driver {
            endpoint: config.endpoint(),
            buffer_size: config.buffer_size,
            requests: config.requests,
            timeout: config.timeout,
        }
    }

    /// Run every iteration in order, stopping at the first error.
    pub async fn run(&self) -> Result<RunReport, ProbeError> {
        let largest = payload::max_len(self.requests);
        if largest > self.buffer_size {
            warn!(
                largest_payload = largest,
                buffer_size = self.buffer_size,
                "Payloads exceed the receive buffer; replies will be truncated"
            );
        }

        info!(
            endpoint = %self.endpoint,
            requests = self.requests,
            buffer_size = self.buffer_size,
            timeout = ?self.timeout,
            "Starting echo run"
        );

        let start = Instant::now();
        let mut bytes_echoed = 0u64;

        for index in 0..self.requests {
            bytes_echoed += self.exchange(index).await? as u64;
        }

        let report = RunReport {
            completed: self.requests,
            bytes_echoed,
            elapsed: start.elapsed(),
        };
        info!(
            completed = report.completed,
            bytes = report.bytes_echoed,
            elapsed = ?report.elapsed,
            "Echo run passed"
        );
        Ok(report)
    }

    /// One connect, send, receive, compare, close cycle.
    ///
    /// Returns the number of bytes echoed. The connection is released on
    /// every return path.
    pub async fn exchange(&self, index: usize) -> Result<usize, ProbeError> {
        let expected = payload::for_index(index);
        let mut conn = EchoConnection::new(index, self.timeout);

        conn.connect(&self.endpoint).await?;
        conn.send(&expected).await?;
        let actual = conn.receive(self.buffer_size).await?;
        conn.close();

        if actual != expected {
            return Err(Mismatch {
                index,
                expected,
                actual,
            }
            .into());
        }

        debug!(index, bytes = actual.len(), "Echo matched");
        Ok(actual.len())
    }
}
