//! Errors raised while driving the echo server.
//!
//! A run ends at the first error. `Mismatch` is the test failure proper;
//! every other variant is an execution error that prevented the check.

use bytes::Bytes;
use std::fmt;
use std::io;
use std::time::Duration;

/// Step of an iteration that an I/O failure or timeout happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Write,
    Read,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Write => "write",
            Stage::Read => "read",
        };
        f.write_str(name)
    }
}

/// Reply that differed from the payload sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Iteration the mismatch happened on.
    pub index: usize,
    /// Bytes that were sent.
    pub expected: Bytes,
    /// Bytes that came back.
    pub actual: Bytes,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iteration {}: echo mismatch: expected b\"{}\" ({} bytes), got b\"{}\" ({} bytes)",
            self.index,
            self.expected.escape_ascii(),
            self.expected.len(),
            self.actual.escape_ascii(),
            self.actual.len()
        )
    }
}

/// Failure of a single iteration.
#[derive(Debug)]
pub enum ProbeError {
    /// Endpoint unreachable or refused the connection.
    Connect {
        index: usize,
        endpoint: String,
        source: io::Error,
    },
    /// Writing the payload failed.
    Write { index: usize, source: io::Error },
    /// Reading the reply failed.
    Read { index: usize, source: io::Error },
    /// A configured timeout expired.
    Timeout {
        index: usize,
        stage: Stage,
        after: Duration,
    },
    /// The reply did not match the payload.
    Mismatch(Mismatch),
}

impl ProbeError {
    /// Iteration the error happened on.
    pub fn index(&self) -> usize {
        match self {
            ProbeError::Connect { index, .. }
            | ProbeError::Write { index, .. }
            | ProbeError::Read { index, .. }
            | ProbeError::Timeout { index, .. } => *index,
            ProbeError::Mismatch(m) => m.index,
        }
    }

    /// True for a failed echo check, false for execution errors.
    pub fn is_assertion(&self) -> bool {
        matches!(self, ProbeError::Mismatch(_))
    }

    /// Step of the iteration the error belongs to, if it is an I/O error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ProbeError::Connect { .. } => Some(Stage::Connect),
            ProbeError::Write { .. } => Some(Stage::Write),
            ProbeError::Read { .. } => Some(Stage::Read),
            ProbeError::Timeout { stage, .. } => Some(*stage),
            ProbeError::Mismatch(_) => None,
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Connect {
                index,
                endpoint,
                source,
            } => write!(
                f,
                "iteration {index}: failed to connect to {endpoint}: {source}"
            ),
            ProbeError::Write { index, source } => {
                write!(f, "iteration {index}: failed to write payload: {source}")
            }
            ProbeError::Read { index, source } => {
                write!(f, "iteration {index}: failed to read reply: {source}")
            }
            ProbeError::Timeout {
                index,
                stage,
                after,
            } => write!(f, "iteration {index}: {stage} timed out after {after:?}"),
            ProbeError::Mismatch(m) => fmt::Display::fmt(m, f),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Connect { source, .. }
            | ProbeError::Write { source, .. }
            | ProbeError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<Mismatch> for ProbeError {
    fn from(m: Mismatch) -> Self {
        ProbeError::Mismatch(m)
    }
}
