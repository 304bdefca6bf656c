use lathe_api::{BufferId, FormatError};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown buffer: {0}")]
    UnknownBuffer(BufferId),
    #[error("Buffer {0} was detached")]
    Detached(BufferId),
    #[error("Read-only: {0}")]
    ReadOnly(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Invalid range {start}..{end} for text of length {len}")]
    InvalidRange { start: u32, end: u32, len: u32 },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rmp_serde::encode::Error> for ModelError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for ModelError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Cooperative stop request seen by background read work. Not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cancelled")
    }
}

impl From<Cancelled> for ModelError {
    fn from(_: Cancelled) -> Self {
        ModelError::Cancelled
    }
}

/// A broken internal invariant. Continuing would hand wrong structure to
/// every consumer, so it is never returned as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyViolation {
    pub context: &'static str,
    pub detail: String,
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consistency violation in {}: {}", self.context, self.detail)
    }
}

#[cold]
#[track_caller]
pub fn violation(context: &'static str, detail: impl Into<String>) -> ! {
    let violation = ConsistencyViolation {
        context,
        detail: detail.into(),
    };
    tracing::error!("{}", violation);
    panic!("{violation}");
}
