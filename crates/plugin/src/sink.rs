use lathe_api::{BufferId, Skeleton};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Skeleton rejected: {0}")]
    Rejected(String),
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Receives skeletons whenever a buffer's declaration shape changes.
pub trait SkeletonSink: Send + Sync {
    fn accept(&self, buffer: BufferId, skeleton: &Arc<Skeleton>) -> Result<(), SinkError>;

    /// The buffer is gone; forget what was accepted for it.
    fn retract(&self, _buffer: BufferId) {}
}
