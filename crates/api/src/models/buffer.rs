use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a text buffer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

static NEXT_BUFFER: AtomicU64 = AtomicU64::new(1);

impl BufferId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate an identity that no live buffer in this process uses.
    pub fn fresh() -> Self {
        Self(NEXT_BUFFER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Where a skeleton came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Source,
    Binary,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Source => f.write_str("source"),
            Provenance::Binary => f.write_str("binary"),
        }
    }
}
