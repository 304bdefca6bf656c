use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of one cached mirror entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMirrorSummary {
    pub key: String,
    pub class_name: String,
    pub size_bytes: u64,
    pub stub_count: usize,
    pub version: u32,
    pub created_at: u64,
}

/// Statistics for the mirror cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_stubs: usize,
    pub cache_dir: Option<PathBuf>,
}
