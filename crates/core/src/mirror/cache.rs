//! Decompiled mirrors, reused across contexts and optionally persisted.
//!
//! Entries are keyed by a hash of the decoded unit, so a class rebuilt to
//! the same structure hits the same entry.

use crate::error::Result;
use dashmap::DashMap;
use lathe_api::{BinaryUnit, CacheStats, CachedMirrorSummary, Skeleton};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use xxhash_rust::xxh3::xxh3_64;

const CACHE_VERSION: u32 = 1;
const EXTENSION: &str = "mirror";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMirror {
    pub class_name: String,
    pub skeleton: Arc<Skeleton>,
    pub text: Arc<str>,
}

/// On-disk form of one entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct MirrorCacheFile {
    pub version: u32,
    pub key: u64,
    pub class_name: String,
    pub created_at: u64,
    pub skeleton: Skeleton,
    pub text: String,
}

impl MirrorCacheFile {
    fn new(key: u64, mirror: &CachedMirror) -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            version: CACHE_VERSION,
            key,
            class_name: mirror.class_name.clone(),
            created_at: now,
            skeleton: (*mirror.skeleton).clone(),
            text: mirror.text.to_string(),
        }
    }

    fn into_mirror(self) -> CachedMirror {
        CachedMirror {
            class_name: self.class_name,
            skeleton: Arc::new(self.skeleton),
            text: Arc::from(self.text),
        }
    }
}

#[derive(Debug, Default)]
pub struct MirrorCache {
    dir: Option<PathBuf>,
    memory: DashMap<u64, Arc<CachedMirror>>,
}

impl MirrorCache {
    /// Memory only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Memory backed by `{key}.mirror` files under `dir`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Cannot create mirror cache at {}: {}", dir.display(), e);
        }
        Self {
            dir: Some(dir),
            memory: DashMap::new(),
        }
    }

    pub fn default_location() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lathe")
            .join("mirrors")
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn key_of(unit: &BinaryUnit) -> Result<u64> {
        let bytes = rmp_serde::to_vec(unit)?;
        Ok(xxh3_64(&bytes))
    }

    fn path_of(dir: &Path, key: u64) -> PathBuf {
        dir.join(format!("{key:016x}.{EXTENSION}"))
    }

    pub fn get(&self, key: u64) -> Option<Arc<CachedMirror>> {
        if let Some(hit) = self.memory.get(&key) {
            tracing::debug!("Mirror cache hit for {} ({:016x})", hit.class_name, key);
            return Some(hit.clone());
        }
        let dir = self.dir.as_ref()?;
        let bytes = fs::read(Self::path_of(dir, key)).ok()?;
        let file = match rmp_serde::from_slice::<MirrorCacheFile>(&bytes) {
            Ok(file) if file.version == CACHE_VERSION && file.key == key => file,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!("Discarding unreadable mirror cache entry {:016x}: {}", key, e);
                return None;
            }
        };
        let mirror = Arc::new(file.into_mirror());
        tracing::debug!("Mirror cache hit on disk for {} ({:016x})", mirror.class_name, key);
        self.memory.insert(key, mirror.clone());
        Some(mirror)
    }

    /// Stores an entry. Failing to persist only costs a later re-decompile.
    pub fn put(&self, key: u64, mirror: Arc<CachedMirror>) {
        if let Some(dir) = &self.dir {
            let file = MirrorCacheFile::new(key, &mirror);
            let written = rmp_serde::to_vec(&file)
                .map_err(|e| e.to_string())
                .and_then(|bytes| fs::write(Self::path_of(dir, key), bytes).map_err(|e| e.to_string()));
            if let Err(e) = written {
                tracing::warn!("Failed to persist mirror of {}: {}", mirror.class_name, e);
            }
        }
        self.memory.insert(key, mirror);
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Entries on disk, or in memory for a memory-only cache.
    pub fn scan(&self) -> Vec<CachedMirrorSummary> {
        let Some(dir) = &self.dir else {
            let mut summaries: Vec<_> = self
                .memory
                .iter()
                .map(|entry| CachedMirrorSummary {
                    key: format!("{:016x}", entry.key()),
                    class_name: entry.class_name.clone(),
                    size_bytes: entry.text.len() as u64,
                    stub_count: entry.skeleton.len(),
                    version: CACHE_VERSION,
                    created_at: 0,
                })
                .collect();
            summaries.sort_by(|a, b| a.key.cmp(&b.key));
            return summaries;
        };
        let mut summaries = Vec::new();
        let Ok(entries) = fs::read_dir(dir) else {
            return summaries;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            if let Ok(file) = rmp_serde::from_slice::<MirrorCacheFile>(&bytes) {
                summaries.push(CachedMirrorSummary {
                    key: format!("{:016x}", file.key),
                    class_name: file.class_name,
                    size_bytes: bytes.len() as u64,
                    stub_count: file.skeleton.len(),
                    version: file.version,
                    created_at: file.created_at,
                });
            }
        }
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        summaries
    }

    /// First entry whose key starts with `prefix`.
    pub fn inspect(&self, prefix: &str) -> Option<Arc<CachedMirror>> {
        let summary = self.scan().into_iter().find(|s| s.key.starts_with(prefix))?;
        let key = u64::from_str_radix(&summary.key, 16).ok()?;
        self.get(key)
    }

    pub fn stats(&self) -> CacheStats {
        let summaries = self.scan();
        CacheStats {
            total_entries: summaries.len(),
            total_stubs: summaries.iter().map(|s| s.stub_count).sum(),
            cache_dir: self.dir.clone(),
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.memory.clear();
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == EXTENSION) {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_api::{StubKind, StubNode};

    fn entry(name: &str) -> Arc<CachedMirror> {
        let mut file = StubNode::new(StubKind::File);
        file.push(StubNode::new(StubKind::Class));
        Arc::new(CachedMirror {
            class_name: name.to_string(),
            skeleton: Arc::new(Skeleton::binary(file)),
            text: Arc::from(format!("class {name} {{}}\n")),
        })
    }

    #[test]
    fn test_persisted_entries_survive_a_new_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = MirrorCache::persistent(dir.path());
        cache.put(0xabc, entry("p.A"));
        assert_eq!(cache.len(), 1);

        let reopened = MirrorCache::persistent(dir.path());
        assert!(reopened.is_empty());
        let hit = reopened.get(0xabc).expect("on disk");
        assert_eq!(hit.class_name, "p.A");
        assert_eq!(&*hit.text, "class p.A {}\n");

        let stats = reopened.stats();
        assert_eq!((stats.total_entries, stats.total_stubs), (1, 2));
        assert!(reopened.inspect("0000000000000a").is_some());

        reopened.clear().expect("clear");
        assert!(reopened.scan().is_empty());
        assert!(reopened.get(0xabc).is_none());
    }

    #[test]
    fn test_memory_cache_scan() {
        let cache = MirrorCache::in_memory();
        cache.put(2, entry("B"));
        cache.put(1, entry("A"));
        let names: Vec<_> = cache.scan().into_iter().map(|s| s.class_name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(cache.stats().cache_dir.is_none());
    }
}
