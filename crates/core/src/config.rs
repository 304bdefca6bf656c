use std::path::PathBuf;

/// Knobs of a [`ModelContext`](crate::context::ModelContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Check tree invariants after every materialize and edit.
    pub strict_consistency: bool,
    /// Compare derived skeletons of error-free trees with the fast scan.
    pub cross_check_skeletons: bool,
    /// Buffers handed to one worker at a time during index population.
    pub populate_chunk: usize,
    /// Where decompiled mirrors are persisted; memory only when `None`.
    pub mirror_cache_dir: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strict_consistency: cfg!(debug_assertions),
            cross_check_skeletons: cfg!(debug_assertions),
            populate_chunk: 16,
            mirror_cache_dir: None,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!("Ignoring {}={:?}: expected a boolean", name, other);
            None
        }
    }
}

impl ModelConfig {
    /// Defaults overridden by `LATHE_STRICT`, `LATHE_CROSS_CHECK`,
    /// `LATHE_POPULATE_CHUNK` and `LATHE_MIRROR_CACHE_DIR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(strict) = env_flag("LATHE_STRICT") {
            config.strict_consistency = strict;
        }
        if let Some(cross_check) = env_flag("LATHE_CROSS_CHECK") {
            config.cross_check_skeletons = cross_check;
        }
        if let Ok(chunk) = std::env::var("LATHE_POPULATE_CHUNK") {
            match chunk.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.populate_chunk = n,
                _ => tracing::warn!("Ignoring LATHE_POPULATE_CHUNK={:?}", chunk),
            }
        }
        if let Ok(dir) = std::env::var("LATHE_MIRROR_CACHE_DIR") {
            if !dir.trim().is_empty() {
                config.mirror_cache_dir = Some(PathBuf::from(dir));
            }
        }
        config
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_consistency = strict;
        self
    }

    pub fn cross_check(mut self, cross_check: bool) -> Self {
        self.cross_check_skeletons = cross_check;
        self
    }

    pub fn mirror_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mirror_cache_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_style_overrides() {
        let config = ModelConfig::default()
            .strict(true)
            .cross_check(false)
            .mirror_cache_dir("/tmp/mirrors");
        assert!(config.strict_consistency);
        assert!(!config.cross_check_skeletons);
        assert_eq!(config.populate_chunk, 16);
        assert_eq!(config.mirror_cache_dir, Some(PathBuf::from("/tmp/mirrors")));
    }
}
