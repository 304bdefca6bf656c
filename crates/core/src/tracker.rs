use std::sync::atomic::{AtomicU64, Ordering};

/// Counters consumers compare to decide whether cached results are stale.
/// `structural` moves only when some skeleton changed shape; `any` moves on
/// every commit that changed text.
#[derive(Debug, Default)]
pub struct ModificationTracker {
    structural: AtomicU64,
    any: AtomicU64,
}

impl ModificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn structural(&self) -> u64 {
        self.structural.load(Ordering::Acquire)
    }

    pub fn any(&self) -> u64 {
        self.any.load(Ordering::Acquire)
    }

    /// A structural change is also a change.
    pub(crate) fn bump_structural(&self) -> u64 {
        self.any.fetch_add(1, Ordering::AcqRel);
        self.structural.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn bump_any(&self) -> u64 {
        self.any.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let tracker = ModificationTracker::new();
        tracker.bump_any();
        tracker.bump_any();
        assert_eq!((tracker.structural(), tracker.any()), (0, 2));
        assert_eq!(tracker.bump_structural(), 1);
        assert_eq!((tracker.structural(), tracker.any()), (1, 3));
    }
}
