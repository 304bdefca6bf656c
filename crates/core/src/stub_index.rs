//! Name lookup over the declarations of many buffers, fed from skeletons.

use crate::context::ModelContext;
use crate::error::{Cancelled, ModelError, Result};
use dashmap::DashMap;
use lathe_api::{BufferId, Skeleton, StubId, StubKind};
use lathe_plugin::{SinkError, SkeletonSink};
use rayon::prelude::*;
use smol_str::SmolStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StubLocation {
    pub buffer: BufferId,
    pub stub: StubId,
    pub kind: StubKind,
}

#[derive(Debug, Default)]
pub struct StubIndex {
    names: DashMap<SmolStr, Vec<StubLocation>>,
    by_buffer: DashMap<BufferId, Vec<SmolStr>>,
}

impl StubIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every declaration named `name`, ordered by buffer then position.
    pub fn lookup(&self, name: &str) -> Vec<StubLocation> {
        let mut hits = self
            .names
            .get(name)
            .map(|locations| locations.clone())
            .unwrap_or_default();
        hits.sort_by_key(|l| (l.buffer, l.stub));
        hits
    }

    pub fn contains(&self, buffer: BufferId) -> bool {
        self.by_buffer.contains_key(&buffer)
    }

    pub fn buffer_count(&self) -> usize {
        self.by_buffer.len()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Replaces whatever was indexed for `buffer` with `skeleton`.
    pub fn index(&self, buffer: BufferId, skeleton: &Skeleton) {
        self.remove(buffer);
        let mut names = Vec::new();
        for (stub, node) in skeleton.iter() {
            let Some(name) = node.name() else {
                continue;
            };
            let name = SmolStr::new(name);
            self.names.entry(name.clone()).or_default().push(StubLocation {
                buffer,
                stub,
                kind: node.kind,
            });
            names.push(name);
        }
        self.by_buffer.insert(buffer, names);
    }

    pub fn remove(&self, buffer: BufferId) {
        let Some((_, names)) = self.by_buffer.remove(&buffer) else {
            return;
        };
        for name in names {
            self.names.remove_if_mut(&name, |_, locations| {
                locations.retain(|l| l.buffer != buffer);
                locations.is_empty()
            });
        }
    }

    /// Indexes the committed skeletons of `buffers` in parallel. Each
    /// buffer is read in its own short read action, so writers queue behind
    /// at most one buffer per worker. Stops early when `cancel` fires.
    ///
    /// Must not be called from inside a write action: workers would wait on
    /// the caller forever.
    pub fn populate(&self, ctx: &ModelContext, buffers: &[BufferId], cancel: &CancellationToken) -> Result<usize> {
        ctx.gate().assert_no_write("stub index population");
        let chunk = ctx.config().populate_chunk.max(1);
        let indexed = AtomicUsize::new(0);
        let outcome: std::result::Result<(), Cancelled> = buffers.par_chunks(chunk).try_for_each(|chunk| {
            for &buffer in chunk {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                let skeleton = ctx.read_action(|view| view.skeleton(buffer));
                match skeleton {
                    Ok(skeleton) => {
                        self.index(buffer, &skeleton);
                        indexed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => tracing::debug!("Skipping {} during population: {}", buffer, e),
                }
            }
            Ok(())
        });
        let indexed = indexed.into_inner();
        match outcome {
            Ok(()) => {
                tracing::debug!("Indexed {} of {} buffers", indexed, buffers.len());
                Ok(indexed)
            }
            Err(Cancelled) => {
                tracing::info!("Stub index population cancelled after {} of {} buffers", indexed, buffers.len());
                Err(ModelError::Cancelled)
            }
        }
    }
}

impl SkeletonSink for StubIndex {
    fn accept(&self, buffer: BufferId, skeleton: &Arc<Skeleton>) -> std::result::Result<(), SinkError> {
        self.index(buffer, skeleton);
        Ok(())
    }

    fn retract(&self, buffer: BufferId) {
        self.remove(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_api::{AttrValue, StubNode, attr};

    fn skeleton(class: &str, method: &str) -> Skeleton {
        let mut file = StubNode::new(StubKind::File);
        let mut c = StubNode::new(StubKind::Class).with_attr(attr::NAME, AttrValue::Str(class.into()));
        c.push(StubNode::new(StubKind::Method).with_attr(attr::NAME, AttrValue::Str(method.into())));
        file.push(c);
        Skeleton::source(file)
    }

    #[test]
    fn test_reindexing_replaces_old_names() {
        let index = StubIndex::new();
        let a = BufferId::fresh();
        let b = BufferId::fresh();
        index.index(a, &skeleton("A", "run"));
        index.index(b, &skeleton("B", "run"));
        assert_eq!(index.lookup("run").len(), 2);

        index.index(a, &skeleton("A", "stop"));
        let run = index.lookup("run");
        assert_eq!(run.len(), 1);
        assert_eq!(run[0].buffer, b);
        assert_eq!(index.lookup("stop")[0].kind, StubKind::Method);
        assert_eq!(index.lookup("stop")[0].stub, StubId(2));

        index.retract(b);
        assert!(index.lookup("B").is_empty());
        assert!(index.lookup("run").is_empty());
        assert_eq!(index.buffer_count(), 1);
    }
}
