//! The model as one explicit object: buffers, trees, skeletons, counters
//! and the gate that orders access to them. Independent contexts share
//! nothing, even when they track the same buffer.

use crate::buffer::{BufferEdit, TextBuffer};
use crate::commit::{CommitCoordinator, CommitReport, CommitState};
use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::gate::ConcurrencyGate;
use crate::mirror::{Mirror, MirrorCache};
use crate::skeleton::ModelNode;
use crate::tracker::ModificationTracker;
use crate::tree::TreeNode;
use lathe_api::{BufferId, Skeleton, TextRange, TextSize};
use lathe_plugin::{InnerClassSource, LanguageFrontend, SkeletonSink};
use std::sync::Arc;

#[derive(Default)]
pub struct ModelContextBuilder {
    config: Option<ModelConfig>,
    frontend: Option<Arc<dyn LanguageFrontend>>,
    sinks: Vec<Arc<dyn SkeletonSink>>,
    mirrors: Option<Arc<MirrorCache>>,
}

impl ModelContextBuilder {
    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn frontend(mut self, frontend: Arc<dyn LanguageFrontend>) -> Self {
        self.frontend = Some(frontend);
        self
    }

    /// Receives every skeleton that changes shape.
    pub fn sink(mut self, sink: Arc<dyn SkeletonSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Shares a mirror cache between contexts.
    pub fn mirror_cache(mut self, cache: Arc<MirrorCache>) -> Self {
        self.mirrors = Some(cache);
        self
    }

    pub fn build(self) -> Result<ModelContext> {
        let Some(frontend) = self.frontend else {
            return Err(ModelError::Unsupported("a model context needs a language front end".into()));
        };
        let config = self.config.unwrap_or_default();
        let mirrors = match self.mirrors {
            Some(cache) => cache,
            None => Arc::new(match &config.mirror_cache_dir {
                Some(dir) => MirrorCache::persistent(dir),
                None => MirrorCache::in_memory(),
            }),
        };
        let gate = ConcurrencyGate::new();
        let tracker = Arc::new(ModificationTracker::new());
        let coordinator = CommitCoordinator::new(
            frontend.clone(),
            config.clone(),
            gate.clone(),
            tracker.clone(),
            self.sinks,
        );
        tracing::debug!("Model context for {} ready", frontend.info().name);
        Ok(ModelContext {
            config,
            frontend,
            gate,
            tracker,
            coordinator,
            mirrors,
        })
    }
}

pub struct ModelContext {
    config: ModelConfig,
    frontend: Arc<dyn LanguageFrontend>,
    gate: ConcurrencyGate,
    tracker: Arc<ModificationTracker>,
    coordinator: CommitCoordinator,
    mirrors: Arc<MirrorCache>,
}

impl std::fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelContext")
            .field("frontend", &self.frontend.info().name)
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

/// Read-only access, valid for the duration of a read action.
#[derive(Clone, Copy)]
pub struct ReadView<'a> {
    ctx: &'a ModelContext,
}

/// Mutating access, valid for the duration of a write action.
#[derive(Clone, Copy)]
pub struct WriteTx<'a> {
    ctx: &'a ModelContext,
}

impl ModelContext {
    pub fn builder() -> ModelContextBuilder {
        ModelContextBuilder::default()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn frontend(&self) -> &Arc<dyn LanguageFrontend> {
        &self.frontend
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn mirror_cache(&self) -> &Arc<MirrorCache> {
        &self.mirrors
    }

    /// Runs `f` inside a read epoch. Nests inside reads and writes.
    pub fn read_action<R>(&self, f: impl FnOnce(ReadView<'_>) -> R) -> R {
        let _guard = self.gate.read();
        f(ReadView { ctx: self })
    }

    /// Runs `f` inside the write epoch. Queued actions whose buffers are all
    /// committed run once the outermost write ends.
    pub fn write_action<R>(&self, f: impl FnOnce(WriteTx<'_>) -> R) -> R {
        let guard = self.gate.write();
        let outermost = guard.is_outermost();
        let result = f(WriteTx { ctx: self });
        drop(guard);
        if outermost && !self.gate.is_read_held() {
            self.coordinator.run_pending_callbacks();
        }
        result
    }

    pub fn attach(&self, buffer: &Arc<TextBuffer>) -> Result<()> {
        self.write_action(|tx| tx.attach(buffer))
    }

    pub fn detach(&self, buffer: BufferId) -> Result<()> {
        self.write_action(|tx| tx.detach(buffer))
    }

    /// Changes buffer text. Trees and skeletons catch up on commit.
    pub fn edit(&self, buffer: BufferId, range: TextRange, text: &str) -> Result<BufferEdit> {
        self.write_action(|tx| tx.edit(buffer, range, text))
    }

    pub fn commit(&self, buffer: BufferId) -> Result<CommitReport> {
        self.write_action(|tx| tx.commit(buffer))
    }

    pub fn commit_all(&self) -> Result<Vec<(BufferId, CommitReport)>> {
        self.write_action(|tx| tx.commit_all())
    }

    /// Runs `action` once no buffer of this context is uncommitted; right
    /// away when that already holds outside a write action.
    pub fn perform_when_all_committed(&self, action: impl FnOnce() + Send + 'static) {
        self.coordinator.perform_when_all_committed(action);
        self.flush_if_idle();
    }

    /// Like [`perform_when_all_committed`](Self::perform_when_all_committed),
    /// dropping an action still pending under the same `tag`.
    pub fn cancel_and_run_when_all_committed(&self, tag: &str, action: impl FnOnce() + Send + 'static) {
        self.coordinator.cancel_and_run_when_all_committed(tag, action);
        self.flush_if_idle();
    }

    fn flush_if_idle(&self) {
        if !self.gate.is_write_held() && !self.gate.is_read_held() && !self.coordinator.has_uncommitted() {
            self.coordinator.run_pending_callbacks();
        }
    }

    pub fn pending_actions(&self) -> usize {
        self.coordinator.pending_callbacks()
    }

    pub fn commit_state(&self, buffer: BufferId) -> Result<CommitState> {
        self.coordinator.state(buffer)
    }

    pub fn uncommitted(&self) -> Vec<BufferId> {
        self.coordinator.uncommitted()
    }

    pub fn attached(&self) -> Vec<BufferId> {
        self.coordinator.attached()
    }

    /// Current stamp of the buffer's text.
    pub fn modification_stamp(&self, buffer: BufferId) -> Result<u64> {
        Ok(self.coordinator.buffer(buffer)?.stamp())
    }

    /// Moves only when some skeleton of this context changed shape.
    pub fn structural_modification_stamp(&self) -> u64 {
        self.tracker.structural()
    }

    /// Moves on every commit that changed text.
    pub fn any_modification_stamp(&self) -> u64 {
        self.tracker.any()
    }

    pub fn skeleton(&self, buffer: BufferId) -> Result<Arc<Skeleton>> {
        self.read_action(|view| view.skeleton(buffer))
    }

    pub fn get_or_materialize(&self, buffer: BufferId, offset: TextSize) -> Result<Option<TreeNode>> {
        self.read_action(|view| view.get_or_materialize(buffer, offset))
    }

    pub fn find_decl_at(&self, buffer: BufferId, offset: TextSize) -> Result<Option<ModelNode>> {
        self.read_action(|view| view.find_decl_at(buffer, offset))
    }

    /// Mirror of a compiled class, served from the cache when the decoded
    /// unit was seen before.
    pub fn decompile(&self, bytes: &[u8], inners: &dyn InnerClassSource) -> Result<Arc<Mirror>> {
        Mirror::decompile(&self.frontend, bytes, inners, Some(&self.mirrors)).map(Arc::new)
    }
}

impl<'a> ReadView<'a> {
    pub fn context(&self) -> &'a ModelContext {
        self.ctx
    }

    /// A writer is waiting; long work should return soon.
    pub fn should_yield(&self) -> bool {
        self.ctx.gate.writer_waiting()
    }

    pub fn skeleton(&self, buffer: BufferId) -> Result<Arc<Skeleton>> {
        self.ctx.coordinator.skeleton(buffer)
    }

    /// Committed text, as the tree sees it.
    pub fn committed_text(&self, buffer: BufferId) -> Result<Arc<str>> {
        self.ctx.coordinator.committed_text(buffer)
    }

    pub fn tree_text(&self, buffer: BufferId) -> Result<String> {
        self.ctx.coordinator.with_tree(buffer, |tree| tree.text())
    }

    pub fn commit_state(&self, buffer: BufferId) -> Result<CommitState> {
        self.ctx.coordinator.state(buffer)
    }

    /// Deepest tree node at `offset`, parsing bodies along the way.
    pub fn get_or_materialize(&self, buffer: BufferId, offset: TextSize) -> Result<Option<TreeNode>> {
        self.ctx
            .coordinator
            .with_tree(buffer, |tree| tree.find_node_at(offset))
    }

    /// Declaration covering `offset`, without parsing bodies.
    pub fn find_decl_at(&self, buffer: BufferId, offset: TextSize) -> Result<Option<ModelNode>> {
        self.ctx.coordinator.with_index(buffer, |index, _| {
            index.find_node_at(offset).and_then(|(stub, node)| {
                Some(ModelNode::Source {
                    buffer,
                    stub,
                    kind: index.kind(stub)?,
                    node,
                })
            })
        })
    }

    /// Tree node a stub of the current skeleton index came from.
    pub fn resolve(&self, buffer: BufferId, stub: lathe_api::StubId) -> Result<Option<TreeNode>> {
        self.ctx
            .coordinator
            .with_index(buffer, |index, _| index.resolve(stub))
    }

    /// Runs `f` over the committed tree.
    pub fn with_tree<R>(&self, buffer: BufferId, f: impl FnOnce(&crate::tree::LazyTree) -> R) -> Result<R> {
        self.ctx.coordinator.with_tree(buffer, f)
    }
}

impl<'a> WriteTx<'a> {
    pub fn read(&self) -> ReadView<'a> {
        ReadView { ctx: self.ctx }
    }

    pub fn attach(&self, buffer: &Arc<TextBuffer>) -> Result<()> {
        self.ctx.coordinator.attach(buffer)
    }

    pub fn detach(&self, buffer: BufferId) -> Result<()> {
        self.ctx.coordinator.detach(buffer)
    }

    pub fn edit(&self, buffer: BufferId, range: TextRange, text: &str) -> Result<BufferEdit> {
        self.ctx.coordinator.buffer(buffer)?.replace(range, text)
    }

    pub fn commit(&self, buffer: BufferId) -> Result<CommitReport> {
        self.ctx.coordinator.commit(buffer)
    }

    pub fn commit_all(&self) -> Result<Vec<(BufferId, CommitReport)>> {
        self.ctx.coordinator.commit_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_java::java_frontend;

    fn context() -> ModelContext {
        ModelContext::builder()
            .config(ModelConfig::default().strict(true).cross_check(true))
            .frontend(java_frontend())
            .build()
            .expect("context")
    }

    #[test]
    fn test_builder_needs_a_frontend() {
        assert!(matches!(
            ModelContext::builder().build(),
            Err(ModelError::Unsupported(_))
        ));
    }

    #[test]
    fn test_read_inside_write_sees_committed_state() {
        let ctx = context();
        let buffer = TextBuffer::new("class C {}");
        ctx.attach(&buffer).expect("attach");
        ctx.write_action(|tx| {
            tx.edit(buffer.id(), TextRange::empty(9.into()), "void m() {}").expect("edit");
            assert_eq!(&*tx.read().committed_text(buffer.id()).expect("text"), "class C {}");
            tx.commit(buffer.id()).expect("commit");
            assert_eq!(
                tx.read().tree_text(buffer.id()).expect("tree"),
                "class C {void m() {}}"
            );
        });
    }

    #[test]
    fn test_actions_run_immediately_when_idle() {
        let ctx = context();
        let (tx, rx) = std::sync::mpsc::channel();
        ctx.perform_when_all_committed(move || {
            tx.send(()).ok();
        });
        assert!(rx.try_recv().is_ok());
        assert_eq!(ctx.pending_actions(), 0);
    }

    #[test]
    #[should_panic(expected = "write action requested inside a read action")]
    fn test_write_inside_read_is_fatal() {
        let ctx = context();
        let buffer = TextBuffer::new("class C {}");
        ctx.read_action(|_| {
            let _ = ctx.attach(&buffer);
        });
    }
}
