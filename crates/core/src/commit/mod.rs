//! Reconciles buffer text with trees and skeletons.
//!
//! Edits only land in a per-document journal. `commit` replays the journal
//! into the tree, derives the new skeleton and moves the counters: the
//! structural one only when the skeleton changed shape. Work queued with
//! [`CommitCoordinator::perform_when_all_committed`] runs once no attached
//! buffer has pending edits.

mod pending;

pub use pending::{PendingChanges, Segment};

use crate::buffer::{BufferEdit, BufferListener, TextBuffer};
use crate::config::ModelConfig;
use crate::error::{ModelError, Result, violation};
use crate::gate::ConcurrencyGate;
use crate::skeleton::SkeletonIndex;
use crate::tracker::ModificationTracker;
use crate::tree::LazyTree;
use indexmap::{IndexMap, IndexSet};
use lathe_api::{BufferId, Provenance, Skeleton};
use lathe_plugin::{LanguageFrontend, SkeletonSink};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Committed,
    Uncommitted,
    Committing,
}

/// What one commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitReport {
    pub text_changed: bool,
    pub structural_changed: bool,
    /// Segments replayed into the tree.
    pub reparses: usize,
    /// The previous skeleton was kept without deriving a new one.
    pub skeleton_reused: bool,
}

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Callbacks {
    plain: Vec<Callback>,
    tagged: IndexMap<String, Callback>,
}

impl Callbacks {
    fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.tagged.is_empty()
    }
}

/// Buffer listener of one document. Owned by the document, so it goes away
/// with it.
struct Journal {
    pending: Mutex<PendingChanges>,
    uncommitted: Arc<Mutex<IndexSet<BufferId>>>,
}

impl BufferListener for Journal {
    fn buffer_changed(&self, edit: &BufferEdit) {
        if self.pending.lock().record(edit) {
            self.uncommitted.lock().insert(edit.buffer);
        }
    }
}

struct Document {
    buffer: Arc<TextBuffer>,
    journal: Arc<Journal>,
    committing: bool,
    committed_text: Arc<str>,
    committed_stamp: u64,
    skeleton: Arc<Skeleton>,
    tree: OnceLock<LazyTree>,
    index: OnceLock<SkeletonIndex>,
}

pub struct CommitCoordinator {
    frontend: Arc<dyn LanguageFrontend>,
    config: ModelConfig,
    gate: ConcurrencyGate,
    tracker: Arc<ModificationTracker>,
    sinks: Vec<Arc<dyn SkeletonSink>>,
    documents: RwLock<HashMap<BufferId, Document>>,
    detached: Mutex<HashSet<BufferId>>,
    uncommitted: Arc<Mutex<IndexSet<BufferId>>>,
    callbacks: Mutex<Callbacks>,
}

impl std::fmt::Debug for CommitCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitCoordinator")
            .field("documents", &self.documents.read().len())
            .field("uncommitted", &self.uncommitted.lock().len())
            .finish()
    }
}

impl CommitCoordinator {
    pub fn new(
        frontend: Arc<dyn LanguageFrontend>,
        config: ModelConfig,
        gate: ConcurrencyGate,
        tracker: Arc<ModificationTracker>,
        sinks: Vec<Arc<dyn SkeletonSink>>,
    ) -> Self {
        Self {
            frontend,
            config,
            gate,
            tracker,
            sinks,
            documents: RwLock::new(HashMap::new()),
            detached: Mutex::new(HashSet::new()),
            uncommitted: Arc::new(Mutex::new(IndexSet::new())),
            callbacks: Mutex::new(Callbacks::default()),
        }
    }

    fn missing(&self, id: BufferId) -> ModelError {
        if self.detached.lock().contains(&id) {
            ModelError::Detached(id)
        } else {
            ModelError::UnknownBuffer(id)
        }
    }

    fn publish(&self, id: BufferId, skeleton: &Arc<Skeleton>) {
        for sink in &self.sinks {
            if let Err(e) = sink.accept(id, skeleton) {
                tracing::warn!("Skeleton sink rejected {}: {}", id, e);
            }
        }
    }

    /// Starts tracking `buffer` with a fresh journal, tree and skeleton.
    /// Attaching an attached buffer does nothing.
    pub fn attach(&self, buffer: &Arc<TextBuffer>) -> Result<()> {
        self.gate.assert_write_access("attach");
        let id = buffer.id();
        if self.documents.read().contains_key(&id) {
            return Ok(());
        }
        let journal = Arc::new(Journal {
            pending: Mutex::new(PendingChanges::new(0)),
            uncommitted: self.uncommitted.clone(),
        });
        let weak: Weak<dyn BufferListener> = Arc::downgrade(&journal) as Weak<dyn BufferListener>;
        buffer.add_listener(weak);
        let (text, stamp) = {
            let mut pending = journal.pending.lock();
            let snapshot = buffer.snapshot();
            pending.take(snapshot.1);
            self.uncommitted.lock().shift_remove(&id);
            snapshot
        };
        let skeleton = Arc::new(Skeleton::source(self.frontend.build_skeleton(&text)));
        self.documents.write().insert(
            id,
            Document {
                buffer: buffer.clone(),
                journal,
                committing: false,
                committed_text: text,
                committed_stamp: stamp,
                skeleton: skeleton.clone(),
                tree: OnceLock::new(),
                index: OnceLock::new(),
            },
        );
        self.detached.lock().remove(&id);
        self.tracker.bump_structural();
        tracing::debug!("Attached {} at stamp {}", id, stamp);
        self.publish(id, &skeleton);
        Ok(())
    }

    /// Releases everything held for `id`. Later commits of the same id fail
    /// until it is attached again.
    pub fn detach(&self, id: BufferId) -> Result<()> {
        self.gate.assert_write_access("detach");
        let Some(document) = self.documents.write().remove(&id) else {
            return Err(self.missing(id));
        };
        drop(document);
        self.uncommitted.lock().shift_remove(&id);
        self.detached.lock().insert(id);
        for sink in &self.sinks {
            sink.retract(id);
        }
        tracing::debug!("Detached {}", id);
        Ok(())
    }

    pub fn is_attached(&self, id: BufferId) -> bool {
        self.documents.read().contains_key(&id)
    }

    pub fn attached(&self) -> Vec<BufferId> {
        let mut ids: Vec<_> = self.documents.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn uncommitted(&self) -> Vec<BufferId> {
        self.uncommitted.lock().iter().copied().collect()
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted.lock().is_empty()
    }

    pub fn state(&self, id: BufferId) -> Result<CommitState> {
        let documents = self.documents.read();
        let document = documents.get(&id).ok_or_else(|| self.missing(id))?;
        Ok(if document.committing {
            CommitState::Committing
        } else if self.uncommitted.lock().contains(&id) {
            CommitState::Uncommitted
        } else {
            CommitState::Committed
        })
    }

    pub fn buffer(&self, id: BufferId) -> Result<Arc<TextBuffer>> {
        let documents = self.documents.read();
        documents
            .get(&id)
            .map(|d| d.buffer.clone())
            .ok_or_else(|| self.missing(id))
    }

    /// Skeleton of the committed text.
    pub fn skeleton(&self, id: BufferId) -> Result<Arc<Skeleton>> {
        let documents = self.documents.read();
        documents
            .get(&id)
            .map(|d| d.skeleton.clone())
            .ok_or_else(|| self.missing(id))
    }

    pub fn committed_text(&self, id: BufferId) -> Result<Arc<str>> {
        let documents = self.documents.read();
        documents
            .get(&id)
            .map(|d| d.committed_text.clone())
            .ok_or_else(|| self.missing(id))
    }

    /// Buffer stamp the committed state reflects.
    pub fn committed_stamp(&self, id: BufferId) -> Result<u64> {
        let documents = self.documents.read();
        documents
            .get(&id)
            .map(|d| d.committed_stamp)
            .ok_or_else(|| self.missing(id))
    }

    fn new_tree(&self, text: &str) -> LazyTree {
        LazyTree::parse(self.frontend.clone(), text)
            .guarded_by(self.gate.clone())
            .strict(self.config.strict_consistency)
    }

    /// Runs `f` over the committed tree, building it on first use.
    pub fn with_tree<R>(&self, id: BufferId, f: impl FnOnce(&LazyTree) -> R) -> Result<R> {
        self.gate.assert_read_access("tree access");
        let documents = self.documents.read();
        let document = documents.get(&id).ok_or_else(|| self.missing(id))?;
        let tree = document.tree.get_or_init(|| self.new_tree(&document.committed_text));
        Ok(f(tree))
    }

    /// Runs `f` over the declaration index of the committed tree.
    pub fn with_index<R>(&self, id: BufferId, f: impl FnOnce(&SkeletonIndex, &LazyTree) -> R) -> Result<R> {
        self.gate.assert_read_access("index access");
        let documents = self.documents.read();
        let document = documents.get(&id).ok_or_else(|| self.missing(id))?;
        let tree = document.tree.get_or_init(|| self.new_tree(&document.committed_text));
        let index = document
            .index
            .get_or_init(|| SkeletonIndex::new(tree, Provenance::Source));
        Ok(f(index, tree))
    }

    /// Replays the pending edits of `id` into its tree and skeleton.
    pub fn commit(&self, id: BufferId) -> Result<CommitReport> {
        self.gate.assert_write_access("commit");
        let mut documents = self.documents.write();
        let Some(document) = documents.get_mut(&id) else {
            return Err(self.missing(id));
        };
        document.committing = true;

        let (segments, text, stamp) = {
            let mut pending = document.journal.pending.lock();
            let (text, stamp) = document.buffer.snapshot();
            let segments = match pending.take(stamp) {
                Some(segments) => segments,
                None => Segment::diff(&document.committed_text, &text).into_iter().collect(),
            };
            (segments, text, stamp)
        };
        let mut report = CommitReport {
            text_changed: *document.committed_text != *text,
            ..CommitReport::default()
        };

        let mut body_only = true;
        if let Some(tree) = document.tree.get_mut() {
            for segment in segments.iter().rev() {
                let replacement = &text[usize::from(segment.new.start())..usize::from(segment.new.end())];
                let outcome = match tree.apply_edit(segment.old, replacement) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        document.committing = false;
                        return Err(e);
                    }
                };
                body_only &= outcome.is_body_only();
                report.reparses += 1;
            }
            if self.config.strict_consistency && tree.text() != *text {
                violation("commit", format!("tree text diverged from {id} at stamp {stamp}"));
            }
        } else {
            body_only = false;
        }

        let skeleton = if !report.text_changed || (body_only && report.reparses > 0) {
            report.skeleton_reused = true;
            document.skeleton.clone()
        } else {
            match document.tree.get() {
                Some(tree) => {
                    let derived = self.frontend.derive_skeleton(tree.green_root());
                    if self.config.cross_check_skeletons && !tree.has_declaration_errors() {
                        let fast = self.frontend.build_skeleton(&text);
                        if fast != derived {
                            violation(
                                "commit",
                                format!("fast and derived skeletons of {id} differ:\n{fast}\n--\n{derived}"),
                            );
                        }
                    }
                    Arc::new(Skeleton::source(derived))
                }
                None => Arc::new(Skeleton::source(self.frontend.build_skeleton(&text))),
            }
        };

        report.structural_changed = skeleton.root != document.skeleton.root;
        if report.structural_changed {
            self.tracker.bump_structural();
        } else if report.text_changed {
            self.tracker.bump_any();
        }

        document.committed_text = text;
        document.committed_stamp = stamp;
        document.skeleton = skeleton.clone();
        if report.text_changed {
            document.index = OnceLock::new();
        }
        document.committing = false;
        {
            // Under the journal lock so an edit racing in cannot lose its mark.
            let pending = document.journal.pending.lock();
            if pending.is_empty() && document.buffer.stamp() == stamp {
                self.uncommitted.lock().shift_remove(&id);
            }
        }
        drop(documents);

        tracing::debug!(
            "Committed {} at stamp {}: {} reparses, structural={}",
            id,
            stamp,
            report.reparses,
            report.structural_changed
        );
        if report.structural_changed {
            self.publish(id, &skeleton);
        }
        Ok(report)
    }

    /// Commits every buffer with pending edits, in the order they were
    /// first edited.
    pub fn commit_all(&self) -> Result<Vec<(BufferId, CommitReport)>> {
        self.gate.assert_write_access("commit");
        let mut reports = Vec::new();
        for id in self.uncommitted() {
            if self.is_attached(id) {
                reports.push((id, self.commit(id)?));
            } else {
                self.uncommitted.lock().shift_remove(&id);
            }
        }
        Ok(reports)
    }

    /// Queues `action` until no buffer is uncommitted. Registering the same
    /// work twice runs it twice.
    pub fn perform_when_all_committed(&self, action: impl FnOnce() + Send + 'static) {
        self.callbacks.lock().plain.push(Box::new(action));
    }

    /// Like [`perform_when_all_committed`](Self::perform_when_all_committed),
    /// replacing any pending action registered under `tag`.
    pub fn cancel_and_run_when_all_committed(&self, tag: &str, action: impl FnOnce() + Send + 'static) {
        let mut callbacks = self.callbacks.lock();
        if callbacks.tagged.shift_remove(tag).is_some() {
            tracing::trace!("Replaced pending action {:?}", tag);
        }
        callbacks.tagged.insert(tag.to_string(), Box::new(action));
    }

    pub fn pending_callbacks(&self) -> usize {
        let callbacks = self.callbacks.lock();
        callbacks.plain.len() + callbacks.tagged.len()
    }

    /// Runs queued actions while everything is committed. Must not be called
    /// inside a write action. Returns how many ran.
    pub fn run_pending_callbacks(&self) -> usize {
        if self.gate.is_write_held() {
            violation("commit", "queued actions run inside a write action");
        }
        let mut ran = 0;
        loop {
            if self.has_uncommitted() {
                break;
            }
            let batch = {
                let mut callbacks = self.callbacks.lock();
                if callbacks.is_empty() {
                    break;
                }
                let plain = std::mem::take(&mut callbacks.plain);
                let tagged = std::mem::take(&mut callbacks.tagged);
                plain.into_iter().chain(tagged.into_values()).collect::<Vec<_>>()
            };
            for action in batch {
                action();
                ran += 1;
            }
        }
        ran
    }
}
