//! Event-style builder for green trees.

use super::green::{GreenElement, GreenNode, GreenToken, NodeIds};
use super::kind::SyntaxKind;
use std::sync::Arc;

/// Position a later `start_node_at` can wrap from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

pub struct TreeBuilder {
    ids: NodeIds,
    parents: Vec<(SyntaxKind, usize)>,
    children: Vec<GreenElement>,
}

impl TreeBuilder {
    pub fn new(ids: NodeIds) -> Self {
        Self {
            ids,
            parents: Vec::with_capacity(32),
            children: Vec::with_capacity(64),
        }
    }

    pub fn ids(&self) -> &NodeIds {
        &self.ids
    }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.parents.push((kind, self.children.len()));
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.children.len())
    }

    /// Opens `kind` so that it adopts everything pushed since `checkpoint`.
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        let Checkpoint(first) = checkpoint;
        debug_assert!(first <= self.children.len(), "checkpoint past the end");
        if let Some(&(_, parent_first)) = self.parents.last() {
            debug_assert!(first >= parent_first, "checkpoint outside the open node");
        }
        self.parents.push((kind, first));
    }

    pub fn token(&mut self, kind: SyntaxKind, text: &str) {
        self.children
            .push(GreenElement::Token(GreenToken::new(kind, text)));
    }

    /// Pushes an unparsed node holding `text` verbatim.
    pub fn deferred(&mut self, kind: SyntaxKind, text: &str) {
        let node = GreenNode::deferred(self.ids.next(), kind, text);
        self.children.push(GreenElement::Node(Arc::new(node)));
    }

    pub fn finish_node(&mut self) {
        let Some((kind, first)) = self.parents.pop() else {
            debug_assert!(false, "finish_node without start_node");
            return;
        };
        let children = self.children.split_off(first);
        let node = GreenNode::new(self.ids.next(), kind, children);
        self.children.push(GreenElement::Node(Arc::new(node)));
    }

    pub fn is_balanced(&self) -> bool {
        self.parents.is_empty()
    }

    /// Top-level elements. Nodes still open are closed first.
    pub fn finish(mut self) -> Vec<GreenElement> {
        debug_assert!(self.parents.is_empty(), "unbalanced tree builder");
        while !self.parents.is_empty() {
            self.finish_node();
        }
        self.children
    }

    /// The single root node, or a wrapper of `kind` around whatever was built.
    pub fn finish_root(self, kind: SyntaxKind) -> Arc<GreenNode> {
        let ids = self.ids.clone();
        let mut children = self.finish();
        if children.len() == 1 && children[0].kind() == kind {
            if let Some(GreenElement::Node(root)) = children.pop() {
                return root;
            }
        }
        Arc::new(GreenNode::new(ids.next(), kind, children))
    }
}
