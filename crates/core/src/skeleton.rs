//! Two-way mapping between a skeleton's stubs and the declarations of the
//! tree it was derived from.

use crate::error::violation;
use crate::tree::{LazyTree, TreeNode};
use lathe_api::{
    BufferId, GreenElement, GreenNode, NodeId, Provenance, Skeleton, StubId, StubKind, StubNode,
    SyntaxKind, TextRange, TextSize,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A declaration as seen by consumers: which skeleton it belongs to and the
/// tree node that spells it.
#[derive(Debug, Clone)]
pub enum ModelNode {
    Source {
        buffer: BufferId,
        stub: StubId,
        kind: StubKind,
        node: TreeNode,
    },
    Binary {
        class: String,
        stub: StubId,
        kind: StubKind,
        node: TreeNode,
    },
}

impl ModelNode {
    pub fn stub(&self) -> StubId {
        match self {
            ModelNode::Source { stub, .. } | ModelNode::Binary { stub, .. } => *stub,
        }
    }

    pub fn kind(&self) -> StubKind {
        match self {
            ModelNode::Source { kind, .. } | ModelNode::Binary { kind, .. } => *kind,
        }
    }

    pub fn node(&self) -> &TreeNode {
        match self {
            ModelNode::Source { node, .. } | ModelNode::Binary { node, .. } => node,
        }
    }

    pub fn range(&self) -> TextRange {
        self.node().range()
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ModelNode::Binary { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum Role {
    File,
    Class,
    Method,
    Leaf,
}

#[derive(Debug)]
struct Entry {
    node: Arc<GreenNode>,
    range: TextRange,
    kind: StubKind,
}

#[derive(Debug)]
pub struct SkeletonIndex {
    skeleton: Arc<Skeleton>,
    root: Arc<GreenNode>,
    entries: Vec<Entry>,
    by_node: HashMap<NodeId, StubId>,
}

fn children_at(node: &GreenNode, start: TextSize) -> impl Iterator<Item = (&Arc<GreenNode>, TextSize)> {
    let mut offset = start;
    node.children().unwrap_or(&[]).iter().filter_map(move |child| {
        let at = offset;
        offset += child.text_len();
        child.as_node().map(|n| (n, at))
    })
}

impl SkeletonIndex {
    /// Derives the skeleton of `tree` and records which node produced each
    /// stub. Deferred bodies are neither entered nor expanded.
    pub fn new(tree: &LazyTree, provenance: Provenance) -> Self {
        let root = tree.green_root().clone();
        let skeleton = Arc::new(Skeleton::new(provenance, tree.frontend().derive_skeleton(&root)));
        let entries = Self::walk(&root);
        if entries.len() != skeleton.len() {
            violation(
                "skeleton index",
                format!("{} declarations for {} stubs", entries.len(), skeleton.len()),
            );
        }
        let by_node = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.node.id(), StubId(i as u32)))
            .collect();
        Self {
            skeleton,
            root,
            entries,
            by_node,
        }
    }

    /// Declarations in skeleton preorder.
    fn walk(root: &Arc<GreenNode>) -> Vec<Entry> {
        let mut entries = Vec::new();
        let mut stack = vec![(root.clone(), TextSize::from(0), Role::File)];
        while let Some((node, start, role)) = stack.pop() {
            let Some(kind) = node.kind().stub_kind() else {
                continue;
            };
            entries.push(Entry {
                node: node.clone(),
                range: TextRange::at(start, node.text_len()),
                kind,
            });
            let mut next = Vec::new();
            match role {
                Role::File => {
                    for (child, at) in children_at(&node, start) {
                        match child.kind() {
                            SyntaxKind::ImportDecl => next.push((child.clone(), at, Role::Leaf)),
                            SyntaxKind::ClassDecl => next.push((child.clone(), at, Role::Class)),
                            _ => {}
                        }
                    }
                }
                Role::Class => {
                    let body = children_at(&node, start)
                        .find(|(n, _)| matches!(n.kind(), SyntaxKind::ClassBody | SyntaxKind::EnumBody));
                    if let Some((body, body_start)) = body {
                        for (member, at) in children_at(body, body_start) {
                            match member.kind() {
                                SyntaxKind::EnumConstant => next.push((member.clone(), at, Role::Leaf)),
                                SyntaxKind::FieldDecl => {
                                    for (declarator, at) in children_at(member, at) {
                                        if declarator.kind() == SyntaxKind::VarDeclarator {
                                            next.push((declarator.clone(), at, Role::Leaf));
                                        }
                                    }
                                }
                                SyntaxKind::MethodDecl | SyntaxKind::ConstructorDecl => {
                                    next.push((member.clone(), at, Role::Method));
                                }
                                SyntaxKind::ClassDecl => next.push((member.clone(), at, Role::Class)),
                                _ => {}
                            }
                        }
                    }
                }
                Role::Method => {
                    let params = children_at(&node, start).find(|(n, _)| n.kind() == SyntaxKind::ParamList);
                    if let Some((list, list_start)) = params {
                        for (param, at) in children_at(list, list_start) {
                            if param.kind() == SyntaxKind::Param {
                                next.push((param.clone(), at, Role::Leaf));
                            }
                        }
                    }
                }
                Role::Leaf => {}
            }
            stack.extend(next.into_iter().rev());
        }
        entries
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The tree node a stub was derived from.
    pub fn resolve(&self, stub: StubId) -> Option<TreeNode> {
        self.entries
            .get(stub.index())
            .map(|e| TreeNode::new(e.node.clone(), e.range.start()))
    }

    /// Like [`resolve`](Self::resolve), for a stub borrowed from this
    /// index's skeleton.
    pub fn resolve_stub(&self, stub: &StubNode) -> Option<TreeNode> {
        let position = self.skeleton.iter().position(|(_, s)| std::ptr::eq(s, stub))?;
        self.resolve(StubId(position as u32))
    }

    /// The stub a node produced, if it is a declaration.
    pub fn project(&self, node: &TreeNode) -> Option<StubId> {
        self.by_node.get(&node.id()).copied()
    }

    pub fn stub(&self, id: StubId) -> Option<&StubNode> {
        self.skeleton.get(id)
    }

    pub fn kind(&self, id: StubId) -> Option<StubKind> {
        self.entries.get(id.index()).map(|e| e.kind)
    }

    /// Deepest declaration covering `offset`, the file itself excluded.
    /// Whitespace and punctuation that sit directly in a file or class body
    /// belong to nothing. Bodies are treated as opaque and never parsed.
    pub fn find_node_at(&self, offset: TextSize) -> Option<(StubId, TreeNode)> {
        if offset >= self.root.text_len() || self.is_loose_token(offset) {
            return None;
        }
        let (index, entry) = self
            .entries
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, e)| e.range.contains(offset))
            .min_by_key(|(_, e)| e.range.len())?;
        Some((StubId(index as u32), TreeNode::new(entry.node.clone(), entry.range.start())))
    }

    /// Whether the token at `offset` is trivia or punctuation owned by a
    /// file, class body or enum body.
    fn is_loose_token(&self, offset: TextSize) -> bool {
        let mut node = self.root.clone();
        let mut start = TextSize::from(0);
        loop {
            let Some(children) = node.children() else {
                return false;
            };
            let mut child_start = start;
            let mut found = None;
            for child in children {
                let end = child_start + child.text_len();
                if offset >= child_start && offset < end {
                    found = Some(child.clone());
                    break;
                }
                child_start = end;
            }
            match found {
                Some(GreenElement::Token(token)) => {
                    let kind = token.kind();
                    let loose = kind.is_trivia() || kind.is_punct();
                    return loose
                        && matches!(
                            node.kind(),
                            SyntaxKind::CompilationUnit | SyntaxKind::ClassBody | SyntaxKind::EnumBody
                        );
                }
                Some(GreenElement::Node(child)) => {
                    node = child;
                    start = child_start;
                }
                None => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_java::java_frontend;

    const SOURCE: &str = "package p;\n\nimport java.util.List;\n\nclass A {\n  int x, y;\n  void m(int a) { body(); }\n  class B {}\n}\n";

    fn index() -> (LazyTree, SkeletonIndex) {
        let tree = LazyTree::parse(java_frontend(), SOURCE);
        let index = SkeletonIndex::new(&tree, Provenance::Source);
        (tree, index)
    }

    fn at(needle: &str) -> TextSize {
        TextSize::from(SOURCE.find(needle).expect("needle") as u32)
    }

    #[test]
    fn test_every_stub_resolves_and_projects_back() {
        let (tree, index) = index();
        assert_eq!(index.len(), index.skeleton().len());
        for (id, stub) in index.skeleton().iter() {
            let node = index.resolve(id).expect("resolves");
            assert_eq!(index.project(&node), Some(id));
            assert_eq!(index.kind(id), Some(stub.kind));
            assert!(index.resolve_stub(stub).is_some_and(|n| n.same_node(&node)));
        }
        assert_eq!(tree.parsed_deferred_count(), 0);
    }

    #[test]
    fn test_find_node_at() {
        let (tree, index) = index();
        let (id, _) = index.find_node_at(at("y;")).expect("field");
        assert_eq!(index.stub(id).and_then(StubNode::name), Some("y"));
        let (id, _) = index.find_node_at(at("a)")).expect("param");
        assert_eq!(index.kind(id), Some(StubKind::Parameter));
        let (id, _) = index.find_node_at(at("body")).expect("method");
        assert_eq!(index.stub(id).and_then(StubNode::name), Some("m"));
        let (id, _) = index.find_node_at(at("B {}")).expect("class");
        assert_eq!(index.stub(id).and_then(StubNode::name), Some("B"));
        // Blank line between declarations at file level.
        assert!(index.find_node_at(at("\n\nimport")).is_none());
        // Closing brace of the class body.
        assert!(index.find_node_at(TextSize::from(SOURCE.rfind('}').expect("brace") as u32)).is_none());
        assert!(index.find_node_at(tree.len()).is_none());
        assert_eq!(tree.parsed_deferred_count(), 0);
    }

    #[test]
    fn test_every_offset_is_safe() {
        let (tree, index) = index();
        for offset in 0..u32::from(tree.len()) {
            if let Some((id, node)) = index.find_node_at(offset.into()) {
                assert!(node.range().contains(offset.into()));
                assert_ne!(id, StubId::ROOT);
            }
        }
    }
}
