//! Syntax trees whose bodies are parsed on first visit.

mod edit;

pub use edit::{EditOutcome, ReparseScope};

use crate::error::violation;
use crate::gate::ConcurrencyGate;
use lathe_api::{GreenElement, GreenNode, NodeId, NodeIds, SyntaxKind, TextRange, TextSize, TreeBuilder};
use lathe_plugin::LanguageFrontend;
use std::sync::Arc;

/// A node together with where it sits in the text.
#[derive(Debug, Clone)]
pub struct TreeNode {
    green: Arc<GreenNode>,
    range: TextRange,
}

impl TreeNode {
    pub fn new(green: Arc<GreenNode>, offset: TextSize) -> Self {
        let range = TextRange::at(offset, green.text_len());
        Self { green, range }
    }

    pub fn id(&self) -> NodeId {
        self.green.id()
    }

    pub fn kind(&self) -> SyntaxKind {
        self.green.kind()
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn green(&self) -> &Arc<GreenNode> {
        &self.green
    }

    pub fn is_parsed(&self) -> bool {
        self.green.is_parsed()
    }

    /// Same node object, not merely equal text.
    pub fn same_node(&self, other: &TreeNode) -> bool {
        Arc::ptr_eq(&self.green, &other.green)
    }

    pub fn text(&self) -> String {
        self.green.text()
    }
}

#[derive(Debug, Clone)]
pub enum TreeElement {
    Node(TreeNode),
    Token {
        kind: SyntaxKind,
        text: String,
        range: TextRange,
    },
}

impl TreeElement {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            TreeElement::Node(node) => node.kind(),
            TreeElement::Token { kind, .. } => *kind,
        }
    }

    pub fn range(&self) -> TextRange {
        match self {
            TreeElement::Node(node) => node.range(),
            TreeElement::Token { range, .. } => *range,
        }
    }

    pub fn as_node(&self) -> Option<&TreeNode> {
        match self {
            TreeElement::Node(node) => Some(node),
            TreeElement::Token { .. } => None,
        }
    }
}

pub struct LazyTree {
    root: Arc<GreenNode>,
    frontend: Arc<dyn LanguageFrontend>,
    ids: NodeIds,
    gate: Option<ConcurrencyGate>,
    strict: bool,
}

impl std::fmt::Debug for LazyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyTree")
            .field("root", &self.root.id())
            .field("len", &self.root.text_len())
            .field("strict", &self.strict)
            .finish()
    }
}

impl LazyTree {
    /// Parses the top level of `text`; bodies stay deferred.
    pub fn parse(frontend: Arc<dyn LanguageFrontend>, text: &str) -> Self {
        let ids = NodeIds::new();
        let root = frontend.parse_file(text, &ids);
        let tree = Self {
            root,
            frontend,
            ids,
            gate: None,
            strict: false,
        };
        if u32::from(tree.root.text_len()) as usize != text.len() {
            violation(
                "tree",
                format!(
                    "parse covered {} of {} bytes",
                    u32::from(tree.root.text_len()),
                    text.len()
                ),
            );
        }
        tree
    }

    /// Reads and writes of this tree must happen inside epochs of `gate`.
    pub fn guarded_by(mut self, gate: ConcurrencyGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Re-verify text after every materialize and edit.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub(crate) fn check_read(&self, what: &str) {
        if let Some(gate) = &self.gate {
            gate.assert_read_access(what);
        }
    }

    pub(crate) fn check_write(&self, what: &str) {
        if let Some(gate) = &self.gate {
            gate.assert_write_access(what);
        }
    }

    pub fn frontend(&self) -> &Arc<dyn LanguageFrontend> {
        &self.frontend
    }

    pub fn root(&self) -> TreeNode {
        self.check_read("tree access");
        TreeNode::new(self.root.clone(), TextSize::from(0))
    }

    pub fn green_root(&self) -> &Arc<GreenNode> {
        &self.root
    }

    pub fn len(&self) -> TextSize {
        self.root.text_len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.text_len() == TextSize::from(0)
    }

    /// Full text. Never parses anything.
    pub fn text(&self) -> String {
        self.check_read("tree text");
        self.root.text()
    }

    /// Children of `node`, parsing its raw text first if it is deferred and
    /// unvisited. Repeated calls reuse the first parse.
    pub fn materialize<'n>(&self, node: &'n GreenNode) -> &'n [GreenElement] {
        self.check_read("materialize");
        if node.is_parsed() {
            return node.children().unwrap_or(&[]);
        }
        let kind = node.kind();
        let children = node.materialize_with(|text| {
            tracing::trace!("Materializing {:?} {} ({} bytes)", kind, node.id(), text.len());
            let mut builder = TreeBuilder::new(self.ids.clone());
            self.frontend.parse_span(text, kind, &mut builder);
            builder.finish()
        });
        if self.strict {
            let mut rebuilt = String::new();
            for child in children {
                match child {
                    GreenElement::Token(t) => rebuilt.push_str(t.text()),
                    GreenElement::Node(n) => n.write_text(&mut rebuilt),
                }
            }
            if Some(rebuilt.as_str()) != node.deferred_text() {
                violation("materialize", format!("{kind:?} {} lost text", node.id()));
            }
        }
        children
    }

    pub fn children(&self, node: &TreeNode) -> Vec<TreeElement> {
        let mut offset = node.range.start();
        let mut out = Vec::new();
        for child in self.materialize(&node.green) {
            let len = child.text_len();
            out.push(match child {
                GreenElement::Node(n) => TreeElement::Node(TreeNode::new(n.clone(), offset)),
                GreenElement::Token(t) => TreeElement::Token {
                    kind: t.kind(),
                    text: t.text().to_string(),
                    range: TextRange::at(offset, len),
                },
            });
            offset += len;
        }
        out
    }

    /// Nodes from the root down to the deepest node covering `offset`,
    /// materializing only along that path. An offset on a boundary belongs
    /// to the element that starts there.
    pub fn path_to(&self, offset: TextSize) -> Vec<TreeNode> {
        self.check_read("tree navigation");
        if offset >= self.root.text_len() {
            return Vec::new();
        }
        let mut path = vec![TreeNode::new(self.root.clone(), TextSize::from(0))];
        loop {
            let Some(current) = path.last() else {
                break;
            };
            let mut start = current.range.start();
            let mut next = None;
            for child in self.materialize(&current.green) {
                let end = start + child.text_len();
                if offset >= start && offset < end {
                    if let GreenElement::Node(n) = child {
                        next = Some(TreeNode::new(n.clone(), start));
                    }
                    break;
                }
                start = end;
            }
            match next {
                Some(node) => path.push(node),
                None => break,
            }
        }
        path
    }

    /// Deepest node covering `offset`, or `None` past the end.
    pub fn find_node_at(&self, offset: TextSize) -> Option<TreeNode> {
        self.path_to(offset).pop()
    }

    /// Kind and range of the token at `offset`, descending only through
    /// nodes that are already parsed. Stops at an unparsed node.
    pub fn token_at_without_parsing(&self, offset: TextSize) -> Option<(SyntaxKind, TextRange)> {
        self.check_read("tree navigation");
        let mut node = self.root.clone();
        let mut start = TextSize::from(0);
        if offset >= node.text_len() {
            return None;
        }
        loop {
            let Some(children) = node.children() else {
                return Some((node.kind(), TextRange::at(start, node.text_len())));
            };
            let mut child_start = start;
            let mut found = None;
            for child in children {
                let end = child_start + child.text_len();
                if offset >= child_start && offset < end {
                    found = Some((child.clone(), child_start));
                    break;
                }
                child_start = end;
            }
            match found {
                Some((GreenElement::Token(t), at)) => {
                    return Some((t.kind(), TextRange::at(at, t.text_len())));
                }
                Some((GreenElement::Node(n), at)) => {
                    node = n;
                    start = at;
                }
                None => return None,
            }
        }
    }

    /// Locates a node by identity among the parts already parsed.
    pub fn find_by_id(&self, id: NodeId) -> Option<TreeNode> {
        self.check_read("tree navigation");
        let mut stack = vec![(self.root.clone(), TextSize::from(0))];
        while let Some((node, start)) = stack.pop() {
            if node.id() == id {
                return Some(TreeNode::new(node, start));
            }
            let mut offset = start;
            for child in node.children().unwrap_or(&[]) {
                if let GreenElement::Node(n) = child {
                    stack.push((n.clone(), offset));
                }
                offset += child.text_len();
            }
        }
        None
    }

    /// Deferred nodes already expanded, across the whole tree.
    pub fn parsed_deferred_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            if node.is_deferred() && node.is_parsed() {
                count += 1;
            }
            for child in node.children().unwrap_or(&[]) {
                if let GreenElement::Node(n) = child {
                    stack.push(n.clone());
                }
            }
        }
        count
    }

    /// Whether declaration-level structure holds error nodes or tokens.
    /// Bodies are not inspected.
    pub fn has_declaration_errors(&self) -> bool {
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            if node.is_deferred() {
                continue;
            }
            for child in node.children().unwrap_or(&[]) {
                match child {
                    GreenElement::Token(t) if t.kind() == SyntaxKind::Error => return true,
                    GreenElement::Token(_) => {}
                    GreenElement::Node(n) if n.kind() == SyntaxKind::ErrorNode => return true,
                    GreenElement::Node(n) => stack.push(n.clone()),
                }
            }
        }
        false
    }

    /// Walks everything parsed so far and checks that node lengths add up
    /// and that expanded nodes still spell their raw text.
    pub fn verify(&self) -> std::result::Result<(), String> {
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            let Some(children) = node.children() else {
                continue;
            };
            let sum: TextSize = children.iter().map(GreenElement::text_len).sum();
            if sum != node.text_len() {
                return Err(format!(
                    "{:?} {} spans {:?} but children span {:?}",
                    node.kind(),
                    node.id(),
                    node.text_len(),
                    sum
                ));
            }
            if let Some(raw) = node.deferred_text() {
                let mut rebuilt = String::with_capacity(raw.len());
                for child in children {
                    match child {
                        GreenElement::Token(t) => rebuilt.push_str(t.text()),
                        GreenElement::Node(n) => n.write_text(&mut rebuilt),
                    }
                }
                if rebuilt != raw {
                    return Err(format!("{:?} {} text differs from its parse", node.kind(), node.id()));
                }
            }
            for child in children {
                if let GreenElement::Node(n) = child {
                    stack.push(n.clone());
                }
            }
        }
        Ok(())
    }

    pub(crate) fn ids(&self) -> &NodeIds {
        &self.ids
    }

    pub(crate) fn replace_root(&mut self, root: Arc<GreenNode>) {
        self.root = root;
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_java::java_frontend;

    const SOURCE: &str = "class A {\n  void a() { if (x) { y(); } }\n  void b() { z(); }\n}\n";

    fn tree() -> LazyTree {
        LazyTree::parse(java_frontend(), SOURCE).strict(true)
    }

    #[test]
    fn test_text_needs_no_parse() {
        let tree = tree();
        assert_eq!(tree.text(), SOURCE);
        assert_eq!(tree.parsed_deferred_count(), 0);
    }

    #[test]
    fn test_path_materializes_only_ancestors() {
        let tree = tree();
        let offset = TextSize::from(SOURCE.find("y()").expect("offset") as u32);
        let path = tree.path_to(offset);
        let leaf = path.last().expect("leaf");
        assert!(leaf.range().contains(offset));
        // Method body `a` and its nested `if` block; `b` stays raw.
        assert_eq!(tree.parsed_deferred_count(), 2);
        assert_eq!(tree.text(), SOURCE);
        assert!(tree.verify().is_ok());
        for pair in path.windows(2) {
            assert!(pair[0].range().contains_range(pair[1].range()));
        }
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let tree = tree();
        let offset = TextSize::from(SOURCE.find("z()").expect("offset") as u32);
        let first = tree.path_to(offset);
        let second = tree.path_to(offset);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert!(a.same_node(b));
        }
    }

    #[test]
    fn test_children_are_contiguous() {
        let tree = tree();
        let root = tree.root();
        let children = tree.children(&root);
        let mut expected = root.range().start();
        for child in &children {
            assert_eq!(child.range().start(), expected);
            expected = child.range().end();
        }
        assert_eq!(expected, root.range().end());
    }

    #[test]
    fn test_out_of_range_offsets() {
        let tree = tree();
        assert!(tree.find_node_at(tree.len()).is_none());
        assert!(tree.path_to(TextSize::from(10_000)).is_empty());
    }

    #[test]
    fn test_token_lookup_stops_at_raw_bodies() {
        let tree = tree();
        let offset = TextSize::from(SOURCE.find("z()").expect("offset") as u32);
        let (kind, _) = tree.token_at_without_parsing(offset).expect("token");
        assert_eq!(kind, SyntaxKind::CodeBlock);
        assert_eq!(tree.parsed_deferred_count(), 0);
    }
}
