//! Applying a text edit to a lazy tree.
//!
//! The edit is re-parsed inside the deepest reparse unit that strictly
//! contains it and accepts the new text, falling back to the enclosing class
//! body and finally to the whole file. The new subtree is grafted onto the
//! old one so that untouched children keep their node objects, and the
//! spine above the reparsed node is copied with the same ids.

use super::LazyTree;
use crate::error::{ModelError, Result, violation};
use lathe_api::{GreenElement, GreenNode, NodeId, SyntaxKind, TextRange, TextSize, TreeBuilder};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparseScope {
    /// A method, initializer, lambda, switch or anonymous class body.
    Deferred,
    ClassBody,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub scope: ReparseScope,
    pub node: NodeId,
    pub kind: SyntaxKind,
}

impl EditOutcome {
    /// Only a body changed, so declaration shape cannot have moved.
    pub fn is_body_only(&self) -> bool {
        self.scope == ReparseScope::Deferred
    }
}

/// One step of the descent: a node, its offset and its index in the parent.
struct Step {
    node: Arc<GreenNode>,
    start: TextSize,
    index: usize,
}

impl LazyTree {
    /// Replaces `range` with `text`, re-parsing as little as possible.
    pub fn apply_edit(&mut self, range: TextRange, text: &str) -> Result<EditOutcome> {
        self.check_write("apply_edit");
        let old_len = self.root.text_len();
        if range.end() > old_len {
            return Err(ModelError::InvalidRange {
                start: range.start().into(),
                end: range.end().into(),
                len: old_len.into(),
            });
        }

        let path = self.descend(range);
        // Deepest first; the root is always the last resort.
        let mut outcome = None;
        for depth in (0..path.len()).rev() {
            let step = &path[depth];
            let kind = step.node.kind();
            if depth > 0 && !kind.is_reparse_unit() {
                continue;
            }
            let node_range = TextRange::at(step.start, step.node.text_len());
            if depth > 0 && !(node_range.start() < range.start() && range.end() < node_range.end()) {
                continue;
            }
            let old_text = step.node.text();
            let local = range - node_range.start();
            let (from, to) = (usize::from(local.start()), usize::from(local.end()));
            if !old_text.is_char_boundary(from) || !old_text.is_char_boundary(to) {
                return Err(ModelError::InvalidRange {
                    start: range.start().into(),
                    end: range.end().into(),
                    len: old_len.into(),
                });
            }
            let mut new_text = String::with_capacity(old_text.len() - (to - from) + text.len());
            new_text.push_str(&old_text[..from]);
            new_text.push_str(text);
            new_text.push_str(&old_text[to..]);

            if depth > 0 && !self.frontend.can_reparse(kind, &new_text) {
                tracing::trace!("{:?} {} rejects the edit, widening", kind, step.node.id());
                continue;
            }
            let replacement = if depth == 0 {
                self.reparse_file(&step.node, &new_text)
            } else {
                self.reparse_node(&step.node, &new_text)
            };
            let scope = if depth == 0 {
                ReparseScope::File
            } else if kind.is_deferred() {
                ReparseScope::Deferred
            } else {
                ReparseScope::ClassBody
            };
            if scope != ReparseScope::Deferred {
                tracing::debug!("Edit at {:?} re-parsed as {:?} ({:?})", range, scope, kind);
            }
            let root = copy_spine(&path[..=depth], replacement);
            self.replace_root(root);
            outcome = Some(EditOutcome {
                scope,
                node: step.node.id(),
                kind,
            });
            break;
        }

        let Some(outcome) = outcome else {
            violation("apply_edit", "no reparse unit accepted the edit");
        };
        let expected = u32::from(old_len) - u32::from(range.len()) + text.len() as u32;
        if u32::from(self.root.text_len()) != expected {
            violation(
                "apply_edit",
                format!("tree spans {:?} after edit, expected {}", self.root.text_len(), expected),
            );
        }
        if self.is_strict() {
            if let Err(detail) = self.verify() {
                violation("apply_edit", detail);
            }
        }
        Ok(outcome)
    }

    /// Nodes from the root down to the deepest parsed node containing
    /// `range`. Unparsed nodes are not entered.
    fn descend(&self, range: TextRange) -> Vec<Step> {
        let mut path = vec![Step {
            node: self.root.clone(),
            start: TextSize::from(0),
            index: 0,
        }];
        loop {
            let Some(current) = path.last() else {
                break;
            };
            let Some(children) = current.node.children() else {
                break;
            };
            let mut offset = current.start;
            let mut next = None;
            for (index, child) in children.iter().enumerate() {
                let end = offset + child.text_len();
                if offset <= range.start() && range.end() <= end {
                    if let GreenElement::Node(node) = child {
                        next = Some(Step {
                            node: node.clone(),
                            start: offset,
                            index,
                        });
                    }
                    break;
                }
                offset = end;
            }
            match next {
                Some(step) => path.push(step),
                None => break,
            }
        }
        path
    }

    fn reparse_node(&self, old: &Arc<GreenNode>, new_text: &str) -> Arc<GreenNode> {
        let kind = old.kind();
        match old.children() {
            // Never visited: stays raw.
            None => Arc::new(GreenNode::deferred(old.id(), kind, new_text)),
            Some(old_children) => {
                let mut builder = TreeBuilder::new(self.ids().clone());
                self.frontend.parse_span(new_text, kind, &mut builder);
                let children = graft(old_children, builder.finish());
                rebuild(old, children)
            }
        }
    }

    fn reparse_file(&self, old: &Arc<GreenNode>, new_text: &str) -> Arc<GreenNode> {
        let fresh = self.frontend.parse_file(new_text, self.ids());
        let new_children = fresh.children().map(<[GreenElement]>::to_vec).unwrap_or_default();
        let children = graft(old.children().unwrap_or(&[]), new_children);
        Arc::new(GreenNode::new(old.id(), SyntaxKind::CompilationUnit, children))
    }
}

/// Same id and kind as `old`, new children. Deferred nodes stay deferred and
/// come back already expanded.
fn rebuild(old: &GreenNode, children: Vec<GreenElement>) -> Arc<GreenNode> {
    if !old.is_deferred() {
        return Arc::new(GreenNode::new(old.id(), old.kind(), children));
    }
    let mut text = String::new();
    for child in &children {
        match child {
            GreenElement::Token(t) => text.push_str(t.text()),
            GreenElement::Node(n) => n.write_text(&mut text),
        }
    }
    let node = GreenNode::deferred(old.id(), old.kind(), &text);
    node.materialize_with(move |_| children);
    Arc::new(node)
}

/// Rebuilds the ancestors along `path` with its last node swapped for
/// `replacement`.
fn copy_spine(path: &[Step], replacement: Arc<GreenNode>) -> Arc<GreenNode> {
    let mut current = replacement;
    for depth in (1..path.len()).rev() {
        let parent = &path[depth - 1].node;
        let index = path[depth].index;
        let mut children = parent.children().map(<[GreenElement]>::to_vec).unwrap_or_default();
        if index >= children.len() {
            violation("apply_edit", format!("stale path below {}", parent.id()));
        }
        children[index] = GreenElement::Node(current);
        current = rebuild(parent, children);
    }
    current
}

/// Merges freshly parsed `new` children into `old`, keeping every old
/// element whose kind and text did not change.
pub(crate) fn graft(old: &[GreenElement], new: Vec<GreenElement>) -> Vec<GreenElement> {
    let mut prefix = 0;
    while prefix < old.len() && prefix < new.len() && old[prefix].text_eq(&new[prefix]) {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < old.len() - prefix
        && suffix < new.len() - prefix
        && old[old.len() - 1 - suffix].text_eq(&new[new.len() - 1 - suffix])
    {
        suffix += 1;
    }

    let old_middle = &old[prefix..old.len() - suffix];
    let new_len = new.len();
    let mut out = Vec::with_capacity(new_len);
    out.extend_from_slice(&old[..prefix]);
    for (i, element) in new.into_iter().enumerate() {
        if i < prefix || i >= new_len - suffix {
            continue;
        }
        let paired = if old_middle.len() == new_len - prefix - suffix {
            old_middle.get(i - prefix)
        } else {
            None
        };
        out.push(match (paired, element) {
            (Some(GreenElement::Node(old_node)), GreenElement::Node(new_node))
                if old_node.kind() == new_node.kind() && !old_node.is_deferred() && !new_node.is_deferred() =>
            {
                let old_children = old_node.children().unwrap_or(&[]);
                let new_children = new_node.children().map(<[GreenElement]>::to_vec).unwrap_or_default();
                GreenElement::Node(Arc::new(GreenNode::new(
                    old_node.id(),
                    old_node.kind(),
                    graft(old_children, new_children),
                )))
            }
            (_, element) => element,
        });
    }
    out.extend_from_slice(&old[old.len() - suffix..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ConcurrencyGate;
    use lathe_java::java_frontend;

    const SOURCE: &str = "class A {\n  void a() { x(); }\n  void b() { y(); }\n}\n";

    fn offset_of(text: &str, needle: &str) -> TextSize {
        TextSize::from(text.find(needle).expect("needle") as u32)
    }

    fn method_body(tree: &LazyTree, needle: &str) -> Arc<GreenNode> {
        let text = tree.text();
        let path = tree.path_to(offset_of(&text, needle));
        path.iter()
            .rev()
            .find(|n| n.kind() == SyntaxKind::CodeBlock)
            .map(|n| n.green().clone())
            .expect("body")
    }

    #[test]
    fn test_body_edit_stays_in_body() {
        let mut tree = LazyTree::parse(java_frontend(), SOURCE).strict(true);
        let before = method_body(&tree, "y()");
        let at = offset_of(SOURCE, "x()");
        let outcome = tree
            .apply_edit(TextRange::new(at, at + TextSize::from(1)), "zz")
            .expect("edit");
        assert_eq!(outcome.scope, ReparseScope::Deferred);
        assert!(outcome.is_body_only());
        assert_eq!(tree.text(), SOURCE.replacen("x()", "zz()", 1));
        // The sibling body is the very same node.
        let after = method_body(&tree, "y()");
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_parsed_body_is_regrafted() {
        let source = "class A { void a() { if (c) { p(); } q(); } }";
        let mut tree = LazyTree::parse(java_frontend(), source).strict(true);
        let inner = method_body(&tree, "p()");
        let at = offset_of(source, "q()");
        tree.apply_edit(TextRange::new(at, at + TextSize::from(1)), "r")
            .expect("edit");
        assert_eq!(tree.text(), source.replacen("q()", "r()", 1));
        assert!(tree.find_by_id(inner.id()).is_some_and(|n| Arc::ptr_eq(n.green(), &inner)));
    }

    #[test]
    fn test_member_insert_falls_back_to_class_body() {
        let mut tree = LazyTree::parse(java_frontend(), SOURCE).strict(true);
        let body_a = method_body(&tree, "x()");
        let root_id = tree.green_root().id();
        // Just before the closing brace of the class.
        let at = TextSize::from(SOURCE.rfind('}').expect("brace") as u32);
        let outcome = tree.apply_edit(TextRange::empty(at), "int f;\n").expect("edit");
        assert_eq!(outcome.scope, ReparseScope::ClassBody);
        assert_eq!(tree.green_root().id(), root_id);
        assert!(tree.text().contains("int f;"));
        assert!(Arc::ptr_eq(&body_a, &method_body(&tree, "x()")));
    }

    #[test]
    fn test_unbalanced_edit_reparses_file() {
        let mut tree = LazyTree::parse(java_frontend(), SOURCE).strict(true);
        let at = offset_of(SOURCE, "x()");
        let outcome = tree.apply_edit(TextRange::empty(at), "}").expect("edit");
        assert_eq!(outcome.scope, ReparseScope::File);
        let mut expected = SOURCE.to_string();
        expected.insert(usize::from(at), '}');
        assert_eq!(tree.text(), expected);
    }

    #[test]
    fn test_edit_past_end_is_rejected() {
        let mut tree = LazyTree::parse(java_frontend(), SOURCE);
        let len = tree.len();
        let err = tree
            .apply_edit(TextRange::new(len, len + TextSize::from(1)), "x")
            .expect_err("out of range");
        assert!(matches!(err, ModelError::InvalidRange { .. }));
    }

    #[test]
    #[should_panic(expected = "apply_edit outside a write action")]
    fn test_edit_requires_write_epoch() {
        let gate = ConcurrencyGate::new();
        let mut tree = LazyTree::parse(java_frontend(), SOURCE).guarded_by(gate.clone());
        let _read = gate.read();
        let _ = tree.apply_edit(TextRange::empty(TextSize::from(0)), " ");
    }
}
