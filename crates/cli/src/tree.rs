use lathe_core::{LazyTree, TreeElement, TreeNode};
use lathe_plugin::LanguageFrontend;
use std::fmt::Write;
use std::sync::Arc;

enum Item {
    Node(TreeNode),
    Token(TreeElement),
}

/// Indented dump of the tree of `text`, one element per line. Unparsed
/// deferred nodes print as a single collapsed line unless `expand` is set.
pub fn render(frontend: Arc<dyn LanguageFrontend>, text: &str, expand: bool) -> String {
    let tree = LazyTree::parse(frontend, text);
    let mut out = String::new();
    let mut stack = vec![(Item::Node(tree.root()), 0usize)];
    while let Some((item, depth)) = stack.pop() {
        let pad = "  ".repeat(depth);
        match item {
            Item::Token(token) => {
                if token.kind().is_trivia() {
                    continue;
                }
                let TreeElement::Token { kind, text, range } = token else {
                    continue;
                };
                let _ = writeln!(out, "{pad}{kind:?}@{range:?} {text:?}");
            }
            Item::Node(node) => {
                if !expand && !node.is_parsed() {
                    let _ = writeln!(out, "{pad}{:?}@{:?} (deferred)", node.kind(), node.range());
                    continue;
                }
                let _ = writeln!(out, "{pad}{:?}@{:?}", node.kind(), node.range());
                for child in tree.children(&node).into_iter().rev() {
                    let item = match child {
                        TreeElement::Node(n) => Item::Node(n),
                        token => Item::Token(token),
                    };
                    stack.push((item, depth + 1));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_java::java_frontend;

    #[test]
    fn test_bodies_stay_collapsed() {
        let text = "class A { void m() { call(); } }";
        let collapsed = render(java_frontend(), text, false);
        assert!(collapsed.lines().any(|l| l.trim_start().starts_with("CodeBlock@") && l.ends_with("(deferred)")));
        assert!(!collapsed.contains("\"call\""));

        let expanded = render(java_frontend(), text, true);
        assert!(expanded.contains("\"call\""));
        assert!(!expanded.contains("(deferred)"));
    }
}
