use super::kind::SyntaxKind;
use smol_str::SmolStr;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use text_size::TextSize;

/// Stable identity of a tree node. Survives re-parses of unrelated regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Allocator for node identities, shared by every tree of one owner.
#[derive(Debug, Clone, Default)]
pub struct NodeIds(Arc<AtomicU64>);

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> NodeId {
        NodeId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreenToken {
    kind: SyntaxKind,
    text: SmolStr,
}

impl GreenToken {
    pub fn new(kind: SyntaxKind, text: &str) -> Self {
        Self {
            kind,
            text: SmolStr::new(text),
        }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_len(&self) -> TextSize {
        TextSize::of(self.text.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum GreenElement {
    Node(Arc<GreenNode>),
    Token(GreenToken),
}

impl GreenElement {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            GreenElement::Node(node) => node.kind(),
            GreenElement::Token(token) => token.kind(),
        }
    }

    pub fn text_len(&self) -> TextSize {
        match self {
            GreenElement::Node(node) => node.text_len(),
            GreenElement::Token(token) => token.text_len(),
        }
    }

    pub fn as_node(&self) -> Option<&Arc<GreenNode>> {
        match self {
            GreenElement::Node(node) => Some(node),
            GreenElement::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&GreenToken> {
        match self {
            GreenElement::Token(token) => Some(token),
            GreenElement::Node(_) => None,
        }
    }

    /// Same kind and same text.
    pub fn text_eq(&self, other: &GreenElement) -> bool {
        match (self, other) {
            (GreenElement::Token(a), GreenElement::Token(b)) => a == b,
            (GreenElement::Node(a), GreenElement::Node(b)) => a.text_eq(b),
            _ => false,
        }
    }
}

#[derive(Debug)]
enum Body {
    Parsed(Vec<GreenElement>),
    Deferred {
        text: Arc<str>,
        parsed: OnceLock<Vec<GreenElement>>,
    },
}

/// Immutable tree node. Deferred nodes keep their raw text and fill their
/// children at most once.
#[derive(Debug)]
pub struct GreenNode {
    id: NodeId,
    kind: SyntaxKind,
    len: TextSize,
    body: Body,
}

impl GreenNode {
    pub fn new(id: NodeId, kind: SyntaxKind, children: Vec<GreenElement>) -> Self {
        let len = children.iter().map(GreenElement::text_len).sum();
        Self {
            id,
            kind,
            len,
            body: Body::Parsed(children),
        }
    }

    pub fn deferred(id: NodeId, kind: SyntaxKind, text: &str) -> Self {
        Self {
            id,
            kind,
            len: TextSize::of(text),
            body: Body::Deferred {
                text: Arc::from(text),
                parsed: OnceLock::new(),
            },
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn text_len(&self) -> TextSize {
        self.len
    }

    /// Built as an unparsed span, whether or not it has been expanded since.
    pub fn is_deferred(&self) -> bool {
        matches!(self.body, Body::Deferred { .. })
    }

    pub fn is_parsed(&self) -> bool {
        match &self.body {
            Body::Parsed(_) => true,
            Body::Deferred { parsed, .. } => parsed.get().is_some(),
        }
    }

    pub fn deferred_text(&self) -> Option<&str> {
        match &self.body {
            Body::Deferred { text, .. } => Some(text),
            Body::Parsed(_) => None,
        }
    }

    /// Children, or `None` while the node is still unparsed.
    pub fn children(&self) -> Option<&[GreenElement]> {
        match &self.body {
            Body::Parsed(children) => Some(children),
            Body::Deferred { parsed, .. } => parsed.get().map(Vec::as_slice),
        }
    }

    /// Children, running `parse` over the raw text if this is the first visit.
    /// Concurrent callers block until the single parse finishes.
    pub fn materialize_with<F>(&self, parse: F) -> &[GreenElement]
    where
        F: FnOnce(&str) -> Vec<GreenElement>,
    {
        match &self.body {
            Body::Parsed(children) => children,
            Body::Deferred { text, parsed } => parsed.get_or_init(|| parse(text)),
        }
    }

    /// Appends the node's text. Deferred nodes contribute their raw span, so
    /// nothing gets parsed.
    pub fn write_text(&self, out: &mut String) {
        let root = match &self.body {
            Body::Deferred { text, .. } => {
                out.push_str(text);
                return;
            }
            Body::Parsed(children) => children,
        };
        let mut stack = vec![root.iter()];
        while let Some(top) = stack.last_mut() {
            match top.next() {
                None => {
                    stack.pop();
                }
                Some(GreenElement::Token(token)) => out.push_str(token.text()),
                Some(GreenElement::Node(node)) => match &node.body {
                    Body::Deferred { text, .. } => out.push_str(text),
                    Body::Parsed(children) => stack.push(children.iter()),
                },
            }
        }
    }

    pub fn text(&self) -> String {
        let mut out = String::with_capacity(u32::from(self.len) as usize);
        self.write_text(&mut out);
        out
    }

    pub fn text_eq(&self, other: &GreenNode) -> bool {
        if self.kind != other.kind || self.len != other.len {
            return false;
        }
        if std::ptr::eq(self, other) {
            return true;
        }
        match (self.deferred_text(), other.deferred_text()) {
            (Some(a), Some(b)) => a == b,
            _ => self.text() == other.text(),
        }
    }

    /// Tokens in order, without entering deferred nodes.
    pub fn tokens(&self) -> Tokens<'_> {
        let stack = match &self.body {
            Body::Parsed(children) => vec![children.iter()],
            Body::Deferred { .. } => Vec::new(),
        };
        Tokens { stack }
    }

    /// Whether a deferred node sits anywhere below this one.
    pub fn contains_deferred(&self) -> bool {
        let Body::Parsed(children) = &self.body else {
            return true;
        };
        let mut stack = vec![children.iter()];
        while let Some(top) = stack.last_mut() {
            match top.next() {
                None => {
                    stack.pop();
                }
                Some(GreenElement::Token(_)) => {}
                Some(GreenElement::Node(node)) => match &node.body {
                    Body::Deferred { .. } => return true,
                    Body::Parsed(children) => stack.push(children.iter()),
                },
            }
        }
        false
    }

    fn take_children(&mut self) -> Vec<GreenElement> {
        match &mut self.body {
            Body::Parsed(children) => std::mem::take(children),
            Body::Deferred { parsed, .. } => parsed.take().unwrap_or_default(),
        }
    }
}

impl Drop for GreenNode {
    // Deep trees must not recurse on drop.
    fn drop(&mut self) {
        let mut stack = self.take_children();
        while let Some(element) = stack.pop() {
            if let GreenElement::Node(node) = element {
                if let Ok(mut inner) = Arc::try_unwrap(node) {
                    stack.extend(inner.take_children());
                }
            }
        }
    }
}

pub struct Tokens<'a> {
    stack: Vec<std::slice::Iter<'a, GreenElement>>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a GreenToken;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(GreenElement::Token(token)) => return Some(token),
                Some(GreenElement::Node(node)) => {
                    if let Body::Parsed(children) = &node.body {
                        self.stack.push(children.iter());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: SyntaxKind, text: &str) -> GreenElement {
        GreenElement::Token(GreenToken::new(kind, text))
    }

    #[test]
    fn test_text_skips_parsing_of_deferred_nodes() {
        let ids = NodeIds::new();
        let body = Arc::new(GreenNode::deferred(ids.next(), SyntaxKind::CodeBlock, "{ x(); }"));
        let root = GreenNode::new(
            ids.next(),
            SyntaxKind::MethodDecl,
            vec![
                token(SyntaxKind::Ident, "m"),
                token(SyntaxKind::Whitespace, " "),
                GreenElement::Node(body.clone()),
            ],
        );
        assert_eq!(root.text(), "m { x(); }");
        assert_eq!(u32::from(root.text_len()), 10);
        assert!(!body.is_parsed());
    }

    #[test]
    fn test_materialize_runs_once() {
        let ids = NodeIds::new();
        let node = GreenNode::deferred(ids.next(), SyntaxKind::CodeBlock, "{}");
        let mut calls = 0;
        let first = node
            .materialize_with(|text| {
                calls += 1;
                vec![token(SyntaxKind::LBrace, &text[..1]), token(SyntaxKind::RBrace, &text[1..])]
            })
            .len();
        let second = node.materialize_with(|_| unreachable!()).len();
        assert_eq!((first, second, calls), (2, 2, 1));
        assert!(node.is_parsed());
        assert_eq!(node.text(), "{}");
    }

    #[test]
    fn test_deep_chain_drops_without_overflow() {
        let ids = NodeIds::new();
        let mut node = GreenNode::new(ids.next(), SyntaxKind::Literal, vec![token(SyntaxKind::IntLiteral, "1")]);
        for _ in 0..200_000 {
            node = GreenNode::new(ids.next(), SyntaxKind::ParenExpr, vec![GreenElement::Node(Arc::new(node))]);
        }
        assert_eq!(node.text(), "1");
        drop(node);
    }

    #[test]
    fn test_tokens_do_not_enter_deferred() {
        let ids = NodeIds::new();
        let root = GreenNode::new(
            ids.next(),
            SyntaxKind::VarDeclarator,
            vec![
                token(SyntaxKind::Ident, "r"),
                token(SyntaxKind::Eq, "="),
                GreenElement::Node(Arc::new(GreenNode::deferred(ids.next(), SyntaxKind::AnonymousBody, "{}"))),
            ],
        );
        let texts: Vec<_> = root.tokens().map(GreenToken::text).collect();
        assert_eq!(texts, vec!["r", "="]);
        assert!(root.contains_deferred());
    }
}
