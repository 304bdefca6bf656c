use crate::binary::BinaryFrontend;
use lathe_api::{GreenNode, NodeIds, StubNode, SyntaxKind, TreeBuilder};
use std::sync::Arc;

/// Metadata for a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendInfo {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

/// A language's grammar and skeleton builders.
/// Optional abilities are discovered through methods returning `Option`.
pub trait LanguageFrontend: Send + Sync {
    fn info(&self) -> FrontendInfo;

    /// Parses a whole file. Bodies are left as deferred nodes.
    /// Never fails: malformed input yields error nodes.
    fn parse_file(&self, text: &str, ids: &NodeIds) -> Arc<GreenNode>;

    /// Parses the raw text of a node of `kind` into its children.
    /// The pushed elements must reproduce `text` exactly.
    fn parse_span(&self, text: &str, kind: SyntaxKind, builder: &mut TreeBuilder);

    /// Whether `text` can replace the content of a node of `kind` without
    /// disturbing the surrounding tree.
    fn can_reparse(&self, kind: SyntaxKind, text: &str) -> bool;

    /// Fast skeleton straight from text, without building a tree.
    fn build_skeleton(&self, text: &str) -> StubNode;

    /// Reference skeleton derived from a parsed tree. Must not expand
    /// deferred nodes.
    fn derive_skeleton(&self, root: &GreenNode) -> StubNode;

    /// Reader for compiled classes, if the language has them.
    fn binary(&self) -> Option<Arc<dyn BinaryFrontend>> {
        None
    }

    fn handles_extension(&self, ext: &str) -> bool {
        self.info()
            .extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}
