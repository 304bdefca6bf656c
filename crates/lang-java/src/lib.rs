pub mod binary;
#[doc(hidden)]
pub mod fixtures;
pub mod lexer;
pub mod parser;
pub mod reparse;
pub mod scan;
pub mod stubs;

use binary::JavaBinaryFrontend;
use lathe_api::{GreenNode, NodeIds, StubNode, SyntaxKind, TreeBuilder};
use lathe_plugin::{BinaryFrontend, FrontendInfo, LanguageFrontend};
use std::sync::Arc;

pub struct JavaFrontend {
    binary: Arc<JavaBinaryFrontend>,
}

impl JavaFrontend {
    pub fn new() -> Self {
        Self {
            binary: Arc::new(JavaBinaryFrontend::new()),
        }
    }
}

impl Default for JavaFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageFrontend for JavaFrontend {
    fn info(&self) -> FrontendInfo {
        FrontendInfo {
            name: "java",
            extensions: &["java"],
        }
    }

    fn parse_file(&self, text: &str, ids: &NodeIds) -> Arc<GreenNode> {
        parser::parse_file(text, ids)
    }

    fn parse_span(&self, text: &str, kind: SyntaxKind, builder: &mut TreeBuilder) {
        parser::parse_span(text, kind, builder)
    }

    fn can_reparse(&self, kind: SyntaxKind, text: &str) -> bool {
        reparse::can_reparse(kind, text)
    }

    fn build_skeleton(&self, text: &str) -> StubNode {
        stubs::build_skeleton(text)
    }

    fn derive_skeleton(&self, root: &GreenNode) -> StubNode {
        stubs::derive_skeleton(root)
    }

    fn binary(&self) -> Option<Arc<dyn BinaryFrontend>> {
        Some(self.binary.clone())
    }
}

/// The Java front end behind the shared trait object.
pub fn java_frontend() -> Arc<dyn LanguageFrontend> {
    Arc::new(JavaFrontend::new())
}
