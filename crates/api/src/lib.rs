pub mod cache;
pub mod error;
pub mod models;
pub mod syntax;

// Re-export commonly used types
pub use cache::{CacheStats, CachedMirrorSummary};
pub use error::{FormatError, FormatResult};
pub use models::*;
pub use syntax::{
    Checkpoint, GreenElement, GreenNode, GreenToken, NodeId, NodeIds, SyntaxKind, TreeBuilder,
};
pub use text_size::{TextRange, TextSize};
