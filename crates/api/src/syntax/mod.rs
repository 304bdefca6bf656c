//! Lossless syntax trees whose body nodes may stay unparsed until visited.

mod builder;
mod green;
mod kind;

pub use builder::{Checkpoint, TreeBuilder};
pub use green::{GreenElement, GreenNode, GreenToken, NodeId, NodeIds, Tokens};
pub use kind::SyntaxKind;
