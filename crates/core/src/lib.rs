pub mod buffer;
pub mod commit;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod logging;
pub mod mirror;
pub mod skeleton;
pub mod stub_index;
pub mod tracker;
pub mod tree;

pub use buffer::{BufferEdit, BufferListener, TextBuffer};
pub use commit::{CommitCoordinator, CommitReport, CommitState};
pub use config::ModelConfig;
pub use context::{ModelContext, ModelContextBuilder, ReadView, WriteTx};
pub use error::{Cancelled, ConsistencyViolation, ModelError, Result};
pub use gate::{ConcurrencyGate, GateState};
pub use mirror::{Mirror, MirrorCache};
pub use skeleton::{ModelNode, SkeletonIndex};
pub use stub_index::{StubIndex, StubLocation};
pub use tracker::ModificationTracker;
pub use tree::{EditOutcome, LazyTree, ReparseScope, TreeElement, TreeNode};
