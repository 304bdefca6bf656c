//! Contracts between the model core and language front ends.

pub mod binary;
pub mod frontend;
pub mod sink;

pub use binary::{BinaryFrontend, InnerClassSource, NoInnerClasses};
pub use frontend::{FrontendInfo, LanguageFrontend};
pub use sink::{SinkError, SkeletonSink};
