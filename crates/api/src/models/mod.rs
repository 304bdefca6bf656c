pub mod binary;
pub mod buffer;
pub mod stub;

pub use binary::*;
pub use buffer::*;
pub use stub::*;
