pub mod dependencies;
pub mod sequence;
pub mod types;

pub use dependencies::*;
pub use sequence::*;
pub use types::*;
