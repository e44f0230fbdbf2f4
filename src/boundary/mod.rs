pub mod feature;
pub mod matcher;

pub use feature::*;
pub use matcher::*;
