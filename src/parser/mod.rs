pub mod mapper;
pub mod record;

pub use mapper::*;
pub use record::*;
