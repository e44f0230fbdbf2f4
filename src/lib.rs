pub mod boundary;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod filter;
pub mod loader;
pub mod parser;
pub mod schema;
pub mod ui;
pub mod writer;

pub use cli::{Cli, Commands};
pub use error::{DbError, LoadError};
pub use loader::{LoadSummary, Loader, RunState};
pub use ui::{ConsoleReporter, Reporter, SilentReporter};
