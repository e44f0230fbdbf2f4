//! Error types for the loader pipeline.

use std::error::Error as _;
use std::path::PathBuf;
use thiserror::Error;

/// Storage backend errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("PostgreSQL error: {}", postgres_reason(.0))]
    Postgres(#[from] postgres::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Geometry could not be encoded for the backend.
    #[error("Geometry encoding error: {0}")]
    Geometry(#[from] serde_json::Error),
}

/// Errors that stop a load run.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path:?} is not a JSON array of objects")]
    NotAnArray { path: PathBuf },

    #[error("Failed to read columns of {table}: {source}")]
    Introspect {
        table: String,
        #[source]
        source: DbError,
    },

    /// Batch numbers start at 1.
    #[error("Batch {batch} of {table} failed: {source}")]
    Batch {
        table: String,
        batch: usize,
        #[source]
        source: DbError,
    },

    #[error("Illegal run transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
}

/// Server message with detail and constraint; `postgres::Error` alone
/// only displays its kind.
fn postgres_reason(err: &postgres::Error) -> String {
    let Some(db) = err.as_db_error() else {
        return match err.source() {
            Some(source) => format!("{}: {}", err, source),
            None => err.to_string(),
        };
    };

    let mut reason = format!("{} ({})", db.message(), db.code().code());
    if let Some(detail) = db.detail() {
        reason.push_str(&format!("; {}", detail));
    }
    if let Some(constraint) = db.constraint() {
        reason.push_str(&format!("; constraint {}", constraint));
    }
    reason
}

/// Result type for backend operations.
pub type DbResult<T> = std::result::Result<T, DbError>;
