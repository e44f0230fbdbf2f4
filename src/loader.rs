//! Sequenced loader.
//!
//! Walks the load sequence one file at a time as an explicit state machine:
//!
//! ```text
//! NotStarted -> Introspecting(t) -> Filtering(t) -> Inserting(t, n) -> Committed(t) | Failed(t)
//! ```
//!
//! `Failed` ends the run: no later table is attempted, since its FK parents
//! may not be in place. A missing fixture moves straight to `Skipped(t)`.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::LoadError;
use crate::parser::{map_records, read_fixture, MappingReport};
use crate::schema::{column_mapping, LoadSpec};
use crate::ui::Reporter;
use crate::writer::{BatchInserter, Database, InsertOutcome, SchemaCache, DEFAULT_BATCH_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    NotStarted,
    Introspecting { table: String },
    Filtering { table: String },
    Inserting { table: String, batch: usize },
    Committed { table: String },
    Skipped { table: String },
    Failed { table: String },
    Done,
}

impl RunState {
    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Failed { .. } | RunState::Done)
    }

    fn allows(&self, next: &RunState) -> bool {
        use RunState::*;

        match (self, next) {
            (Failed { .. } | Done, _) => false,
            (_, Failed { .. }) => true,
            (NotStarted | Committed { .. } | Skipped { .. }, Introspecting { .. } | Skipped { .. } | Done) => {
                true
            }
            (Introspecting { table: a }, Filtering { table: b }) => a == b,
            (Filtering { table: a }, Inserting { table: b, batch }) => a == b && *batch == 1,
            (Filtering { table: a }, Committed { table: b }) => a == b,
            (Inserting { table: a, batch: n }, Inserting { table: b, batch: m }) => {
                a == b && *m == n + 1
            }
            (Inserting { table: a, .. }, Committed { table: b }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => write!(f, "NOT_STARTED"),
            RunState::Introspecting { table } => write!(f, "INTROSPECTING({})", table),
            RunState::Filtering { table } => write!(f, "FILTERING({})", table),
            RunState::Inserting { table, batch } => write!(f, "INSERTING({}, {})", table, batch),
            RunState::Committed { table } => write!(f, "COMMITTED({})", table),
            RunState::Skipped { table } => write!(f, "SKIPPED({})", table),
            RunState::Failed { table } => write!(f, "FAILED({})", table),
            RunState::Done => write!(f, "DONE"),
        }
    }
}

fn transition(state: &mut RunState, next: RunState) -> Result<(), LoadError> {
    if !state.allows(&next) {
        return Err(LoadError::IllegalTransition {
            from: state.to_string(),
            to: next.to_string(),
        });
    }
    tracing::debug!(from = %state, to = %next, "run state");
    *state = next;
    Ok(())
}

#[derive(Debug, Clone)]
pub enum FileStatus {
    Loaded {
        records: usize,
        outcome: InsertOutcome,
        mapping: MappingReport,
        parse_time: Duration,
        insert_time: Duration,
    },
    /// Source file not present
    Skipped,
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub table: &'static str,
    pub source_file: &'static str,
    pub status: FileStatus,
}

/// The step that stopped the run
#[derive(Debug)]
pub struct FailedLoad {
    pub table: &'static str,
    pub source_file: &'static str,
    pub error: LoadError,
}

#[derive(Debug, Default)]
pub struct LoadSummary {
    pub files: Vec<FileOutcome>,
    /// Records submitted across all files
    pub total_records: u64,
    /// Rows that were new
    pub total_inserted: u64,
    pub elapsed: Duration,
    pub failure: Option<FailedLoad>,
}

impl LoadSummary {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn loaded_tables(&self) -> Vec<&'static str> {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Loaded { .. }))
            .map(|f| f.table)
            .collect()
    }

    pub fn skipped_files(&self) -> Vec<&'static str> {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Skipped))
            .map(|f| f.source_file)
            .collect()
    }

    fn record(&mut self, file: FileOutcome) {
        if let FileStatus::Loaded { outcome, .. } = &file.status {
            self.total_records += outcome.submitted;
            self.total_inserted += outcome.inserted;
        }
        self.files.push(file);
    }
}

pub struct Loader<'a, D: Database + ?Sized, R: Reporter> {
    db: &'a mut D,
    reporter: &'a mut R,
    data_dir: PathBuf,
    batch_size: usize,
    schema: SchemaCache,
    state: RunState,
}

impl<'a, D: Database + ?Sized, R: Reporter> Loader<'a, D, R> {
    pub fn new(db: &'a mut D, reporter: &'a mut R, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            reporter,
            data_dir: data_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            schema: SchemaCache::new(),
            state: RunState::NotStarted,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Load every step in order, stopping at the first hard failure
    pub fn run(&mut self, specs: &[&'static LoadSpec]) -> LoadSummary {
        let start = Instant::now();
        let mut summary = LoadSummary::default();
        let mut pending = specs.iter().copied();

        while !self.state.is_terminal() {
            let Some(spec) = pending.next() else {
                if let Err(error) = transition(&mut self.state, RunState::Done) {
                    self.state = RunState::Failed {
                        table: String::new(),
                    };
                    summary.failure = Some(FailedLoad {
                        table: "",
                        source_file: "",
                        error,
                    });
                }
                break;
            };

            match self.load_file(spec) {
                Ok(file) => summary.record(file),
                Err(error) => {
                    self.reporter.log(format!("  FAILED: {}", error));
                    self.state = RunState::Failed {
                        table: spec.table.to_string(),
                    };
                    summary.failure = Some(FailedLoad {
                        table: spec.table,
                        source_file: spec.source_file,
                        error,
                    });
                }
            }
        }

        summary.elapsed = start.elapsed();
        summary
    }

    fn load_file(&mut self, spec: &'static LoadSpec) -> Result<FileOutcome, LoadError> {
        let table = spec.table;
        let path = self.data_dir.join(spec.source_file);

        if !path.exists() {
            self.reporter
                .log(format!("SKIP: {} (not found)", spec.source_file));
            transition(&mut self.state, RunState::Skipped { table: table.into() })?;
            return Ok(FileOutcome {
                table,
                source_file: spec.source_file,
                status: FileStatus::Skipped,
            });
        }

        let size_mb = fs::metadata(&path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);
        self.reporter.log(format!(
            "Loading {} ({:.1} MB) -> {}...",
            spec.source_file, size_mb, table
        ));

        transition(&mut self.state, RunState::Introspecting { table: table.into() })?;
        let columns = self
            .schema
            .columns(&mut *self.db, table)
            .map_err(|source| LoadError::Introspect {
                table: table.to_string(),
                source,
            })?
            .clone();
        if columns.is_empty() {
            self.reporter.warn(format!(
                "{} has no columns in the destination schema; every field will be dropped",
                table
            ));
        }

        transition(&mut self.state, RunState::Filtering { table: table.into() })?;
        let start = Instant::now();
        let records = read_fixture(&path)?;
        let parse_time = start.elapsed();
        let record_count = records.len();
        self.reporter.log(format!(
            "  Parsed {} records in {:.1}s",
            record_count,
            parse_time.as_secs_f64()
        ));

        let (mapped, mapping) = map_records(records, column_mapping(table), &columns);
        if !mapping.is_empty() {
            self.reporter.log(format!("  {}", mapping));
        }

        let start = Instant::now();
        let state = &mut self.state;
        let outcome = BatchInserter::new(&mut *self.db, self.batch_size).insert(
            table,
            mapped,
            &mut *self.reporter,
            |batch| {
                transition(
                    state,
                    RunState::Inserting {
                        table: table.into(),
                        batch,
                    },
                )
            },
        )?;
        let insert_time = start.elapsed();

        let mut line = format!(
            "  Inserted: {} records in {:.1}s",
            outcome.submitted,
            insert_time.as_secs_f64()
        );
        if outcome.skipped() > 0 {
            line.push_str(&format!(" ({} already present)", outcome.skipped()));
        }
        self.reporter.log(line);

        transition(&mut self.state, RunState::Committed { table: table.into() })?;
        Ok(FileOutcome {
            table,
            source_file: spec.source_file,
            status: FileStatus::Loaded {
                records: record_count,
                outcome,
                mapping,
                parse_time,
                insert_time,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> String {
        name.to_string()
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut state = RunState::NotStarted;
        for next in [
            RunState::Introspecting { table: table("isps") },
            RunState::Filtering { table: table("isps") },
            RunState::Inserting { table: table("isps"), batch: 1 },
            RunState::Inserting { table: table("isps"), batch: 2 },
            RunState::Committed { table: table("isps") },
            RunState::Skipped { table: table("pops") },
            RunState::Done,
        ] {
            transition(&mut state, next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut state = RunState::Inserting { table: table("isps"), batch: 2 };
        transition(&mut state, RunState::Failed { table: table("isps") }).unwrap();

        let err = transition(&mut state, RunState::Introspecting { table: table("pops") });
        assert!(matches!(err, Err(LoadError::IllegalTransition { .. })));
        assert!(transition(&mut state, RunState::Done).is_err());
    }

    #[test]
    fn test_batches_must_be_consecutive() {
        let mut state = RunState::Filtering { table: table("isps") };
        assert!(transition(&mut state.clone(), RunState::Inserting { table: table("isps"), batch: 2 }).is_err());

        transition(&mut state, RunState::Inserting { table: table("isps"), batch: 1 }).unwrap();
        assert!(transition(&mut state.clone(), RunState::Inserting { table: table("isps"), batch: 3 }).is_err());
        assert!(transition(&mut state, RunState::Committed { table: table("pops") }).is_err());
    }

    #[test]
    fn test_state_display() {
        let state = RunState::Inserting { table: table("ts_qos_measurements"), batch: 4 };
        assert_eq!(state.to_string(), "INSERTING(ts_qos_measurements, 4)");
    }
}
