use std::collections::HashSet;

use super::Database;
use crate::error::LoadError;
use crate::parser::{Record, SqlValue};
use crate::ui::Reporter;

pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Records submitted and rows that actually landed
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct InsertOutcome {
    pub submitted: u64,
    pub inserted: u64,
    pub batches: usize,
}

impl InsertOutcome {
    /// Rows skipped because they already existed
    pub fn skipped(&self) -> u64 {
        self.submitted.saturating_sub(self.inserted)
    }
}

/// Union of record keys, in first-seen order
pub fn insert_columns(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    columns
}

/// Splits records into bounded batches, each committed on its own.
///
/// A failure in batch N leaves batches 1..N-1 committed and nothing of
/// batch N.
pub struct BatchInserter<'a, D: Database + ?Sized> {
    db: &'a mut D,
    batch_size: usize,
}

impl<'a, D: Database + ?Sized> BatchInserter<'a, D> {
    pub fn new(db: &'a mut D, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
        }
    }

    /// Insert all records into `table`.
    ///
    /// `on_batch` is called with the 1-based batch number before each
    /// batch is sent.
    pub fn insert<R, F>(
        &mut self,
        table: &str,
        records: Vec<Record>,
        reporter: &mut R,
        mut on_batch: F,
    ) -> Result<InsertOutcome, LoadError>
    where
        R: Reporter,
        F: FnMut(usize) -> Result<(), LoadError>,
    {
        let mut outcome = InsertOutcome::default();
        let columns = insert_columns(&records);
        if records.is_empty() || columns.is_empty() {
            return Ok(outcome);
        }

        let total = records.len() as u64;
        let mut pending = records.into_iter();

        loop {
            let rows: Vec<Vec<SqlValue>> = pending
                .by_ref()
                .take(self.batch_size)
                .map(|mut record| {
                    columns
                        .iter()
                        .map(|column| {
                            record
                                .remove(column)
                                .map(SqlValue::from_json)
                                .unwrap_or(SqlValue::Null)
                        })
                        .collect()
                })
                .collect();

            if rows.is_empty() {
                break;
            }

            let batch = outcome.batches + 1;
            on_batch(batch)?;

            let inserted = match self.db.insert_batch(table, &columns, &rows) {
                Ok(inserted) => inserted,
                Err(source) => {
                    reporter.clear_progress();
                    return Err(LoadError::Batch {
                        table: table.to_string(),
                        batch,
                        source,
                    });
                }
            };

            tracing::debug!(table, batch, rows = rows.len(), inserted, "batch committed");
            outcome.batches = batch;
            outcome.submitted += rows.len() as u64;
            outcome.inserted += inserted;
            reporter.set_progress(outcome.submitted, total, table);
        }

        reporter.clear_progress();
        Ok(outcome)
    }
}
