use std::collections::{HashMap, HashSet};

use super::Database;
use crate::error::DbResult;

/// Destination columns per table, fetched on first use and kept for the run
#[derive(Debug, Default)]
pub struct SchemaCache {
    columns: HashMap<String, HashSet<String>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns of `table`, asking the database only the first time
    pub fn columns<D: Database + ?Sized>(
        &mut self,
        db: &mut D,
        table: &str,
    ) -> DbResult<&HashSet<String>> {
        if !self.columns.contains_key(table) {
            let fetched = db.table_columns(table)?;
            tracing::debug!(table, columns = fetched.len(), "introspected destination table");
            self.columns.insert(table.to_string(), fetched);
        }
        Ok(&self.columns[table])
    }

    pub fn is_cached(&self, table: &str) -> bool {
        self.columns.contains_key(table)
    }
}
