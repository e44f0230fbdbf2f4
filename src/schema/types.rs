use std::collections::HashSet;

/// One load step: a fixture file and the table it fills.
#[derive(Debug, Clone)]
pub struct LoadSpec {
    /// Path relative to the data directory
    pub source_file: &'static str,
    pub table: &'static str,
    /// Tables this table holds foreign keys into
    pub depends_on: &'static [&'static str],
}

impl LoadSpec {
    pub const fn new(
        source_file: &'static str,
        table: &'static str,
        depends_on: &'static [&'static str],
    ) -> Self {
        Self {
            source_file,
            table,
            depends_on,
        }
    }

    /// FK parents, excluding self-references
    pub fn dependencies(&self) -> HashSet<&'static str> {
        self.depends_on
            .iter()
            .copied()
            .filter(|dep| *dep != self.table)
            .collect()
    }
}

/// Source field -> destination column renames for one table
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub table: &'static str,
    pub renames: &'static [(&'static str, &'static str)],
}

impl ColumnMapping {
    pub const fn new(table: &'static str, renames: &'static [(&'static str, &'static str)]) -> Self {
        Self { table, renames }
    }

    /// Destination name for a source field (identity when not renamed)
    pub fn destination<'a>(&self, field: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(from, _)| *from == field)
            .map(|(_, to)| *to)
            .unwrap_or(field)
    }
}

/// Identity mapping for tables without overrides
pub static IDENTITY: ColumnMapping = ColumnMapping::new("", &[]);
