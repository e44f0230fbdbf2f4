pub mod inserter;
pub mod introspect;
pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresDatabase;
pub use self::sqlite::SqliteDatabase;
pub use inserter::*;
pub use introspect::*;

use std::collections::HashSet;

use crate::boundary::BoundaryUpdate;
use crate::error::DbResult;
use crate::parser::SqlValue;

/// One administrative-region row as seen by the boundary matcher
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    /// Primary key, rendered as text
    pub id: String,
    pub key: Option<String>,
    pub name: Option<String>,
}

/// How many rows of a region table carry shapes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundaryCoverage {
    pub total: u64,
    pub with_boundary: u64,
    pub with_centroid: u64,
}

/// One shaped row for the verification printout
#[derive(Debug, Clone, PartialEq)]
pub struct BoundarySample {
    pub name: String,
    /// Geodesic area
    pub area_km2: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Storage the loader writes into.
///
/// Every method runs on the single connection the backend owns; nothing is
/// shared between calls except committed rows.
pub trait Database {
    /// Human-readable target, without credentials
    fn describe(&self) -> String;

    /// Columns currently defined on `table`; empty when the table is missing
    fn table_columns(&mut self, table: &str) -> DbResult<HashSet<String>>;

    /// Insert `rows` in one transaction, skipping rows that hit a unique
    /// constraint. Commits on success and rolls back on any error.
    ///
    /// Returns the number of rows actually inserted.
    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> DbResult<u64>;

    /// `(id, key_column, name_column)` for every row of a region table
    fn region_rows(
        &mut self,
        table: &str,
        key_column: &str,
        name_column: &str,
    ) -> DbResult<Vec<RegionRow>>;

    /// Write boundary and centroid onto rows by primary key, in one transaction
    fn apply_boundaries(&mut self, table: &str, updates: &[BoundaryUpdate]) -> DbResult<u64>;

    fn row_count(&mut self, table: &str) -> DbResult<u64>;

    fn boundary_coverage(&mut self, table: &str) -> DbResult<BoundaryCoverage>;

    /// Up to `limit` rows that have a boundary, ordered by name
    fn boundary_samples(
        &mut self,
        table: &str,
        name_column: &str,
        limit: usize,
    ) -> DbResult<Vec<BoundarySample>>;
}

/// Double-quote an SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Multi-row `INSERT ... ON CONFLICT DO NOTHING` for `row_count` rows.
///
/// `placeholder` renders the n-th (1-based) bind parameter.
pub fn build_insert_sql(
    qualified_table: &str,
    columns: &[String],
    row_count: usize,
    placeholder: impl Fn(usize) -> String,
) -> String {
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();

    let mut param = 0;
    let tuples: Vec<String> = (0..row_count)
        .map(|_| {
            let values: Vec<String> = columns
                .iter()
                .map(|_| {
                    param += 1;
                    placeholder(param)
                })
                .collect();
            format!("({})", values.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT DO NOTHING",
        qualified_table,
        column_list.join(", "),
        tuples.join(", ")
    )
}

/// Rows per statement that keep the statement under `max_params` binds
pub fn rows_per_statement(max_params: usize, column_count: usize) -> usize {
    (max_params / column_count.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_insert_sql() {
        let columns = vec!["id".to_string(), "name_en".to_string()];
        let sql = build_insert_sql("\"geo_divisions\"", &columns, 2, |n| format!("${}", n));

        assert_eq!(
            sql,
            "INSERT INTO \"geo_divisions\" (\"id\", \"name_en\") VALUES ($1, $2), ($3, $4) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_rows_per_statement() {
        assert_eq!(rows_per_statement(65535, 20), 3276);
        assert_eq!(rows_per_statement(10, 50), 1);
    }
}
