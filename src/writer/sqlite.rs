use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

use geo::GeodesicArea;

use super::{
    build_insert_sql, quote_ident, rows_per_statement, BoundaryCoverage, BoundarySample, Database,
    RegionRow,
};
use crate::boundary::{Boundary, BoundaryUpdate, RawGeometry};
use crate::error::DbResult;
use crate::parser::SqlValue;

/// SQLITE_MAX_VARIABLE_NUMBER of the bundled library
const MAX_BIND_PARAMS: usize = 32766;

/// SQLite target for offline runs.
///
/// Documents and arrays are stored as JSON text, boundaries as GeoJSON text
/// and centroids as WKT.
pub struct SqliteDatabase {
    conn: Connection,
    label: String,
}

impl SqliteDatabase {
    /// Open (or create) a database file; existing rows are kept
    pub fn open(db_path: &Path) -> DbResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::configure(conn, format!("SQLite {:?}", db_path))
    }

    pub fn in_memory() -> DbResult<Self> {
        Self::configure(Connection::open_in_memory()?, "SQLite (memory)".to_string())
    }

    fn configure(conn: Connection, label: String) -> DbResult<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn, label })
    }

    /// Run raw SQL, e.g. DDL for a fresh database
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Single text value from a query, for inspection
    pub fn query_text(&self, sql: &str) -> DbResult<Option<String>> {
        Ok(self
            .conn
            .query_row(sql, [], |row| row.get::<_, Option<String>>(0))
            .optional()?
            .flatten())
    }
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(f)) => Value::Real(f),
            (None, None) => Value::Text(n.to_string()),
        },
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Document(v) => Value::Text(v.to_string()),
        SqlValue::Array(_) => Value::Text(value.to_json().to_string()),
    }
}

impl Database for SqliteDatabase {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn table_columns(&mut self, table: &str) -> DbResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(names)
    }

    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> DbResult<u64> {
        let qualified = quote_ident(table);
        // Dropping the transaction on error rolls it back
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        for chunk in rows.chunks(rows_per_statement(MAX_BIND_PARAMS, columns.len())) {
            let sql = build_insert_sql(&qualified, columns, chunk.len(), |n| format!("?{}", n));
            let mut stmt = tx.prepare_cached(&sql)?;
            let values = chunk.iter().flat_map(|row| row.iter().map(to_sqlite));
            inserted += stmt.execute(params_from_iter(values))? as u64;
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn region_rows(
        &mut self,
        table: &str,
        key_column: &str,
        name_column: &str,
    ) -> DbResult<Vec<RegionRow>> {
        let sql = format!(
            "SELECT CAST(id AS TEXT), CAST({} AS TEXT), CAST({} AS TEXT) FROM {}",
            quote_ident(key_column),
            quote_ident(name_column),
            quote_ident(table)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RegionRow {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn apply_boundaries(&mut self, table: &str, updates: &[BoundaryUpdate]) -> DbResult<u64> {
        let sql = format!(
            "UPDATE {} SET boundary = ?1, centroid = ?2 WHERE CAST(id AS TEXT) = ?3",
            quote_ident(table)
        );

        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for update in updates {
                let geojson = serde_json::to_string(&update.boundary.to_geojson())?;
                updated += stmt.execute(params![
                    geojson,
                    update.boundary.centroid_wkt(),
                    update.row_id
                ])? as u64;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    fn row_count(&mut self, table: &str) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn boundary_coverage(&mut self, table: &str) -> DbResult<BoundaryCoverage> {
        let sql = format!(
            "SELECT COUNT(*), COUNT(boundary), COUNT(centroid) FROM {}",
            quote_ident(table)
        );
        let coverage = self.conn.query_row(&sql, [], |row| {
            Ok(BoundaryCoverage {
                total: row.get::<_, i64>(0)? as u64,
                with_boundary: row.get::<_, i64>(1)? as u64,
                with_centroid: row.get::<_, i64>(2)? as u64,
            })
        })?;
        Ok(coverage)
    }

    fn boundary_samples(
        &mut self,
        table: &str,
        name_column: &str,
        limit: usize,
    ) -> DbResult<Vec<BoundarySample>> {
        let sql = format!(
            "SELECT CAST({name} AS TEXT), boundary FROM {} \
             WHERE boundary IS NOT NULL ORDER BY {name} LIMIT ?1",
            quote_ident(table),
            name = quote_ident(name_column)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut samples = Vec::new();
        for (name, geojson) in rows {
            let raw: RawGeometry = serde_json::from_str(&geojson)?;
            // Shapes were validated on write
            let Ok(boundary) = Boundary::from_geometry(Some(&raw)) else {
                tracing::warn!(table, ?name, "stored boundary no longer validates");
                continue;
            };
            samples.push(BoundarySample {
                name: name.unwrap_or_default(),
                area_km2: boundary.shape.geodesic_area_unsigned() / 1e6,
                lat: boundary.centroid.y(),
                lon: boundary.centroid.x(),
            });
        }
        Ok(samples)
    }
}
