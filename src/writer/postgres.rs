//! PostgreSQL / PostGIS target.
//!
//! Values travel as text-format parameters so the server's own input
//! functions parse them, exactly as if they had been written as literals:
//! numbers and dates for scalar columns, `{...}` literals for array columns
//! and JSON text for `jsonb` columns.

use bytes::BytesMut;
use postgres::types::{to_sql_checked, Format, IsNull, ToSql, Type};
use postgres::{Client, NoTls, Transaction};
use std::collections::HashSet;
use std::error::Error;

use super::{
    build_insert_sql, quote_ident, rows_per_statement, BoundaryCoverage, BoundarySample, Database,
    RegionRow,
};
use crate::boundary::{BoundaryUpdate, SRID};
use crate::config::DbConfig;
use crate::error::DbResult;
use crate::parser::SqlValue;

/// Bind parameter limit of the extended query protocol
const MAX_BIND_PARAMS: usize = 65535;

/// A parameter sent in text format; `None` is SQL NULL
#[derive(Debug)]
struct PgText(Option<String>);

impl ToSql for PgText {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match &self.0 {
            Some(text) => {
                out.extend_from_slice(text.as_bytes());
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

pub struct PostgresDatabase {
    client: Client,
    schema: String,
    label: String,
}

impl PostgresDatabase {
    pub fn connect(config: &DbConfig) -> DbResult<Self> {
        let client = config.to_pg_config().connect(NoTls)?;
        Ok(Self {
            client,
            schema: config.schema.clone(),
            label: config.describe(),
        })
    }

    /// Run raw SQL, e.g. DDL for a scratch schema
    pub fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }
}

fn insert_chunks(
    tx: &mut Transaction<'_>,
    table: &str,
    columns: &[String],
    rows: &[Vec<SqlValue>],
) -> Result<u64, postgres::Error> {
    let mut inserted = 0;

    for chunk in rows.chunks(rows_per_statement(MAX_BIND_PARAMS, columns.len())) {
        let sql = build_insert_sql(table, columns, chunk.len(), |n| format!("${}", n));
        let params: Vec<PgText> = chunk
            .iter()
            .flat_map(|row| row.iter().map(|value| PgText(value.to_pg_text())))
            .collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        inserted += tx.execute(sql.as_str(), &refs)?;
    }

    Ok(inserted)
}

impl Database for PostgresDatabase {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn table_columns(&mut self, table: &str) -> DbResult<HashSet<String>> {
        let rows = self.client.query(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema::text = $1 AND table_name::text = $2",
            &[&self.schema, &table],
        )?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> DbResult<u64> {
        let qualified = self.qualified(table);
        let mut tx = self.client.transaction()?;

        match insert_chunks(&mut tx, &qualified, columns, rows) {
            Ok(inserted) => {
                tx.commit()?;
                Ok(inserted)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(table, error = %rollback, "rollback failed");
                }
                Err(err.into())
            }
        }
    }

    fn region_rows(
        &mut self,
        table: &str,
        key_column: &str,
        name_column: &str,
    ) -> DbResult<Vec<RegionRow>> {
        let sql = format!(
            "SELECT id::text, {}::text, {}::text FROM {}",
            quote_ident(key_column),
            quote_ident(name_column),
            self.qualified(table)
        );
        let rows = self.client.query(sql.as_str(), &[])?;
        Ok(rows
            .iter()
            .map(|row| RegionRow {
                id: row.get(0),
                key: row.get(1),
                name: row.get(2),
            })
            .collect())
    }

    fn apply_boundaries(&mut self, table: &str, updates: &[BoundaryUpdate]) -> DbResult<u64> {
        let sql = format!(
            "UPDATE {} \
             SET boundary = ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($1::text), {srid})), \
                 centroid = ST_SetSRID(ST_MakePoint($2::float8, $3::float8), {srid}) \
             WHERE id::text = $4::text",
            self.qualified(table),
            srid = SRID
        );

        let mut tx = self.client.transaction()?;
        let stmt = tx.prepare(&sql)?;
        let mut updated = 0;

        for update in updates {
            let geojson = serde_json::to_string(&update.boundary.to_geojson())?;
            let centroid = update.boundary.centroid;
            updated += tx.execute(
                &stmt,
                &[&geojson, &centroid.x(), &centroid.y(), &update.row_id],
            )?;
        }

        tx.commit()?;
        Ok(updated)
    }

    fn row_count(&mut self, table: &str) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.qualified(table));
        let count: i64 = self.client.query_one(sql.as_str(), &[])?.get(0);
        Ok(count as u64)
    }

    fn boundary_coverage(&mut self, table: &str) -> DbResult<BoundaryCoverage> {
        let sql = format!(
            "SELECT COUNT(*), COUNT(boundary), COUNT(centroid) FROM {}",
            self.qualified(table)
        );
        let row = self.client.query_one(sql.as_str(), &[])?;
        Ok(BoundaryCoverage {
            total: row.get::<_, i64>(0) as u64,
            with_boundary: row.get::<_, i64>(1) as u64,
            with_centroid: row.get::<_, i64>(2) as u64,
        })
    }

    fn boundary_samples(
        &mut self,
        table: &str,
        name_column: &str,
        limit: usize,
    ) -> DbResult<Vec<BoundarySample>> {
        let sql = format!(
            "SELECT {name}::text, ST_Area(boundary::geography) / 1e6, ST_Y(centroid), ST_X(centroid) \
             FROM {} WHERE boundary IS NOT NULL ORDER BY {name} LIMIT $1",
            self.qualified(table),
            name = quote_ident(name_column)
        );
        let rows = self.client.query(sql.as_str(), &[&(limit as i64)])?;
        Ok(rows
            .iter()
            .map(|row| BoundarySample {
                name: row.get::<_, Option<String>>(0).unwrap_or_default(),
                area_km2: row.get(1),
                lat: row.get::<_, Option<f64>>(2).unwrap_or(f64::NAN),
                lon: row.get::<_, Option<f64>>(3).unwrap_or(f64::NAN),
            })
            .collect())
    }
}
