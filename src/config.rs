//! Environment configuration.
//!
//! Connection settings come from `DB_*` variables (a `.env` file is loaded
//! by `main` first); every variable has a default so a stock local
//! database works with no setup.

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "poc_data_v2.8";

/// Database connection settings
#[derive(Clone, PartialEq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Schema the fixture tables live in
    pub schema: String,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .field("schema", &self.schema)
            .finish()
    }
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any variable source; unset keys take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("DB_PORT", "5433");
        let port = port
            .trim()
            .parse()
            .with_context(|| format!("Invalid DB_PORT {:?}", port))?;

        Ok(Self {
            host: var("DB_HOST", "localhost"),
            port,
            dbname: var("DB_NAME", "btrc_qos_poc"),
            user: var("DB_USER", "btrc_admin"),
            password: var("DB_PASSWORD", "btrc_poc_2026"),
            schema: var("DB_SCHEMA", "public"),
        })
    }

    pub fn to_pg_config(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .application_name(env!("CARGO_PKG_NAME"));
        config
    }

    /// Target description without the password
    pub fn describe(&self) -> String {
        format!(
            "PostgreSQL {}@{}:{}/{} (schema {})",
            self.user, self.host, self.port, self.dbname, self.schema
        )
    }
}

/// Fixture directory from `DATA_DIR`
pub fn data_dir_from_env() -> PathBuf {
    env::var_os("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Boundary directory from `GEODATA_DIR`, if set
pub fn geodata_dir_from_env() -> Option<PathBuf> {
    env::var_os("GEODATA_DIR").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5433);
        assert_eq!(config.dbname, "btrc_qos_poc");
        assert_eq!(config.user, "btrc_admin");
        assert_eq!(config.schema, "public");
    }

    #[test]
    fn test_overrides() {
        let config =
            DbConfig::from_lookup(lookup(&[("DB_HOST", "db.internal"), ("DB_PORT", "5432")])).unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
    }

    #[test]
    fn test_invalid_port() {
        let err = DbConfig::from_lookup(lookup(&[("DB_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_password_is_hidden() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();

        assert!(!format!("{:?}", config).contains("btrc_poc_2026"));
        assert!(!config.describe().contains("btrc_poc_2026"));
    }
}
