use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::writer::DEFAULT_BATCH_SIZE;

#[derive(Parser, Debug)]
#[command(name = "qos-poc-loader")]
#[command(version, about = "Load QoS POC fixtures and boundaries into PostgreSQL")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the JSON fixtures in foreign-key order
    Load {
        /// Fixture directory (defaults to DATA_DIR, then poc_data_v2.8)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Records per committed batch
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Only load these tables and their FK parents (comma-separated)
        #[arg(short, long, value_delimiter = ',', conflicts_with = "exclude")]
        include: Option<Vec<String>>,

        /// Skip these tables and everything depending on them (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,

        /// Write into a SQLite file instead of PostgreSQL
        #[arg(long)]
        sqlite: Option<PathBuf>,
    },

    /// Attach division and district boundaries to loaded regions
    Boundaries {
        /// Directory with the boundary GeoJSON files
        #[arg(short, long)]
        geodata_dir: Option<PathBuf>,

        /// Download missing boundary files first
        #[arg(long)]
        fetch: bool,

        /// With --fetch, re-download even if cached
        #[arg(short, long)]
        force: bool,

        /// Write into a SQLite file instead of PostgreSQL
        #[arg(long)]
        sqlite: Option<PathBuf>,
    },

    /// List the load sequence
    ListTables,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
