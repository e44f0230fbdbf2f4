use anyhow::{Context, Result};
use qos_poc_loader::{
    boundary::{check_files, load_boundaries, verify_coverage, BOUNDARY_PASSES},
    cli::{Cli, Commands},
    config::{data_dir_from_env, geodata_dir_from_env, DbConfig},
    download::{ensure_boundaries, GeodataCache},
    filter::resolve_specs,
    loader::{LoadSummary, Loader},
    schema::LOAD_SEQUENCE,
    ui::{ConsoleReporter, Reporter},
    writer::{Database, PostgresDatabase, SqliteDatabase},
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const RULE: &str = "============================================================";

fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    let mut reporter = ConsoleReporter::new();

    match cli.command {
        Commands::Load {
            data_dir,
            batch_size,
            include,
            exclude,
            sqlite,
        } => {
            let data_dir = data_dir.unwrap_or_else(data_dir_from_env);
            let specs = resolve_specs(include, exclude, &mut reporter)?;

            reporter.log(RULE);
            reporter.log("BTRC QoS POC Data Loader");
            reporter.log(RULE);

            let mut db = open_database(sqlite)?;
            reporter.log(format!("\nConnected to {}\n", db.describe()));

            let summary = Loader::new(db.as_mut(), &mut reporter, &data_dir)
                .with_batch_size(batch_size)
                .run(&specs);
            print_summary(&summary, &mut reporter);

            if let Some(failure) = summary.failure {
                return Err(failure.error)
                    .with_context(|| format!("Loading {} failed", failure.source_file));
            }
        }

        Commands::Boundaries {
            geodata_dir,
            fetch,
            force,
            sqlite,
        } => {
            let cache = GeodataCache::new(geodata_dir.or_else(geodata_dir_from_env))?;
            if fetch {
                ensure_boundaries(&cache, force, &mut reporter)?;
            }
            check_files(cache.dir())?;

            let mut db = open_database(sqlite)?;
            let mut updated = Vec::new();
            for pass in BOUNDARY_PASSES {
                let report = load_boundaries(db.as_mut(), pass, cache.dir(), &mut reporter)?;
                updated.push(format!("{} {}s", report.matched.len(), pass.label.to_lowercase()));
            }
            verify_coverage(db.as_mut(), &mut reporter)?;

            reporter.log(format!("\nDone: {} updated.", updated.join(" + ")));
        }

        Commands::ListTables => {
            println!("Load sequence:\n");
            for spec in LOAD_SEQUENCE {
                println!("  {:<28} {}", spec.table, spec.source_file);
            }
        }
    }

    Ok(())
}

fn open_database(sqlite: Option<PathBuf>) -> Result<Box<dyn Database>> {
    match sqlite {
        Some(path) => {
            let db = SqliteDatabase::open(&path)
                .with_context(|| format!("Failed to open {:?}", path))?;
            Ok(Box::new(db))
        }
        None => {
            let config = DbConfig::from_env()?;
            let db = PostgresDatabase::connect(&config)
                .with_context(|| format!("Failed to connect to {}", config.describe()))?;
            Ok(Box::new(db))
        }
    }
}

fn print_summary(summary: &LoadSummary, reporter: &mut impl Reporter) {
    reporter.log(format!("\n{}", RULE));
    reporter.log(format!("TOTAL RECORDS LOADED: {}", summary.total_records));
    let skipped = summary.total_records.saturating_sub(summary.total_inserted);
    if skipped > 0 {
        reporter.log(format!("  ({} already present, {} new)", skipped, summary.total_inserted));
    }
    let missing = summary.skipped_files();
    if !missing.is_empty() {
        reporter.log(format!("SKIPPED FILES: {}", missing.len()));
    }
    reporter.log(format!("TOTAL TIME: {:.1}s", summary.elapsed.as_secs_f64()));
    reporter.log(RULE);

    if summary.failure.is_some() {
        reporter.warn("load stopped early; later tables were not attempted");
    }
}
