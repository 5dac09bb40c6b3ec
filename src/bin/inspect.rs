//! TupleStore Inspector
//!
//! Dumps tables and pages persisted under a data directory.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use tuplestore::storage::{FileStore, PageStore};
use tuplestore::{Config, Database};

/// TupleStore inspector
#[derive(Parser, Debug)]
#[command(name = "tuplestore-inspect")]
#[command(about = "Inspect tables and pages of a TupleStore data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./tuplestore_data")]
    data_dir: PathBuf,

    /// TOML file to read the configuration from (overrides --data-dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List tables with their page and row counts
    Tables,

    /// Print every page of a table
    Pages {
        /// Table name
        table: String,
    },

    /// Print a single page image straight from its file
    Page {
        /// Table name
        table: String,

        /// Page identity
        page: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tuplestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to read config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Config::builder().data_dir(&args.data_dir).build(),
    };

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> tuplestore::Result<()> {
    match command {
        Commands::Tables => {
            let db = Database::open(config)?;
            for name in db.table_names() {
                let (pages, rows, capacity) =
                    db.with_table(&name, |t| (t.page_count(), t.len(), t.page_capacity()))?;
                println!("{}: {} pages, {} rows (capacity {})", name, pages, rows, capacity);
            }
        }
        Commands::Pages { table } => {
            let db = Database::open(config)?;
            db.with_table(&table, |t| {
                for page in t.pages() {
                    print!("{}", page);
                }
            })?;
        }
        Commands::Page { table, page } => {
            let store = FileStore::open(&config.data_dir, config.sync_writes)?;
            let image = store.load(&table, &page)?;
            print!("{}", image);
        }
    }
    Ok(())
}
