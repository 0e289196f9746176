mod command;
mod errors;
mod repl;
mod statement;
mod storage;

use std::fs::OpenOptions;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use storage::Table;

/// A single-file, single-table relational storage engine.
#[derive(Parser)]
#[command(name = "rowstore", version, about)]
struct Cli {
    /// Path to the database file.
    path: PathBuf,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if std::env::args().len() < 2 {
        eprintln!("Must supply a database filename.");
        std::process::exit(1);
    }
    let cli = Cli::parse();

    init_logging(&cli);

    let table = match Table::open(&cli.path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = repl::run(table) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_path = cli.path.with_extension("log");
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(log_file) => {
            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        Err(_) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
