pub mod commands;
pub mod error;
pub mod models;

use clap::{Parser, Subcommand};
use commands::{
    db::{open_store, open_store_read_only},
    fetcher::GithubClient,
    report::render_report,
    settings::{load_config, LedgerConfig, DEFAULT_CONFIG_PATH},
    sync::{sync_entities, SyncSummary},
};
use error::Result;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "traffic-ledger",
    version,
    about = "Persist GitHub traffic and repo counters into SQLite"
)]
pub struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override the SQLite database path from the config
    #[arg(long)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch every configured repository, store the results, print the report
    Sync,
    /// Print the report from an existing database without fetching or writing
    Report,
}

/// Returns `Ok(true)` when every entity synced (or nothing needed syncing).
pub fn run(cli: Cli) -> Result<bool> {
    match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => {
            let mut config = load_config(&cli.config)?;
            if let Some(database) = cli.database {
                config.database_path = database;
            }

            let summary = run_sync(&config)?;
            print_report(&config)?;
            Ok(!summary.has_failures())
        }
        Command::Report => {
            // The report only needs a database path; the config file is optional here.
            let mut config = if cli.config.exists() {
                load_config(&cli.config)?
            } else {
                LedgerConfig::default()
            };
            if let Some(database) = cli.database {
                config.database_path = database;
            }

            print_report(&config)?;
            Ok(true)
        }
    }
}

/// Validates the config, then fetches and stores every tracked entity.
pub fn run_sync(config: &LedgerConfig) -> Result<SyncSummary> {
    config.require_sync_ready()?;

    let entities = config.tracked_entities();
    log::info!(
        "syncing {} repositories into {}",
        entities.len(),
        config.database_path.display()
    );

    let conn = open_store(&config.database_path)?;
    let client = GithubClient::new(config.client_config())?;

    Ok(sync_entities(&conn, &client, &entities, |progress| {
        log::info!(
            "[{}/{}] Processing {}...",
            progress.current,
            progress.total,
            progress.entity
        );
    }))
}

fn print_report(config: &LedgerConfig) -> Result<()> {
    let conn = open_store_read_only(&config.database_path)?;
    let report = render_report(&conn, Some(&config.database_path))?;
    print!("{report}");
    Ok(())
}
