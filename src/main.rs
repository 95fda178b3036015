mod backend;
mod categories;
mod cli;
mod dashboard;
mod db;
mod dispatcher;
mod error;
mod extractor;
mod files;
mod fmt;
mod ledger;
mod models;
mod settings;
mod tui;
mod workflow;

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt as log_fmt, prelude::*, EnvFilter};

use cli::{CategoriesCommands, Cli, Commands};
use error::Result;
use settings::{load_settings, Settings};

/// RUST_LOG wins, then --verbose, then info. The interactive app owns the
/// terminal, so it logs to `<data_dir>/moni.log` instead of stderr.
fn init_logging(verbose: bool, interactive: Option<&Settings>) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    match interactive {
        Some(settings) => {
            std::fs::create_dir_all(settings.data_path())?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(settings.log_path())?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    log_fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(false),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    log_fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .compact(),
                )
                .init();
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => {
            let settings = load_settings();
            init_logging(cli.verbose, Some(&settings))?;
            cli::app::run(&settings)
        }
        Some(command) => {
            init_logging(cli.verbose, None)?;
            match command {
                Commands::Init { data_dir } => cli::init::run(data_dir),
                Commands::Categories { command } => match command {
                    CategoriesCommands::Add { name } => cli::categories::add(&name),
                    CategoriesCommands::List => cli::categories::list(),
                },
                Commands::Import { file } => cli::import::run(&file),
                Commands::Status => cli::status::run(),
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
