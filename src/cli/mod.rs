pub mod app;
pub mod categories;
pub mod dashboard;
pub mod import;
pub mod init;
pub mod status;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::Settings;

/// Open the configured database, creating the data folder and schema if needed.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    std::fs::create_dir_all(settings.data_path())?;
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn, &settings.categories)?;
    Ok(conn)
}

#[derive(Parser)]
#[command(
    name = "moni",
    version,
    about = "Import bank statements and payslips into a personal ledger."
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up moni: choose a data directory and initialize the database.
    Init {
        /// Path for moni data (default: ~/Documents/moni)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Extract transactions from a statement PDF and add them to the ledger.
    /// Every proposed category must already exist.
    Import {
        /// Path to the statement PDF
        file: String,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a new category.
    Add {
        /// Category name (case-sensitive)
        name: String,
    },
    /// List categories.
    List,
}
