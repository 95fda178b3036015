use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::error::{MoniError, Result};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL,
    category_id INTEGER NOT NULL,
    amount REAL NOT NULL,
    date TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    Connection::open(db_path)
        .and_then(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
            Ok(conn)
        })
        .map_err(|e| MoniError::StorageUnavailable(format!("{}: {e}", db_path.display())))
}

/// Create tables if missing and seed `categories` when the table is empty.
pub fn init_db(conn: &Connection, seed_categories: &[String]) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for name in seed_categories {
            conn.execute(
                "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
                [name],
            )?;
        }
        info!(seeded = seed_categories.len(), "Seeded categories");
    }
    Ok(())
}
