use std::sync::{Arc, Mutex};

use colored::Colorize;
use comfy_table::{Cell, Table};
use tracing::info;

use crate::backend::{ImportBackend, LiveBackend};
use crate::cli::open_db;
use crate::error::{MoniError, Result};
use crate::extractor::LlmExtractor;
use crate::fmt::money;
use crate::models::Transaction;
use crate::settings::{load_settings, shellexpand_path};

pub fn run(file: &str) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let backend = LiveBackend::new(
        Arc::new(Mutex::new(conn)),
        Box::new(LlmExtractor::from_settings(&settings)),
        settings.statements_path(),
    );

    let path = shellexpand_path(file);
    println!("Parsing statement...");
    let batch = extract_known(&backend, &path)?;
    print_batch(&batch);

    let ids = backend.insert_batch(&batch)?;
    println!("{}", format!("Successfully added {} transactions!", ids.len()).green());
    Ok(())
}

/// Extract a statement and insist every proposed category already exists.
/// There is no one to ask, so unknown names fail the whole import.
pub fn extract_known(backend: &dyn ImportBackend, file: &str) -> Result<Vec<Transaction>> {
    let known = backend.category_names()?;
    let batch = backend.extract(file, &known)?;
    if batch.is_empty() {
        return Err(MoniError::ExtractionFailed("no transactions found".into()));
    }

    let mut unknown: Vec<&str> = Vec::new();
    for t in &batch {
        if backend.resolve(&t.category_name)?.is_none() && !unknown.contains(&t.category_name.as_str()) {
            unknown.push(&t.category_name);
        }
    }
    if !unknown.is_empty() {
        let names: Vec<String> = unknown.iter().map(|n| format!("{n:?}")).collect();
        return Err(MoniError::UnknownCategory(format!(
            "{} (use `moni categories add` or the interactive import)",
            names.join(", ")
        )));
    }
    info!(file, count = batch.len(), "Statement ready to import");
    Ok(batch)
}

fn print_batch(batch: &[Transaction]) {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Category", "Amount"]);
    for t in batch {
        table.add_row(vec![
            Cell::new(&t.date),
            Cell::new(&t.description),
            Cell::new(&t.category_name),
            Cell::new(if t.amount < 0.0 {
                money(t.amount).red().to_string()
            } else {
                money(t.amount).green().to_string()
            }),
        ]);
    }
    println!("{table}");
}
