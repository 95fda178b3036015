use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::backend::STATEMENT_EXTENSIONS;
use crate::categories;
use crate::dashboard::total_income_expense;
use crate::db::get_connection;
use crate::error::Result;
use crate::files::list_files;
use crate::fmt::money;
use crate::ledger;
use crate::settings::load_settings;

const RECENT_ROWS: usize = 5;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();
    let statements = settings.statements_path();

    println!("Data dir:    {}", settings.data_path().display());
    println!("Database:    {}", db_path.display());
    println!("Statements:  {}", statements.display());
    println!("Model:       {} at {}", settings.llm.model, settings.llm.base_url);
    println!(
        "API key:     {}",
        if settings.llm.resolved_api_key().is_some() { "set" } else { "(not set)" }
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `moni init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let category_count = categories::list_all(&conn)?.len();
    let transaction_count = ledger::count(&conn)?;
    let pending = list_files(&statements, STATEMENT_EXTENSIONS)
        .map(|f| f.len().to_string())
        .unwrap_or_else(|_| "(folder missing)".to_string());
    let totals = total_income_expense(&conn)?;

    println!();
    println!("Categories:    {category_count}");
    println!("Transactions:  {transaction_count}");
    println!("Statement PDFs: {pending}");
    println!();
    let net = if totals.net() < 0.0 {
        money(totals.net()).red()
    } else {
        money(totals.net()).green()
    };
    println!("Income:    {}", money(totals.income).green());
    println!("Expenses:  {}", money(totals.expense).red());
    println!("Net:       {}", net.bold());

    let rows = ledger::list_transactions(&conn)?;
    if !rows.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Date", "Description", "Category", "Amount"]);
        for t in rows.iter().rev().take(RECENT_ROWS) {
            table.add_row(vec![
                Cell::new(t.id.unwrap_or_default()),
                Cell::new(&t.date),
                Cell::new(&t.description),
                Cell::new(&t.category_name),
                Cell::new(money(t.amount)),
            ]);
        }
        println!();
        println!("Most recent\n{table}");
    }
    Ok(())
}
