use comfy_table::{Cell, Table};

use crate::categories;
use crate::cli::open_db;
use crate::error::Result;
use crate::settings::load_settings;

pub fn add(name: &str) -> Result<()> {
    let conn = open_db(&load_settings())?;
    let id = categories::insert(&conn, name)?;
    println!("Added category: {} (id {id})", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db(&load_settings())?;
    let categories = categories::list_all(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for cat in categories {
        table.add_row(vec![Cell::new(cat.id), Cell::new(cat.name)]);
    }
    println!("Categories\n{table}");
    Ok(())
}
