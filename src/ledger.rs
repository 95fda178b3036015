use rusqlite::Connection;
use tracing::{debug, info};

use crate::categories;
use crate::error::{MoniError, Result};
use crate::models::Transaction;

/// Write a whole batch inside one SQLite transaction.
///
/// Every `category_name` is resolved before any row is written. An unknown
/// name aborts with `UnknownCategory` and the transaction is rolled back on
/// drop, so a batch is either fully visible afterwards or not at all.
/// Returns the ledger ids in batch order.
pub fn insert_batch(conn: &mut Connection, transactions: &[Transaction]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;

    let mut category_ids = Vec::with_capacity(transactions.len());
    for t in transactions {
        match categories::resolve(&tx, &t.category_name)? {
            Some(id) => category_ids.push(id),
            None => {
                debug!(category = %t.category_name, "Batch rejected, unresolved category");
                return Err(MoniError::UnknownCategory(t.category_name.clone()));
            }
        }
    }

    let mut ids = Vec::with_capacity(transactions.len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO transactions (description, category_id, amount, date) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (t, category_id) in transactions.iter().zip(&category_ids) {
            stmt.execute(rusqlite::params![t.description, category_id, t.amount, t.date])?;
            ids.push(tx.last_insert_rowid());
        }
    }

    tx.commit()?;
    info!(count = ids.len(), "Committed transaction batch");
    Ok(ids)
}

/// Committed rows with their category names, oldest first.
pub fn list_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.description, c.name, t.amount, t.date \
         FROM transactions t JOIN categories c ON t.category_id = c.id \
         ORDER BY t.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Transaction {
                id: Some(row.get(0)?),
                description: row.get(1)?,
                category_name: row.get(2)?,
                amount: row.get(3)?,
                date: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?)
}
