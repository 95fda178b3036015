use rusqlite::Connection;

use crate::error::Result;

/// Income is the sum of positive amounts, expense the sum of negative ones
/// (so expense is reported as a negative number).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncomeExpense {
    pub income: f64,
    pub expense: f64,
}

impl IncomeExpense {
    pub fn net(&self) -> f64 {
        self.income + self.expense
    }
}

const SUMS: &str = "SELECT \
     COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0), \
     COALESCE(SUM(CASE WHEN amount < 0 THEN amount ELSE 0 END), 0) \
     FROM transactions";

pub fn total_income_expense(conn: &Connection) -> Result<IncomeExpense> {
    let row = conn.query_row(SUMS, [], |row| {
        Ok(IncomeExpense {
            income: row.get(0)?,
            expense: row.get(1)?,
        })
    })?;
    Ok(row)
}

pub fn monthly_income_expense(conn: &Connection, year: i32, month: u32) -> Result<IncomeExpense> {
    let prefix = format!("{year:04}-{month:02}%");
    let sql = format!("{SUMS} WHERE date LIKE ?1");
    let row = conn.query_row(&sql, [prefix], |row| {
        Ok(IncomeExpense {
            income: row.get(0)?,
            expense: row.get(1)?,
        })
    })?;
    Ok(row)
}
