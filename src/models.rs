use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A candidate or committed ledger row.
///
/// `id` is only set once the ledger has written the row. Until then
/// `category_name` is the working value; after commit the stored
/// `category_id` is authoritative and the name is read back through a join.
/// The serde shape matches the JSON objects the extraction service returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(skip)]
    pub id: Option<i64>,
    pub description: String,
    #[serde(rename = "category", default)]
    pub category_name: String,
    pub amount: f64,
    pub date: String,
}

impl Transaction {
    pub fn candidate(description: &str, category_name: &str, amount: f64, date: &str) -> Self {
        Self {
            id: None,
            description: description.to_string(),
            category_name: category_name.to_string(),
            amount,
            date: date.to_string(),
        }
    }
}
