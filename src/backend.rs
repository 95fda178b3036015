use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::categories;
use crate::error::{MoniError, Result};
use crate::extractor::StatementExtractor;
use crate::files;
use crate::ledger;
use crate::models::Transaction;

pub const STATEMENT_EXTENSIONS: &[&str] = &[".pdf"];

/// Everything the import workflow needs from the outside world.
///
/// The live implementation talks to SQLite, the filesystem and the LLM;
/// tests substitute an in-memory fake.
pub trait ImportBackend: Send + Sync {
    /// Statement files available for import, relative to the statements folder.
    fn list_files(&self) -> Result<Vec<String>>;
    /// Known category names in directory order.
    fn category_names(&self) -> Result<Vec<String>>;
    fn resolve(&self, name: &str) -> Result<Option<i64>>;
    fn add_category(&self, name: &str) -> Result<i64>;
    fn extract(&self, file: &str, known_categories: &[String]) -> Result<Vec<Transaction>>;
    fn insert_batch(&self, transactions: &[Transaction]) -> Result<Vec<i64>>;
}

pub struct LiveBackend {
    conn: Arc<Mutex<Connection>>,
    extractor: Box<dyn StatementExtractor>,
    statements_dir: PathBuf,
}

impl LiveBackend {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        extractor: Box<dyn StatementExtractor>,
        statements_dir: PathBuf,
    ) -> Self {
        Self {
            conn,
            extractor,
            statements_dir,
        }
    }

    /// Storage handle shared with the read-only dashboard.
    pub fn shared_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }
}

pub fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| MoniError::StorageUnavailable("database handle poisoned".into()))
}

impl ImportBackend for LiveBackend {
    fn list_files(&self) -> Result<Vec<String>> {
        files::list_files(&self.statements_dir, STATEMENT_EXTENSIONS)
    }

    fn category_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        categories::names(&conn)
    }

    fn resolve(&self, name: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        categories::resolve(&conn, name)
    }

    fn add_category(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        categories::insert(&conn, name)
    }

    fn extract(&self, file: &str, known_categories: &[String]) -> Result<Vec<Transaction>> {
        self.extractor
            .extract(&self.statements_dir.join(file), known_categories)
    }

    fn insert_batch(&self, transactions: &[Transaction]) -> Result<Vec<i64>> {
        let mut conn = self.conn()?;
        ledger::insert_batch(&mut conn, transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use std::path::Path;

    struct CannedExtractor(Vec<Transaction>);

    impl StatementExtractor for CannedExtractor {
        fn extract(&self, file_path: &Path, _known: &[String]) -> Result<Vec<Transaction>> {
            if !file_path.exists() {
                return Err(MoniError::ExtractionFailed(format!("missing {}", file_path.display())));
            }
            Ok(self.0.clone())
        }
    }

    fn test_backend(canned: Vec<Transaction>) -> (tempfile::TempDir, LiveBackend) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn, &["Groceries".to_string(), "Salary".to_string()]).unwrap();
        let statements = dir.path().join("statements");
        std::fs::create_dir(&statements).unwrap();
        std::fs::write(statements.join("march.pdf"), b"%PDF").unwrap();
        let backend = LiveBackend::new(
            Arc::new(Mutex::new(conn)),
            Box::new(CannedExtractor(canned)),
            statements,
        );
        (dir, backend)
    }

    #[test]
    fn test_lists_statement_pdfs() {
        let (_dir, backend) = test_backend(vec![]);
        assert_eq!(backend.list_files().unwrap(), vec!["march.pdf"]);
    }

    #[test]
    fn test_extract_resolves_against_statements_dir() {
        let canned = vec![Transaction::candidate("MARKET", "Groceries", -5.0, "2025-03-01")];
        let (_dir, backend) = test_backend(canned.clone());
        let names = backend.category_names().unwrap();
        assert_eq!(backend.extract("march.pdf", &names).unwrap(), canned);
        assert!(backend.extract("april.pdf", &names).is_err());
    }

    #[test]
    fn test_insert_batch_through_backend() {
        let (_dir, backend) = test_backend(vec![]);
        let ids = backend
            .insert_batch(&[Transaction::candidate("MARKET", "Groceries", -5.0, "2025-03-01")])
            .unwrap();
        assert_eq!(ids.len(), 1);
        let conn = backend.shared_connection();
        let conn = lock(&conn).unwrap();
        assert_eq!(ledger::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_category_names_in_id_order() {
        let (_dir, backend) = test_backend(vec![]);
        backend.add_category("Dining").unwrap();
        assert_eq!(
            backend.category_names().unwrap(),
            vec!["Groceries", "Salary", "Dining"]
        );
        assert_eq!(backend.resolve("Unknown").unwrap(), None);
    }

    #[test]
    fn test_add_category_then_resolve() {
        let (_dir, backend) = test_backend(vec![]);
        let id = backend.add_category("Dining").unwrap();
        assert_eq!(backend.resolve("Dining").unwrap(), Some(id));
        assert!(matches!(
            backend.add_category("Dining"),
            Err(MoniError::DuplicateCategory(_))
        ));
    }
}
