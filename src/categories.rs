use rusqlite::{Connection, OptionalExtension};

use crate::error::{MoniError, Result};
use crate::models::Category;

/// Exact, case-sensitive lookup of a category id by name.
pub fn resolve(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}

/// Add a new category and return its id.
pub fn insert(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MoniError::Other("Name is required".into()));
    }
    if resolve(conn, name)?.is_some() {
        return Err(MoniError::DuplicateCategory(name.to_string()));
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

/// All categories in id order, which is stable for the life of the database.
pub fn list_all(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn names(conn: &Connection) -> Result<Vec<String>> {
    Ok(list_all(conn)?.into_iter().map(|c| c.name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn, &["Groceries".to_string(), "Rent".to_string()]).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_resolve_known_name() {
        let (_dir, conn) = test_db();
        assert!(resolve(&conn, "Groceries").unwrap().is_some());
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let (_dir, conn) = test_db();
        assert_eq!(resolve(&conn, "groceries").unwrap(), None);
        assert_eq!(resolve(&conn, "Grocer").unwrap(), None);
    }

    #[test]
    fn test_resolve_twice_returns_same_id() {
        let (_dir, conn) = test_db();
        let first = resolve(&conn, "Rent").unwrap();
        let second = resolve(&conn, "Rent").unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_insert_and_resolve() {
        let (_dir, conn) = test_db();
        let id = insert(&conn, "Dining").unwrap();
        assert_eq!(resolve(&conn, "Dining").unwrap(), Some(id));
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let (_dir, conn) = test_db();
        let err = insert(&conn, "Rent").unwrap_err();
        assert!(matches!(err, MoniError::DuplicateCategory(ref n) if n == "Rent"));
    }

    #[test]
    fn test_insert_empty_name_rejected() {
        let (_dir, conn) = test_db();
        let err = insert(&conn, "   ").unwrap_err();
        assert!(err.to_string().contains("Name is required"));
    }

    #[test]
    fn test_list_all_in_insertion_order() {
        let (_dir, conn) = test_db();
        insert(&conn, "Dining").unwrap();
        let names = names(&conn).unwrap();
        assert_eq!(names, vec!["Groceries", "Rent", "Dining"]);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let (_dir, conn) = test_db();
        let id = insert(&conn, "Temp").unwrap();
        conn.execute("DELETE FROM categories WHERE id = ?1", [id]).unwrap();
        let next = insert(&conn, "Other").unwrap();
        assert!(next > id);
    }
}
