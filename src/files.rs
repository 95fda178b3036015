use std::path::Path;

use walkdir::WalkDir;

use crate::error::Result;

/// List regular files under `dir` (recursively) whose extension is in
/// `extensions`. Names are returned relative to `dir`, sorted.
/// Extensions compare case-insensitively, with or without a leading dot;
/// an empty filter accepts every file.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<String>> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let mut found = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = wanted.is_empty()
            || path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| wanted.iter().any(|w| e.eq_ignore_ascii_case(w)))
                .unwrap_or(false);
        if !matches {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path);
        found.push(rel.to_string_lossy().to_string());
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("march.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        std::fs::write(dir.path().join("april.PDF"), b"%PDF").unwrap();
        let files = list_files(dir.path(), &[".pdf"]).unwrap();
        assert_eq!(files, vec!["april.PDF", "march.pdf"]);
    }

    #[test]
    fn test_descends_into_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("2025")).unwrap();
        std::fs::write(dir.path().join("2025").join("jan.pdf"), b"%PDF").unwrap();
        let files = list_files(dir.path(), &["pdf"]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("jan.pdf"));
        assert!(dir.path().join(&files[0]).exists());
    }

    #[test]
    fn test_empty_filter_accepts_all() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), b"").unwrap();
        std::fs::write(dir.path().join("b"), b"").unwrap();
        assert_eq!(list_files(dir.path(), &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(dir.path(), &["pdf"]).unwrap().is_empty());
    }

    #[test]
    fn test_skips_directories_named_like_statements() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("old.pdf")).unwrap();
        std::fs::write(dir.path().join("old.pdf").join("inner.PDF"), b"%PDF").unwrap();
        let files = list_files(dir.path(), &[".pdf"]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("inner.PDF"));
    }

    #[test]
    fn test_missing_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(&dir.path().join("missing"), &["pdf"]).is_err());
    }
}
