use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoniError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("No statements found")]
    EmptyFileListing,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MoniError>;
