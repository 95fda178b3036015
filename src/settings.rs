use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MoniError, Result};

const DEFAULT_CATEGORIES: &[&str] = &[
    "Salary",
    "Other Income",
    "Groceries",
    "Dining",
    "Transport",
    "Rent",
    "Utilities",
    "Shopping",
    "Entertainment",
    "Health",
    "Subscriptions",
    "Travel",
    "Fees",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
        }
    }
}

impl LlmSettings {
    /// `OPENAI_API_KEY` wins over the key stored in settings.json.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Folder scanned by the statement picker; empty means `<data_dir>/statements`.
    #[serde(default)]
    pub statements_dir: String,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_pdftotext")]
    pub pdftotext: String,
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn default_pdftotext() -> String {
    "pdftotext".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            statements_dir: String::new(),
            llm: LlmSettings::default(),
            categories: default_categories(),
            pdftotext: default_pdftotext(),
        }
    }
}

impl Settings {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_path().join("moni.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_path().join("moni.log")
    }

    pub fn statements_path(&self) -> PathBuf {
        if self.statements_dir.is_empty() {
            self.data_path().join("statements")
        } else {
            PathBuf::from(&self.statements_dir)
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("moni")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("moni")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| MoniError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            statements_dir: "/tmp/statements".to_string(),
            llm: LlmSettings {
                base_url: "http://localhost:8080".to_string(),
                model: "llama3.2".to_string(),
                api_key: Some("sk-test".to_string()),
            },
            categories: vec!["Groceries".to_string()],
            pdftotext: "pdftotext".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.llm.model, "llama3.2");
        assert_eq!(loaded.categories, vec!["Groceries".to_string()]);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.llm.base_url, "https://api.openai.com");
        assert_eq!(s.llm.model, "gpt-4o-mini");
        assert_eq!(s.pdftotext, "pdftotext");
        assert!(s.categories.contains(&"Groceries".to_string()));
    }

    #[test]
    fn test_statements_path_defaults_under_data_dir() {
        let s = Settings {
            data_dir: "/tmp/moni".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.statements_path(), PathBuf::from("/tmp/moni/statements"));
        assert_eq!(s.db_path(), PathBuf::from("/tmp/moni/moni.db"));
    }

    #[test]
    fn test_statements_path_override() {
        let s = Settings {
            data_dir: "/tmp/moni".to_string(),
            statements_dir: "/srv/pdfs".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.statements_path(), PathBuf::from("/srv/pdfs"));
    }
}
