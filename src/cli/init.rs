use tracing::info;

use crate::cli::open_db;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    let resolved = settings.data_path();
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(settings.statements_path())?;
    open_db(&settings)?;

    info!(data_dir = %resolved.display(), "Initialized");
    println!("Initialized moni at {}", resolved.display());
    println!("Put statement PDFs in {}", settings.statements_path().display());
    Ok(())
}
