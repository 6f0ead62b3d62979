use std::fs;
use std::path::{Path, PathBuf};

use crate::infrastructure::config::AppConfig;

pub fn resolve_data_dir(config: &AppConfig) -> std::io::Result<PathBuf> {
    ensure_dir(&config.data_dir)?;
    Ok(config.data_dir.clone())
}

/// Directory where CSV exports are written.
pub fn ensure_exports_dir(data_dir: &Path) -> std::io::Result<PathBuf> {
    let exports_dir = data_dir.join("exports");
    ensure_dir(&exports_dir)?;
    Ok(exports_dir)
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
