//! Path utilities

use std::path::PathBuf;

/// Application data directory (~/.gridmend)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .expect("failed to locate home directory")
        .join(".gridmend")
}

/// Configuration file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Run record storage
pub fn runs_dir() -> PathBuf {
    data_dir().join("runs")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
