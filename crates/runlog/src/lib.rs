//! Run record persistence.
//!
//! Each completed (or budget-exhausted) run is written as one pretty
//! JSON file named `run_<YYYYMMDD_HHMMSS>.json`, so a directory listing
//! reads as a chronological history.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use gridmend_agent::RunRecord;

/// Stores run records as JSON files in one directory.
pub struct RunStore {
    runs_dir: PathBuf,
}

impl RunStore {
    pub fn new(runs_dir: impl AsRef<Path>) -> Self {
        let runs_dir = runs_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&runs_dir).ok();
        Self { runs_dir }
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Write a record, returning the path it landed at.
    pub async fn save(&self, record: &RunRecord) -> std::io::Result<PathBuf> {
        let name = format!("run_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.runs_dir.join(name);
        let content = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, content).await?;
        debug!("saved run {} to {}", record.run_id, path.display());
        Ok(path)
    }

    /// Load a record by file name.
    pub async fn load(&self, name: &str) -> Option<RunRecord> {
        let path = self.runs_dir.join(name);
        if !path.exists() {
            return None;
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<RunRecord>(&content) {
                Ok(record) => {
                    debug!("loaded run {}", record.run_id);
                    Some(record)
                }
                Err(e) => {
                    warn!("failed to parse run file {}: {}", name, e);
                    None
                }
            },
            Err(e) => {
                warn!("failed to read run file {}: {}", name, e);
                None
            }
        }
    }

    /// File names of all stored runs, oldest first.
    ///
    /// The timestamped naming scheme makes lexicographic order
    /// chronological order.
    pub async fn list(&self) -> Vec<String> {
        let mut names = Vec::new();

        if let Ok(mut entries) = tokio::fs::read_dir(&self.runs_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if let Some(name) = entry.file_name().to_str() {
                    if name.starts_with("run_") && name.ends_with(".json") {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names.sort();
        names
    }

    /// File name of the most recent run, if any.
    pub async fn latest(&self) -> Option<String> {
        self.list().await.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridmend_agent::AgentMemory;
    use tempfile::TempDir;

    fn record(run_id: &str) -> RunRecord {
        let now = Utc::now();
        RunRecord {
            run_id: run_id.to_string(),
            started_at: now,
            finished_at: now,
            completed: true,
            steps: vec![],
            memory: AgentMemory::default(),
        }
    }

    #[tokio::test]
    async fn test_save_uses_timestamped_name() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());

        let path = store.save(&record("r1")).await.unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("run_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "run_20240101_120000.json".len());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());

        let path = store.save(&record("round-trip")).await.unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();

        let loaded = store.load(name).await.unwrap();
        assert_eq!(loaded.run_id, "round-trip");
        assert!(loaded.completed);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        assert!(store.load("run_19990101_000000.json").await.is_none());
    }

    #[tokio::test]
    async fn test_load_corrupt_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());
        tokio::fs::write(dir.path().join("run_20240101_000000.json"), "{not json")
            .await
            .unwrap();
        assert!(store.load("run_20240101_000000.json").await.is_none());
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());

        store.save(&record("r1")).await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "x")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("other.json"), "{}")
            .await
            .unwrap();

        let names = store.list().await;
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("run_"));
    }

    #[tokio::test]
    async fn test_latest_is_lexicographic_max() {
        let dir = TempDir::new().unwrap();
        let store = RunStore::new(dir.path());

        for name in ["run_20240101_000000.json", "run_20240301_000000.json"] {
            let content = serde_json::to_string_pretty(&record(name)).unwrap();
            tokio::fs::write(dir.path().join(name), content).await.unwrap();
        }

        assert_eq!(store.latest().await.unwrap(), "run_20240301_000000.json");
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = RunStore::new(&nested);
        assert!(store.runs_dir().exists());
        assert!(store.list().await.is_empty());
    }
}
