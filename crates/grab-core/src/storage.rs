//! Storage layer: the save directory and the optional settings file

use crate::error::GrabError;
use grab_types::Settings;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Destination directory for fetched content
///
/// Files are only ever added here; nothing in the core rewrites or removes them.
#[derive(Debug, Clone)]
pub struct SaveDirectory {
    path: PathBuf,
}

impl SaveDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory if absent
    ///
    /// `create_dir_all` already succeeds when another caller created it first.
    pub async fn ensure_exists(&self) -> Result<&Path, GrabError> {
        fs::create_dir_all(&self.path).await?;
        Ok(&self.path)
    }

    /// Path for a file name inside the directory
    pub fn join(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }
}

/// Load settings from a JSON file, falling back to defaults for missing keys
pub async fn load_settings(path: &Path) -> Result<Settings, GrabError> {
    debug!("Loading settings from {}", path.display());
    let content = fs::read_to_string(path).await?;
    serde_json::from_str::<Settings>(&content).map_err(|e| {
        GrabError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: {}", path.display(), e),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_exists_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let dir = SaveDirectory::new(temp.path().join("nested").join("downloads"));

        dir.ensure_exists().await.unwrap();
        dir.ensure_exists().await.unwrap();
        assert!(dir.path().is_dir());
    }

    #[tokio::test]
    async fn test_ensure_exists_concurrent_callers() {
        let temp = tempfile::tempdir().unwrap();
        let dir = SaveDirectory::new(temp.path().join("race"));

        let (a, b) = tokio::join!(dir.ensure_exists(), dir.ensure_exists());
        assert!(a.is_ok());
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_load_settings_partial_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("settings.json");
        std::fs::write(&file, r#"{"metadata_timeout_secs": 5}"#).unwrap();

        let settings = load_settings(&file).await.unwrap();
        assert_eq!(settings.metadata_timeout_secs, 5);
        assert_eq!(settings.poll_interval_ms, 1000);
    }

    #[tokio::test]
    async fn test_load_settings_rejects_garbage() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("settings.json");
        std::fs::write(&file, "not json").unwrap();

        assert!(load_settings(&file).await.is_err());
    }
}
