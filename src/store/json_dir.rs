//! One JSON file per document in a local directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::DocumentStore;
use crate::error::{AppError, Result};

/// Documents stored as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(AppError::validation(format!("Invalid document key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl DocumentStore for JsonDirStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, document: Value) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&document)?;

        // Write-then-rename so readers never see a half-written document.
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path().join("data")).await.unwrap();

        assert!(store.get("hr_settings").await.unwrap().is_none());
        store.put("hr_settings", json!({"entryTime": "09:00"})).await.unwrap();
        assert_eq!(
            store.get("hr_settings").await.unwrap(),
            Some(json!({"entryTime": "09:00"}))
        );
        assert!(store.root().join("hr_settings.json").exists());
        assert!(!store.root().join("hr_settings.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        assert!(store.put("../escape", json!(1)).await.is_err());
        assert!(store.get("a/b").await.is_err());
        assert!(store.get("").await.is_err());
    }
}
