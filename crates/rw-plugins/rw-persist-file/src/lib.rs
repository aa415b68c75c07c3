//! # rw-persist-file
//! rusty-writers/crates/rw-plugins/rw-persist-file/src/lib.rs
//! Local filesystem implementation of `PersistenceAdapter`.
//! One JSON file per key, replaced atomically on every write.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use rw_core::traits::PersistenceAdapter;
use tokio::fs;

/// Key used when none is configured.
pub const DEFAULT_KEY: &str = "aiwriters_db";

pub struct FilePersistence {
    /// Final location of the blob (e.g., "./data/aiwriters_db.json")
    path: PathBuf,
}

impl FilePersistence {
    /// Stores the blob for `key` as `<root>/<key>.json`.
    pub fn new(root: impl Into<PathBuf>, key: &str) -> Self {
        let mut path = root.into();
        path.push(format!("{key}.json"));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling written first and then renamed over the target.
    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl PersistenceAdapter for FilePersistence {
    async fn read(&self) -> Option<serde_json::Value> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring unparseable {}: {}", self.path.display(), e);
                None
            }
        }
    }

    async fn write(&self, blob: &serde_json::Value) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }

        let data = serde_json::to_vec_pretty(blob)?;
        let staging = self.staging_path();
        fs::write(&staging, &data)
            .await
            .with_context(|| format!("write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;

        log::debug!("flushed {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::{DocumentStore, EntityKind};
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FilePersistence::new(dir.path(), DEFAULT_KEY);
        assert!(adapter.read().await.is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FilePersistence::new(dir.path().join("nested"), "db");
        let blob = serde_json::json!({
            "users": [],
            "stories": [{ "id": "story_1", "title": "Ünïcode ✓" }],
            "sequences": { "userId": 1, "storyId": 2, "commentId": 1 }
        });

        adapter.write(&blob).await.unwrap();

        assert_eq!(adapter.read().await, Some(blob));
        assert!(adapter.path().ends_with("nested/db.json"));
        assert!(!adapter.staging_path().exists());
    }

    #[tokio::test]
    async fn write_replaces_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FilePersistence::new(dir.path(), "db");
        adapter
            .write(&serde_json::json!({ "a": 1, "b": 2 }))
            .await
            .unwrap();
        adapter.write(&serde_json::json!({ "c": 3 })).await.unwrap();

        assert_eq!(adapter.read().await, Some(serde_json::json!({ "c": 3 })));
    }

    #[tokio::test]
    async fn corrupt_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FilePersistence::new(dir.path(), "db");
        std::fs::write(adapter.path(), "{\"users\": [").unwrap();
        assert!(adapter.read().await.is_none());
    }

    #[tokio::test]
    async fn store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let store = DocumentStore::new(Arc::new(FilePersistence::new(dir.path(), DEFAULT_KEY)));
        store
            .mutate(|db| Ok(db.next_id(EntityKind::Story)))
            .await
            .unwrap();

        let reopened = DocumentStore::new(Arc::new(FilePersistence::new(dir.path(), DEFAULT_KEY)));
        let next = reopened
            .mutate(|db| Ok(db.next_id(EntityKind::Story)))
            .await
            .unwrap();
        assert_eq!(next, "story_2");
    }
}
