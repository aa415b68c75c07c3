//! In-process `PersistenceAdapter`.
//!
//! Holds the serialized text the way a browser local-storage slot would, so
//! reads go through a real parse step. Nothing survives a restart.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::traits::PersistenceAdapter;

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with raw text already in the slot, parseable or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    /// The raw text currently stored.
    pub async fn raw(&self) -> Option<String> {
        self.slot.lock().await.clone()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryPersistence {
    async fn read(&self) -> Option<serde_json::Value> {
        let slot = self.slot.lock().await;
        let raw = slot.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("discarding unparseable in-memory blob: {}", e);
                None
            }
        }
    }

    async fn write(&self, blob: &serde_json::Value) -> anyhow::Result<()> {
        let raw = serde_json::to_string(blob)?;
        *self.slot.lock().await = Some(raw);
        Ok(())
    }
}
