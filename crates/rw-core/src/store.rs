//! # Document Store
//!
//! The single in-memory [`Snapshot`] of every collection, lazily hydrated
//! from a [`PersistenceAdapter`] and flushed back whole after each mutation.
//!
//! # Developer Note
//! Mutations run against a copy of the snapshot. The copy is persisted
//! first and only installed once the write succeeded, so a failing
//! mutation or a failing write leaves memory and storage as they were.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::traits::PersistenceAdapter;

pub struct DocumentStore {
    adapter: Arc<dyn PersistenceAdapter>,
    /// `None` until hydrated. The lock serializes every read-modify-write.
    snapshot: Mutex<Option<Snapshot>>,
}

impl DocumentStore {
    pub fn new(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        Self {
            adapter,
            snapshot: Mutex::new(None),
        }
    }

    /// Loads the snapshot if it is not in memory yet. No-op afterwards.
    pub async fn hydrate(&self) -> Result<()> {
        let mut guard = self.snapshot.lock().await;
        self.ensure(&mut *guard).await?;
        Ok(())
    }

    /// Drops the in-memory snapshot and reads the adapter again, picking up
    /// writes made by another process sharing the same key.
    pub async fn rehydrate(&self) -> Result<()> {
        let mut guard = self.snapshot.lock().await;
        *guard = None;
        self.ensure(&mut *guard).await?;
        Ok(())
    }

    pub async fn is_hydrated(&self) -> bool {
        self.snapshot.lock().await.is_some()
    }

    /// Writes the whole in-memory snapshot through the adapter.
    pub async fn flush(&self) -> Result<()> {
        let guard = self.snapshot.lock().await;
        let snapshot = guard
            .as_ref()
            .ok_or_else(|| AppError::StoreUnavailable("store has not been hydrated".into()))?;
        self.persist(snapshot).await
    }

    /// Runs a read-only query against the hydrated snapshot.
    pub async fn read<R>(&self, query: impl FnOnce(&Snapshot) -> R) -> Result<R> {
        let mut guard = self.snapshot.lock().await;
        let snapshot = self.ensure(&mut *guard).await?;
        Ok(query(snapshot))
    }

    /// Applies `change` to a copy of the snapshot, flushes the copy and
    /// installs it. Nothing is written when `change` fails.
    pub async fn mutate<R>(&self, change: impl FnOnce(&mut Snapshot) -> Result<R>) -> Result<R> {
        let mut guard = self.snapshot.lock().await;
        let current = self.ensure(&mut *guard).await?;

        let mut draft = current.clone();
        let out = change(&mut draft)?;
        self.persist(&draft).await?;
        *current = draft;
        Ok(out)
    }

    /// Like [`mutate`](Self::mutate), for changes that target one entity:
    /// when `change` returns `Ok(None)` (target missing) nothing is flushed.
    pub async fn mutate_found<R>(
        &self,
        change: impl FnOnce(&mut Snapshot) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        let mut guard = self.snapshot.lock().await;
        let current = self.ensure(&mut *guard).await?;

        let mut draft = current.clone();
        let Some(out) = change(&mut draft)? else {
            return Ok(None);
        };
        self.persist(&draft).await?;
        *current = draft;
        Ok(Some(out))
    }

    async fn ensure<'a>(&self, slot: &'a mut Option<Snapshot>) -> Result<&'a mut Snapshot> {
        let snapshot = match slot.take() {
            Some(snapshot) => snapshot,
            None => self.load().await?,
        };
        Ok(slot.insert(snapshot))
    }

    async fn load(&self) -> Result<Snapshot> {
        if let Some(value) = self.adapter.read().await {
            match serde_json::from_value::<Snapshot>(value) {
                Ok(snapshot) => {
                    log::debug!(
                        "hydrated store: {} users, {} stories, {} comments",
                        snapshot.users.len(),
                        snapshot.stories.len(),
                        snapshot.comments.len()
                    );
                    return Ok(snapshot);
                }
                Err(e) => log::warn!("stored document has an unexpected layout, resetting: {}", e),
            }
        }

        let fresh = Snapshot::default();
        self.persist(&fresh)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        log::info!("initialised empty document store");
        Ok(fresh)
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let blob = serde_json::to_value(snapshot)
            .map_err(|e| AppError::Internal(format!("serialize snapshot: {e}")))?;
        self.adapter
            .write(&blob)
            .await
            .map_err(|e| AppError::Internal(format!("flush failed: {e}")))
    }
}
