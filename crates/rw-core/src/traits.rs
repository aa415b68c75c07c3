//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::critic::{CriticError, CriticResponse, CritiqueRequest};

/// Whole-blob persistence contract: one JSON value under one fixed key.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Returns the stored value, or `None` when nothing usable is stored
    /// (absent or unparseable). Never fails.
    async fn read(&self) -> Option<serde_json::Value>;

    /// Replaces the stored value entirely.
    async fn write(&self, blob: &serde_json::Value) -> anyhow::Result<()>;
}

/// External reviewer that scores and critiques a submitted story.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StoryCritic: Send + Sync {
    async fn review(&self, request: &CritiqueRequest) -> Result<CriticResponse, CriticError>;
}

/// Password hashing and verification.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Produces a self-describing hash string for storage.
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Checks a plaintext password against a stored hash. Unparseable hashes
    /// never verify.
    fn verify_password(&self, password: &str, hash: &str) -> bool;
}
