//! `SettingsStore` trait: the host's whole-value key/value persistence.

use async_trait::async_trait;

use crate::error::StoreError;

/// Backend-agnostic key/value settings store.
///
/// Values are whole JSON documents. There are no partial updates, no
/// transactions and no locking: concurrent writers to one key are
/// last-writer-wins.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError>;
}
