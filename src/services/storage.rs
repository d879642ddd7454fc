//! Durable key/value storage seam and the pending-link slot
//!
//! The host supplies the actual backend (secure storage on mobile,
//! LocalStorage-equivalent elsewhere); the core only ever needs string
//! get/set/delete. Storage failures are recoverable by policy: the caller
//! logs and the in-memory flow continues.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Storage key for the single unconsumed deep link
const PENDING_LINK_KEY: &str = "ticketflow_pending_link";

/// A durable store read/write/delete failed
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Backend rejected or failed the call
    Backend(String),
    /// Stored value exists but is not usable
    InvalidValue(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(msg) => write!(f, "Storage backend error: {}", msg),
            Self::InvalidValue(msg) => write!(f, "Invalid stored value: {}", msg),
        }
    }
}

/// Durable string key/value storage provided by the host
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`KeyValueStore`] for tests and hosts without durable storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// The single durable slot for a deep link that arrived before the app was
/// ready to process it. Holds at most one URL; every save overwrites
/// (last-write-wins).
pub struct PendingLinkStore {
    store: Arc<dyn KeyValueStore>,
}

impl PendingLinkStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a URL for later retry, replacing any previous one
    pub async fn save(&self, url: &str) -> Result<(), StorageError> {
        self.store.set(PENDING_LINK_KEY, url).await?;
        log::info!("Saved pending deep link for later processing");
        Ok(())
    }

    /// Consume the slot: read, then delete, then hand back the URL.
    ///
    /// The delete happens before the caller sees the value, so a crash
    /// mid-processing cannot replay the same link forever on relaunch. A
    /// failed delete is logged and the URL is still returned; the dedup
    /// window absorbs the rare extra replay.
    pub async fn take(&self) -> Result<Option<String>, StorageError> {
        let url = match self.store.get(PENDING_LINK_KEY).await? {
            Some(url) => url,
            None => return Ok(None),
        };
        if let Err(e) = self.store.delete(PENDING_LINK_KEY).await {
            log::warn!("Failed to clear pending deep link slot: {}", e);
        }
        Ok(Some(url))
    }

    /// Drop any stored URL without processing it
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.delete(PENDING_LINK_KEY).await
    }
}
