//! Local cache of collection snapshots.
//!
//! The cache is the durable, device-local mirror of the last known state of
//! each collection. It is read before any network call so lists render
//! instantly, and it is overwritten wholesale after every mutation.
//!
//! # Failure policy
//!
//! Cache failures never break the in-memory path:
//!
//! - [`LocalCache::write`] logs a warning and carries on.
//! - [`LocalCache::read`] treats absent, corrupt, and incompatible entries
//!   alike and returns an empty snapshot.
//!
//! The `try_*` variants expose the underlying [`CacheError`] for callers
//! whose purpose is storage itself.

pub mod file;
pub mod memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Entity;

pub use file::FileCacheStorage;
pub use memory::InMemoryCacheStorage;

/// Envelope format version. Entries written with another version are ignored.
pub const CACHE_VERSION: u32 = 1;

// =============================================================================
// Cache Error
// =============================================================================

/// Errors raised by cache storage.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The backing store refused the write for lack of space.
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Reading or writing the backing store failed.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

// =============================================================================
// Cache Storage
// =============================================================================

/// String key/value storage backing the cache.
///
/// Implementations are synchronous: cache access never suspends.
pub trait CacheStorage: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Removes the value under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be modified.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

// =============================================================================
// Envelope
// =============================================================================

/// On-disk form of a cached value.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope<T> {
    version: u32,
    saved_at: DateTime<Utc>,
    items: T,
}

// =============================================================================
// Local Cache
// =============================================================================

/// Typed adapter over a [`CacheStorage`], with namespaced keys.
#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn CacheStorage>,
    namespace: String,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LocalCache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Creates a cache adapter writing keys under `namespace`.
    #[must_use]
    pub fn new(storage: Arc<dyn CacheStorage>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
        }
    }

    /// Creates an adapter over fresh in-memory storage.
    #[must_use]
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemoryCacheStorage::new()), namespace)
    }

    /// Returns the full storage key for `key`.
    #[must_use]
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}.{key}", self.namespace)
    }

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if encoding or the storage write fails.
    pub fn try_write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let envelope = CacheEnvelope {
            version: CACHE_VERSION,
            saved_at: Utc::now(),
            items: value,
        };
        let encoded = serde_json::to_string(&envelope)?;
        self.storage.set(&self.storage_key(key), &encoded)
    }

    /// Stores `value` under `key`; failures are logged and otherwise ignored.
    ///
    /// Returns `true` if the value was persisted.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_write(key, value) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(key = %self.storage_key(key), %error, "Failed to write local cache");
                false
            }
        }
    }

    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent or was written with another
    /// envelope version.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if storage fails or the entry does not decode.
    pub fn try_read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(raw) = self.storage.get(&self.storage_key(key))? else {
            return Ok(None);
        };
        let envelope: CacheEnvelope<serde_json::Value> = serde_json::from_str(&raw)?;
        if envelope.version != CACHE_VERSION {
            tracing::info!(
                key = %self.storage_key(key),
                found = envelope.version,
                expected = CACHE_VERSION,
                "Ignoring cache entry with incompatible version"
            );
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(envelope.items)?))
    }

    /// Reads the value stored under `key`, or `T::default()` if it is
    /// absent, corrupt, or unreadable.
    pub fn read<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.try_read(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(key = %self.storage_key(key), %error, "Discarding unreadable cache entry");
                T::default()
            }
        }
    }

    /// Writes the snapshot of a collection.
    pub fn write_snapshot<E: Entity>(&self, snapshot: &[E]) -> bool {
        self.write(E::COLLECTION, snapshot)
    }

    /// Reads the snapshot of a collection.
    ///
    /// Entities still carrying a temporary identifier are dropped: they
    /// belong to a creation that never settled.
    pub fn read_snapshot<E: Entity>(&self) -> Vec<E> {
        let mut snapshot: Vec<E> = self.read(E::COLLECTION);
        let before = snapshot.len();
        snapshot.retain(|entity| !entity.id().is_temporary());
        if snapshot.len() != before {
            tracing::debug!(
                collection = E::COLLECTION,
                dropped = before - snapshot.len(),
                "Dropped unconfirmed entities from cached snapshot"
            );
        }
        snapshot
    }

    /// Removes the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if storage fails.
    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(&self.storage_key(key))
    }
}
