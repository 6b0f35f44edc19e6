//! In-memory cache storage.
//!
//! Thread-safe map behind a `parking_lot::RwLock`. An optional byte quota
//! mimics the storage limits of a browser, so quota failures can be
//! exercised in tests.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{CacheError, CacheStorage};

/// Cache storage kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCacheStorage {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl InMemoryCacheStorage {
    /// Creates unbounded storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage that rejects writes once keys and values together
    /// would exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn used_bytes(entries: &HashMap<String, String>, excluding: &str) -> usize {
    entries
        .iter()
        .filter(|(key, _)| key.as_str() != excluding)
        .map(|(key, value)| key.len() + value.len())
        .sum()
}

impl CacheStorage for InMemoryCacheStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        if let Some(quota) = self.quota_bytes {
            let available = quota.saturating_sub(used_bytes(&entries, key));
            let needed = key.len() + value.len();
            if needed > available {
                return Err(CacheError::QuotaExceeded { needed, available });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
