//! Per-entity mutual exclusion.
//!
//! Mutations addressing the same entity are serialized: the second waits
//! until the first has settled (confirmed or rolled back) before it
//! captures its own rollback value. Mutations on different entities do not
//! contend.
//!
//! Slots are created on demand and dropped once no holder or waiter
//! references them, so the map only ever contains contended or in-flight
//! identifiers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::EntityId;

type Slots = Arc<Mutex<HashMap<EntityId, Arc<AsyncMutex<()>>>>>;

/// Registry of per-entity async locks.
#[derive(Debug, Clone, Default)]
pub struct EntityLocks {
    slots: Slots,
}

impl EntityLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `id`.
    pub async fn acquire(&self, id: &EntityId) -> EntityGuard {
        let slot = Arc::clone(self.slots.lock().entry(id.clone()).or_default());
        let guard = slot.lock_owned().await;
        EntityGuard {
            id: id.clone(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Returns the number of identifiers currently held or waited on.
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns `true` while `id` is held or waited on.
    #[must_use]
    pub fn is_active(&self, id: &EntityId) -> bool {
        self.slots.lock().contains_key(id)
    }
}

/// Exclusive access to one entity; released on drop.
#[derive(Debug)]
pub struct EntityGuard {
    id: EntityId,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.slots.lock();
        // Only the map still references the slot: nobody holds or awaits it.
        if slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.id);
        }
    }
}
