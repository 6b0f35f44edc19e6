//! Optimistic synchronization of one entity collection.
//!
//! [`SyncEngine`] ties together the state container, the local cache and
//! the remote store. Every mutation follows the same shape:
//!
//! 1. Local checks (credential, entity presence); failures return before
//!    anything changes.
//! 2. Optimistic mutation of the container, mirrored to the cache.
//! 3. One remote call, the only suspension point.
//! 4. Success: adopt the authoritative record. Failure: roll back.
//!
//! Container and cache are updated under the same lock, so once an
//! operation settles the cached snapshot equals the in-memory one.

pub mod lock;
pub mod notify;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::auth::{BearerToken, CredentialProvider};
use crate::cache::LocalCache;
use crate::domain::{Completable, Entity, EntityId, ServerId, TempId, Timestamp};
use crate::error::SyncError;
use crate::remote::{RemoteError, RemoteStore};
use crate::store::{Collection, StoreError};

pub use lock::{EntityGuard, EntityLocks};
pub use notify::{Notification, NotificationLevel, Notifier, RecordingNotifier, TracingNotifier};

// =============================================================================
// Sync Engine
// =============================================================================

/// Optimistic, local-first synchronization of a collection of `E`.
pub struct SyncEngine<E: Entity> {
    state: Mutex<Collection<E>>,
    cache: LocalCache,
    remote: Arc<dyn RemoteStore<E>>,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn Notifier>,
    locks: EntityLocks,
    /// Server ids adopted by temporary ids during this session.
    aliases: Mutex<HashMap<TempId, ServerId>>,
}

impl<E: Entity> std::fmt::Debug for SyncEngine<E> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncEngine")
            .field("collection", &E::COLLECTION)
            .field("remote", &self.remote.name())
            .field("len", &self.state.lock().len())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> SyncEngine<E> {
    /// Creates an engine with an empty container, logging notifications.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore<E>>,
        cache: LocalCache,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            state: Mutex::new(Collection::new()),
            cache,
            remote,
            credentials,
            notifier: Arc::new(TracingNotifier),
            locks: EntityLocks::new(),
            aliases: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Returns the current in-memory snapshot, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<E> {
        self.state.lock().snapshot()
    }

    /// Returns the snapshot currently stored in the local cache.
    #[must_use]
    pub fn cached_snapshot(&self) -> Vec<E> {
        self.cache.read_snapshot()
    }

    /// Looks up an entity. A temporary id that has since been confirmed
    /// resolves to the confirmed record.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<E> {
        let key = self.resolve(id);
        self.state.lock().get(&key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    /// Loads the cached snapshot into the container for instant reads.
    ///
    /// Returns the number of entities loaded.
    pub fn hydrate(&self) -> usize {
        let snapshot: Vec<E> = self.cache.read_snapshot();
        let count = snapshot.len();
        self.state.lock().replace_all(snapshot);
        self.prune_aliases();
        tracing::debug!(collection = E::COLLECTION, count, "Hydrated from local cache");
        count
    }

    /// Empties the container and removes the cached snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::StorageFailure` if the cached snapshot cannot be
    /// removed. The container is emptied regardless.
    pub fn clear(&self) -> Result<(), SyncError> {
        self.state.lock().replace_all(Vec::new());
        self.aliases.lock().clear();
        self.cache.remove(E::COLLECTION)?;
        tracing::debug!(collection = E::COLLECTION, "Cleared container and cached snapshot");
        Ok(())
    }

    /// Refetches the whole collection and replaces container and cache.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::AuthenticationRequired` without a credential, or
    /// `SyncError::RemoteRejected` if the fetch fails. The container is
    /// unchanged on failure.
    pub async fn refresh(&self) -> Result<Vec<E>, SyncError> {
        let result = async {
            let token = self.token()?;
            let items = self.remote.list(&token).await?;
            self.mutate(|collection| collection.replace_all(items.clone()));
            Ok::<_, SyncError>(items)
        }
        .await;

        match result {
            Ok(items) => {
                self.prune_aliases();
                tracing::info!(collection = E::COLLECTION, count = items.len(), "Refreshed");
                Ok(items)
            }
            Err(error) => Err(self.report_failure("refresh", error)),
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Creates an entity optimistically.
    ///
    /// The entity appears immediately under a temporary id; once the remote
    /// store confirms it, the confirmed record takes its place.
    ///
    /// # Errors
    ///
    /// - `SyncError::AuthenticationRequired` if no credential is available
    ///   (nothing is mutated).
    /// - `SyncError::RemoteRejected` if the remote call fails; the temporary
    ///   entity is removed again.
    pub async fn create(&self, draft: E::Draft) -> Result<E, SyncError> {
        let result = self.create_settled(&draft).await;
        self.report("created", result)
    }

    /// Applies a partial update optimistically.
    ///
    /// # Errors
    ///
    /// - `SyncError::AuthenticationRequired` if no credential is available.
    /// - `SyncError::NotFound` if `id` is not in the collection.
    /// - `SyncError::RemoteRejected` if the remote call fails; the entity is
    ///   restored to its previous value.
    pub async fn update(&self, id: &EntityId, changes: E::Changes) -> Result<E, SyncError> {
        let result = async {
            let token = self.token()?;
            let (_guard, key, previous) = self.lock_existing(id).await?;
            self.update_settled(&token, &key, previous, &changes).await
        }
        .await;
        self.report("updated", result)
    }

    /// Deletes an entity optimistically.
    ///
    /// # Errors
    ///
    /// - `SyncError::AuthenticationRequired` if no credential is available.
    /// - `SyncError::NotFound` if `id` is not in the collection.
    /// - `SyncError::RemoteRejected` if the remote call fails; the entity is
    ///   reinserted where it was.
    pub async fn delete(&self, id: &EntityId) -> Result<(), SyncError> {
        let result = self.delete_settled(id).await;
        self.report("deleted", result)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn token(&self) -> Result<BearerToken, SyncError> {
        self.credentials
            .token()
            .ok_or(SyncError::AuthenticationRequired)
    }

    fn resolve(&self, id: &EntityId) -> EntityId {
        match id {
            EntityId::Temporary(temp) => self
                .aliases
                .lock()
                .get(temp)
                .map_or_else(|| id.clone(), |server| EntityId::Server(server.clone())),
            EntityId::Server(_) => id.clone(),
        }
    }

    /// Drops aliases whose entity has left the container and whose
    /// temporary id no operation is waiting on.
    fn prune_aliases(&self) {
        let state = self.state.lock();
        let mut aliases = self.aliases.lock();
        let before = aliases.len();
        aliases.retain(|temp, server| {
            state.get(&EntityId::Server(server.clone())).is_some()
                || self.locks.is_active(&EntityId::Temporary(*temp))
        });
        if aliases.len() != before {
            tracing::trace!(
                collection = E::COLLECTION,
                pruned = before - aliases.len(),
                "Pruned temporary id aliases"
            );
        }
    }

    /// Runs `change` on the container and mirrors the result to the cache.
    fn mutate<T>(&self, change: impl FnOnce(&mut Collection<E>) -> T) -> T {
        let mut state = self.state.lock();
        let output = change(&mut state);
        self.cache.write_snapshot(state.as_slice());
        output
    }

    /// Like [`Self::mutate`], but leaves the cache alone when `change` fails.
    fn try_mutate<T>(
        &self,
        change: impl FnOnce(&mut Collection<E>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock();
        let output = change(&mut state)?;
        self.cache.write_snapshot(state.as_slice());
        Ok(output)
    }

    /// Takes the entity lock for `id` and captures its current value.
    ///
    /// A temporary id first waits for its creation to settle, then follows
    /// the server id it was confirmed under.
    async fn lock_existing(&self, id: &EntityId) -> Result<(EntityGuard, EntityId, E), SyncError> {
        if id.is_temporary() {
            drop(self.locks.acquire(id).await);
        }
        let key = self.resolve(id);
        if key.is_temporary() {
            return Err(SyncError::NotFound(id.clone()));
        }
        let guard = self.locks.acquire(&key).await;
        let current = self
            .state
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        Ok((guard, key, current))
    }

    async fn create_settled(&self, draft: &E::Draft) -> Result<E, SyncError> {
        let token = self.token()?;
        let temp = TempId::generate();
        let key = EntityId::Temporary(temp);
        let _guard = self.locks.acquire(&key).await;

        let optimistic = E::from_draft(key.clone(), draft, Timestamp::now());
        self.mutate(|collection| collection.apply_optimistic_create(optimistic));
        tracing::debug!(collection = E::COLLECTION, id = %key, "Applied optimistic create");

        let outcome = self.remote.create(&token, draft).await.and_then(|confirmed| {
            if confirmed.id().is_temporary() {
                Err(RemoteError::Decode(
                    "created entity carries no server id".to_string(),
                ))
            } else {
                Ok(confirmed)
            }
        });

        match outcome {
            Ok(confirmed) => {
                if let Some(server_id) = confirmed.id().as_server() {
                    self.aliases.lock().insert(temp, server_id.clone());
                }
                let replaced =
                    self.mutate(|collection| collection.apply_server_replace(&temp, confirmed.clone()));
                if !replaced {
                    tracing::debug!(
                        collection = E::COLLECTION,
                        id = %key,
                        "Optimistic entity already gone; confirmation not applied"
                    );
                }
                Ok(confirmed)
            }
            Err(error) => {
                if self
                    .try_mutate(|collection| collection.apply_delete(&key))
                    .is_err()
                {
                    tracing::debug!(collection = E::COLLECTION, id = %key, "Optimistic entity already gone");
                }
                tracing::debug!(collection = E::COLLECTION, id = %key, "Rolled back optimistic create");
                Err(error.into())
            }
        }
    }

    async fn update_settled(
        &self,
        token: &BearerToken,
        key: &EntityId,
        previous: E,
        changes: &E::Changes,
    ) -> Result<E, SyncError> {
        let server_id = key
            .as_server()
            .cloned()
            .ok_or_else(|| SyncError::NotFound(key.clone()))?;
        self.try_mutate(|collection| {
            collection
                .apply_update(key, changes, Timestamp::now())
                .map(drop)
        })?;

        match self.remote.update(token, &server_id, changes).await {
            Ok(confirmed) => {
                if self
                    .try_mutate(|collection| collection.replace(key, confirmed.clone()))
                    .is_err()
                {
                    tracing::debug!(collection = E::COLLECTION, id = %key, "Entity gone before update settled");
                }
                Ok(confirmed)
            }
            Err(error) => {
                if self
                    .try_mutate(|collection| collection.replace(key, previous))
                    .is_err()
                {
                    tracing::debug!(collection = E::COLLECTION, id = %key, "Entity gone before rollback");
                }
                tracing::debug!(collection = E::COLLECTION, id = %key, "Rolled back optimistic update");
                Err(error.into())
            }
        }
    }

    async fn delete_settled(&self, id: &EntityId) -> Result<(), SyncError> {
        let token = self.token()?;
        let (_guard, key, _) = self.lock_existing(id).await?;
        let server_id = key
            .as_server()
            .cloned()
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        let (position, removed) = self.try_mutate(|collection| collection.apply_delete(&key))?;

        match self.remote.delete(&token, &server_id).await {
            Ok(()) => {
                self.prune_aliases();
                Ok(())
            }
            Err(error) => {
                self.mutate(|collection| collection.restore(position, removed));
                tracing::debug!(collection = E::COLLECTION, id = %key, "Rolled back optimistic delete");
                Err(error.into())
            }
        }
    }

    /// Notifies the user about the outcome of a mutation.
    fn report<T>(&self, verb: &str, result: Result<T, SyncError>) -> Result<T, SyncError> {
        match result {
            Ok(value) => {
                self.notifier
                    .notify(Notification::success(format!("{} {verb}", E::KIND)));
                Ok(value)
            }
            Err(error) => Err(self.report_failure(verb, error)),
        }
    }

    fn report_failure(&self, action: &str, error: SyncError) -> SyncError {
        tracing::warn!(
            collection = E::COLLECTION,
            remote = self.remote.name(),
            action,
            %error,
            "Sync operation failed"
        );
        self.notifier.notify(Notification::error(error.message()));
        error
    }
}

impl<E: Completable> SyncEngine<E> {
    /// Flips the completion flag optimistically.
    ///
    /// The new value is computed from the entity as it stands once any
    /// earlier mutation of the same entity has settled.
    ///
    /// # Errors
    ///
    /// Same as [`SyncEngine::update`].
    pub async fn toggle(&self, id: &EntityId) -> Result<E, SyncError> {
        let result = async {
            let token = self.token()?;
            let (_guard, key, previous) = self.lock_existing(id).await?;
            let changes = E::completion_changes(!previous.is_completed());
            self.update_settled(&token, &key, previous, &changes).await
        }
        .await;
        let verb = match &result {
            Ok(entity) if entity.is_completed() => "completed",
            Ok(_) => "reopened",
            Err(_) => "toggled",
        };
        self.report(verb, result)
    }
}
