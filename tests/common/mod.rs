//! Common test helpers for integration tests.
//!
//! # Note
//!
//! Each integration test file compiles as its own crate, so helpers used by
//! only some of them would otherwise warn as dead code.

#![allow(dead_code)]

use std::sync::Arc;

use ultimate_todo::auth::{BearerToken, StaticCredentials};
use ultimate_todo::cache::{CacheStorage, LocalCache};
use ultimate_todo::domain::{Entity, EntityId, ServerId};
use ultimate_todo::remote::{InMemoryRemoteStore, RemoteError};
use ultimate_todo::sync::{RecordingNotifier, SyncEngine};

pub const TOKEN: &str = "test-token";

/// Everything a sync test needs to observe.
pub struct Harness<E: Entity> {
    pub engine: SyncEngine<E>,
    pub remote: InMemoryRemoteStore<E>,
    pub cache: LocalCache,
    pub notifier: Arc<RecordingNotifier>,
}

impl<E: Entity> Harness<E> {
    /// Asserts the cache mirrors the in-memory collection.
    ///
    /// Only meaningful when no temporary entity is present, since the cache
    /// drops those on read.
    pub fn assert_cache_consistent(&self) {
        assert_eq!(self.engine.cached_snapshot(), self.engine.snapshot());
    }
}

pub fn token() -> BearerToken {
    BearerToken::new(TOKEN).unwrap()
}

/// Signed-in engine over `remote`, with an in-memory cache.
pub fn harness<E: Entity>(remote: InMemoryRemoteStore<E>) -> Harness<E> {
    build(remote, StaticCredentials::new(token()))
}

/// Engine without credentials.
pub fn anonymous_harness<E: Entity>(remote: InMemoryRemoteStore<E>) -> Harness<E> {
    build(remote, StaticCredentials::anonymous())
}

/// Signed-in engine caching to `storage`.
pub fn harness_over<E: Entity>(
    remote: InMemoryRemoteStore<E>,
    storage: Arc<dyn CacheStorage>,
) -> Harness<E> {
    build_with_cache(remote, StaticCredentials::new(token()), LocalCache::new(storage, "test"))
}

fn build<E: Entity>(remote: InMemoryRemoteStore<E>, credentials: StaticCredentials) -> Harness<E> {
    build_with_cache(remote, credentials, LocalCache::in_memory("test"))
}

fn build_with_cache<E: Entity>(
    remote: InMemoryRemoteStore<E>,
    credentials: StaticCredentials,
    cache: LocalCache,
) -> Harness<E> {
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = SyncEngine::new(Arc::new(remote.clone()), cache.clone(), Arc::new(credentials))
        .with_notifier(notifier.clone());
    Harness {
        engine,
        remote,
        cache,
        notifier,
    }
}

pub fn server_id(raw: &str) -> EntityId {
    EntityId::Server(ServerId::new(raw))
}

pub fn rejected(status: u16, message: &str) -> RemoteError {
    RemoteError::Rejected {
        status,
        message: message.to_string(),
    }
}
