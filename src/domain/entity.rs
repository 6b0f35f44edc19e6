//! Entity abstraction shared by tasks and goals.
//!
//! The synchronization machinery is written once against these traits;
//! [`Task`](super::Task) and [`Goal`](super::Goal) plug into it.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{EntityId, Timestamp};

/// A record kept in a synchronized collection.
pub trait Entity:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Payload used to create a new entity (no identifier).
    type Draft: Clone + Debug + Serialize + Send + Sync + 'static;

    /// Partial update payload.
    type Changes: Clone + Debug + Default + Serialize + Send + Sync + 'static;

    /// Collection name, used as the cache key suffix and the REST path segment.
    const COLLECTION: &'static str;

    /// Human-readable kind, used in notifications.
    const KIND: &'static str;

    /// Returns the identifier the entity is currently known by.
    fn id(&self) -> &EntityId;

    /// Builds the optimistic record for `draft`, before the server has seen it.
    fn from_draft(id: EntityId, draft: &Self::Draft, now: Timestamp) -> Self;

    /// Merges `changes` into the entity.
    fn apply(&mut self, changes: &Self::Changes, now: Timestamp);
}

/// An entity with a boolean completion flag.
pub trait Completable: Entity {
    /// Returns the current value of the flag.
    fn is_completed(&self) -> bool;

    /// Builds the changes that set the flag to `completed` and nothing else.
    fn completion_changes(completed: bool) -> Self::Changes;
}
