//! Reconciling state container.
//!
//! [`Collection`] holds the current in-memory belief about one entity
//! collection. It only mutates memory; mirroring to the local cache is the
//! caller's job.

use thiserror::Error;

use crate::domain::{Entity, EntityId, TempId, Timestamp};

/// Errors raised by the state container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No entity with the given identifier is held.
    #[error("Entity not found: {0}")]
    NotFound(EntityId),
}

/// An ordered collection of entities, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<E: Entity> {
    items: Vec<E>,
}

impl<E: Entity> Default for Collection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Collection<E> {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates a collection holding `items` in the given order.
    #[must_use]
    pub const fn from_snapshot(items: Vec<E>) -> Self {
        Self { items }
    }

    /// Returns a copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<E> {
        self.items.clone()
    }

    /// Borrows the current contents.
    #[must_use]
    pub fn as_slice(&self) -> &[E] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an entity by identifier.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Inserts an optimistically created entity at the front.
    pub fn apply_optimistic_create(&mut self, entity: E) {
        self.items.insert(0, entity);
    }

    /// Replaces the entity known by `temp_id` with its confirmed record.
    ///
    /// Returns `false` without touching anything if no entity carries
    /// `temp_id` (the optimistic record was already settled or removed).
    pub fn apply_server_replace(&mut self, temp_id: &TempId, confirmed: E) -> bool {
        let id = EntityId::Temporary(*temp_id);
        match self.position(&id) {
            Some(index) => {
                self.items[index] = confirmed;
                true
            }
            None => false,
        }
    }

    /// Merges `changes` into the entity with identifier `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no entity has `id`.
    pub fn apply_update(
        &mut self,
        id: &EntityId,
        changes: &E::Changes,
        now: Timestamp,
    ) -> Result<&E, StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let entity = &mut self.items[index];
        entity.apply(changes, now);
        Ok(entity)
    }

    /// Removes the entity with identifier `id`.
    ///
    /// Returns the removed entity together with the position it occupied,
    /// which [`Collection::restore`] accepts for reinsertion.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no entity has `id`.
    pub fn apply_delete(&mut self, id: &EntityId) -> Result<(usize, E), StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok((index, self.items.remove(index)))
    }

    /// Overwrites the entity with identifier `id` with `entity`.
    ///
    /// `entity` may carry a different identifier (e.g. a normalized record).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no entity has `id`.
    pub fn replace(&mut self, id: &EntityId, entity: E) -> Result<(), StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.items[index] = entity;
        Ok(())
    }

    /// Reinserts a removed entity at `position`, clamped to the current length.
    ///
    /// Does nothing if an entity with the same identifier is already present.
    pub fn restore(&mut self, position: usize, entity: E) {
        if self.position(entity.id()).is_some() {
            return;
        }
        let position = position.min(self.items.len());
        self.items.insert(position, entity);
    }

    /// Replaces the whole contents, e.g. after a full refetch.
    pub fn replace_all(&mut self, items: Vec<E>) {
        self.items = items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ServerId, Task, TaskChanges};
    use rstest::{fixture, rstest};

    fn server(id: &str) -> EntityId {
        EntityId::Server(ServerId::new(id))
    }

    #[fixture]
    fn collection() -> Collection<Task> {
        Collection::from_snapshot(vec![
            Task::new(ServerId::new("b"), "Second"),
            Task::new(ServerId::new("a"), "First"),
        ])
    }

    #[rstest]
    fn test_optimistic_create_prepends(mut collection: Collection<Task>) {
        let temp = TempId::generate();
        collection.apply_optimistic_create(Task::new(temp, "Third"));
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.as_slice()[0].id, EntityId::Temporary(temp));
    }

    #[rstest]
    fn test_server_replace_swaps_temporary_record(mut collection: Collection<Task>) {
        let temp = TempId::generate();
        collection.apply_optimistic_create(Task::new(temp, "Third"));

        let replaced = collection.apply_server_replace(&temp, Task::new(ServerId::new("c"), "Third"));

        assert!(replaced);
        assert!(collection.get(&EntityId::Temporary(temp)).is_none());
        assert_eq!(collection.as_slice()[0].id, server("c"));
        assert_eq!(collection.len(), 3);
    }

    #[rstest]
    fn test_server_replace_without_match_is_noop(mut collection: Collection<Task>) {
        let before = collection.snapshot();
        let replaced = collection
            .apply_server_replace(&TempId::generate(), Task::new(ServerId::new("c"), "Third"));
        assert!(!replaced);
        assert_eq!(collection.snapshot(), before);
    }

    #[rstest]
    fn test_update_merges_fields(mut collection: Collection<Task>) {
        let changes = TaskChanges {
            is_completed: Some(true),
            ..TaskChanges::default()
        };
        let updated = collection
            .apply_update(&server("a"), &changes, Timestamp::now())
            .unwrap();
        assert!(updated.is_completed);
        assert_eq!(updated.title, "First");
    }

    #[rstest]
    fn test_update_missing_entity_is_not_found(mut collection: Collection<Task>) {
        let result = collection.apply_update(&server("zzz"), &TaskChanges::default(), Timestamp::now());
        assert_eq!(result, Err(StoreError::NotFound(server("zzz"))));
    }

    #[rstest]
    fn test_delete_and_restore_keeps_position(mut collection: Collection<Task>) {
        let before = collection.snapshot();
        let (position, removed) = collection.apply_delete(&server("b")).unwrap();
        assert_eq!(position, 0);
        assert_eq!(collection.len(), 1);

        collection.restore(position, removed);
        assert_eq!(collection.snapshot(), before);
    }

    #[rstest]
    fn test_delete_missing_entity_is_not_found(mut collection: Collection<Task>) {
        assert_eq!(
            collection.apply_delete(&server("zzz")),
            Err(StoreError::NotFound(server("zzz")))
        );
    }

    #[rstest]
    fn test_restore_clamps_position_and_skips_duplicates(mut collection: Collection<Task>) {
        collection.restore(99, Task::new(ServerId::new("z"), "Last"));
        assert_eq!(collection.as_slice()[2].id, server("z"));

        collection.restore(0, Task::new(ServerId::new("z"), "Duplicate"));
        assert_eq!(collection.len(), 3);
    }

    #[rstest]
    fn test_replace_overwrites(mut collection: Collection<Task>) {
        collection
            .replace(&server("a"), Task::new(ServerId::new("a"), "Renamed"))
            .unwrap();
        assert_eq!(collection.get(&server("a")).unwrap().title, "Renamed");
    }
}
