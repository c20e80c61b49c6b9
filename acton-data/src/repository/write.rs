//! Read-write repository
//!
//! Extends [`ReadOnlyRepository`] with staged mutations. Nothing is
//! persisted here: mutations accumulate in the store and take effect when
//! the owning unit of work commits.

use std::ops::Deref;
use std::sync::Arc;

use crate::entity::{Entity, FieldAccess};
use crate::repository::read_only::ReadOnlyRepository;
use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::EntityStore;

/// Specification-driven read-write access to one entity type
///
/// Derefs to [`ReadOnlyRepository`] for all query methods.
pub struct Repository<T: Entity, S: EntityStore<T>> {
    inner: ReadOnlyRepository<T, S>,
}

impl<T, S> Repository<T, S>
where
    T: Entity + FieldAccess,
    S: EntityStore<T>,
{
    /// A repository over a store
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            inner: ReadOnlyRepository::new(store),
        }
    }

    /// Stage an insertion
    pub fn add(&self, entity: T) {
        self.inner.store().stage_insert(entity);
    }

    /// Stage insertions for a batch of entities
    pub fn add_range(&self, entities: impl IntoIterator<Item = T>) {
        for entity in entities {
            self.add(entity);
        }
    }

    /// Stage a replacement of the entity with the same id
    pub fn update(&self, entity: T) {
        self.inner.store().stage_update(entity);
    }

    /// Stage replacements for a batch of entities
    pub fn update_range(&self, entities: impl IntoIterator<Item = T>) {
        for entity in entities {
            self.update(entity);
        }
    }

    /// Stage a removal
    pub fn delete(&self, entity: &T) {
        self.inner.store().stage_remove(entity.id());
    }

    /// Stage a removal by id, failing when no such entity is committed
    pub fn delete_by_id(&self, id: &T::Id) -> RepositoryResult<()> {
        if self.inner.store().get(id).is_none() {
            return Err(RepositoryError::NotFound {
                entity: T::entity_name(),
                id: id.to_string(),
            });
        }
        self.inner.store().stage_remove(id.clone());
        Ok(())
    }

    /// Stage removals for a batch of entities
    pub fn delete_range<'a>(&self, entities: impl IntoIterator<Item = &'a T>)
    where
        T: 'a,
    {
        for entity in entities {
            self.delete(entity);
        }
    }
}

impl<T, S> Deref for Repository<T, S>
where
    T: Entity + FieldAccess,
    S: EntityStore<T>,
{
    type Target = ReadOnlyRepository<T, S>;

    fn deref(&self) -> &ReadOnlyRepository<T, S> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use crate::store::{DataContext, MemoryStore};
    use serde::Serialize;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Note {
        id: i64,
        body: String,
    }

    impl Entity for Note {
        type Id = i64;

        fn id(&self) -> i64 {
            self.id
        }
    }

    impl FieldAccess for Note {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "id" => Some(self.id.into()),
                "body" => Some(self.body.clone().into()),
                _ => None,
            }
        }
    }

    fn note(id: i64, body: &str) -> Note {
        Note {
            id,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_mutations_stage_and_apply_on_save() {
        let store = Arc::new(MemoryStore::new());
        let repository = Repository::new(Arc::clone(&store));

        repository.add_range([note(1, "first"), note(2, "second")]);
        assert_eq!(store.pending_count(), 2);
        store.save_changes(CancellationToken::new()).await.unwrap();

        repository.update(note(1, "first, edited"));
        repository.delete(&note(2, "second"));
        store.save_changes(CancellationToken::new()).await.unwrap();

        assert_eq!(repository.find_by_id(&1).unwrap().body, "first, edited");
        assert!(repository.find_by_id(&2).is_err());
    }

    #[tokio::test]
    async fn test_delete_by_id_requires_committed_entity() {
        let store = Arc::new(MemoryStore::new());
        let repository = Repository::new(Arc::clone(&store));

        let err = repository.delete_by_id(&7).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        repository.add(note(7, "here"));
        store.save_changes(CancellationToken::new()).await.unwrap();
        repository.delete_by_id(&7).unwrap();
        store.save_changes(CancellationToken::new()).await.unwrap();
        assert!(repository.find_by_id(&7).is_err());
    }

    #[tokio::test]
    async fn test_deref_exposes_read_methods() {
        let store = Arc::new(MemoryStore::new());
        store.seed([note(1, "alpha")]);
        let repository = Repository::new(store);
        let all = repository.find_all(CancellationToken::new()).await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
