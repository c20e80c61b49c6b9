//! In-process entity store
//!
//! [`MemoryStore`] keeps committed rows in a map and staged mutations in a
//! pending list, giving it real commit semantics: queries see only committed
//! state, staged changes become visible when the context saves, and a
//! discard drops them without a trace. It backs tests and in-process
//! deployments with the same repository and unit-of-work code paths a
//! database-backed store would use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entity::{Entity, FieldAccess};
use crate::query::{MemoryQuery, QueryError};
use crate::store::include_loaders::IncludeLoaderRegistry;
use crate::store::{ChangeDescriptor, ChangeKind, DataContext, EntityStore};

enum Staged<T: Entity> {
    Insert(T),
    Update(T),
    Remove(T::Id),
}

/// A map-backed store with staged mutations
pub struct MemoryStore<T: Entity> {
    rows: RwLock<HashMap<T::Id, T>>,
    pending: Mutex<Vec<Staged<T>>>,
    loaders: Arc<IncludeLoaderRegistry>,
}

impl<T> MemoryStore<T>
where
    T: Entity + FieldAccess + Serialize + Clone,
{
    /// An empty store with no include loaders
    #[must_use]
    pub fn new() -> Self {
        Self::with_loaders(Arc::new(IncludeLoaderRegistry::new()))
    }

    /// An empty store whose queries resolve includes through `loaders`
    #[must_use]
    pub fn with_loaders(loaders: Arc<IncludeLoaderRegistry>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            loaders,
        }
    }

    /// Write entities directly into committed state, bypassing staging
    pub fn seed(&self, entities: impl IntoIterator<Item = T>) {
        let mut rows = self
            .rows
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for entity in entities {
            rows.insert(entity.id(), entity);
        }
    }

    /// Number of staged, uncommitted mutations
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of committed rows
    pub fn committed_count(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn snapshot(&self, id: &T::Id) -> Option<serde_json::Value> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .and_then(|entity| serde_json::to_value(entity).ok())
    }
}

impl<T> Default for MemoryStore<T>
where
    T: Entity + FieldAccess + Serialize + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityStore<T> for MemoryStore<T>
where
    T: Entity + FieldAccess + Serialize + Clone,
{
    type Query = MemoryQuery<T>;

    fn query(&self) -> MemoryQuery<T> {
        let rows: Vec<T> = self
            .rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        MemoryQuery::with_loaders(rows, Arc::clone(&self.loaders))
    }

    fn get(&self, id: &T::Id) -> Option<T> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn stage_insert(&self, entity: T) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Staged::Insert(entity));
    }

    fn stage_update(&self, entity: T) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Staged::Update(entity));
    }

    fn stage_remove(&self, id: T::Id) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Staged::Remove(id));
    }
}

impl<T> DataContext for MemoryStore<T>
where
    T: Entity + FieldAccess + Serialize + Clone,
{
    fn tracked_changes(&self) -> Vec<ChangeDescriptor> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending
            .iter()
            .map(|staged| match staged {
                Staged::Insert(entity) => ChangeDescriptor {
                    entity_name: T::entity_name(),
                    kind: ChangeKind::Insert,
                    key: entity.id().to_string(),
                    old: None,
                    new: serde_json::to_value(entity).ok(),
                },
                Staged::Update(entity) => ChangeDescriptor {
                    entity_name: T::entity_name(),
                    kind: ChangeKind::Update,
                    key: entity.id().to_string(),
                    old: self.snapshot(&entity.id()),
                    new: serde_json::to_value(entity).ok(),
                },
                Staged::Remove(id) => ChangeDescriptor {
                    entity_name: T::entity_name(),
                    kind: ChangeKind::Remove,
                    key: id.to_string(),
                    old: self.snapshot(id),
                    new: None,
                },
            })
            .collect()
    }

    async fn save_changes(&self, cancellation: CancellationToken) -> Result<usize, QueryError> {
        if cancellation.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        let staged: Vec<Staged<T>> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let count = staged.len();
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        for change in staged {
            match change {
                Staged::Insert(entity) | Staged::Update(entity) => {
                    rows.insert(entity.id(), entity);
                }
                Staged::Remove(id) => {
                    rows.remove(&id);
                }
            }
        }
        debug!(entity = T::entity_name(), count, "applied staged changes");
        Ok(count)
    }

    fn discard_changes(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use crate::filter::FilterCondition;
    use crate::query::Queryable;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Device {
        id: i64,
        hostname: String,
        online: bool,
    }

    impl Entity for Device {
        type Id = i64;

        fn id(&self) -> i64 {
            self.id
        }
    }

    impl FieldAccess for Device {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "id" => Some(self.id.into()),
                "hostname" => Some(self.hostname.clone().into()),
                "online" => Some(self.online.into()),
                _ => None,
            }
        }
    }

    fn device(id: i64, hostname: &str) -> Device {
        Device {
            id,
            hostname: hostname.to_string(),
            online: true,
        }
    }

    #[tokio::test]
    async fn test_staged_insert_invisible_until_save() {
        let store = MemoryStore::<Device>::new();
        store.stage_insert(device(1, "alpha"));
        assert_eq!(store.committed_count(), 0);
        assert!(store.get(&1).is_none());

        let applied = store.save_changes(CancellationToken::new()).await.unwrap();
        assert_eq!(applied, 1);
        assert_eq!(store.get(&1).unwrap().hostname, "alpha");
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_query_sees_committed_state_only() {
        let store = MemoryStore::<Device>::new();
        store.seed([device(1, "alpha"), device(2, "beta")]);
        store.stage_insert(device(3, "gamma"));

        let rows = store
            .query()
            .filter(&FilterCondition::is_not_null("hostname"))
            .to_list(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_remove_apply_on_save() {
        let store = MemoryStore::<Device>::new();
        store.seed([device(1, "alpha"), device(2, "beta")]);

        let mut updated = device(1, "alpha-renamed");
        updated.online = false;
        store.stage_update(updated);
        store.stage_remove(2);
        store.save_changes(CancellationToken::new()).await.unwrap();

        assert_eq!(store.get(&1).unwrap().hostname, "alpha-renamed");
        assert!(store.get(&2).is_none());
    }

    #[test]
    fn test_tracked_changes_carry_old_and_new_snapshots() {
        let store = MemoryStore::<Device>::new();
        store.seed([device(1, "alpha")]);

        store.stage_insert(device(2, "beta"));
        store.stage_update(device(1, "alpha-v2"));
        store.stage_remove(1);

        let changes = store.tracked_changes();
        assert_eq!(changes.len(), 3);

        assert_eq!(changes[0].kind, ChangeKind::Insert);
        assert!(changes[0].old.is_none());
        assert_eq!(changes[0].new.as_ref().unwrap()["hostname"], "beta");

        assert_eq!(changes[1].kind, ChangeKind::Update);
        assert_eq!(changes[1].old.as_ref().unwrap()["hostname"], "alpha");
        assert_eq!(changes[1].new.as_ref().unwrap()["hostname"], "alpha-v2");

        assert_eq!(changes[2].kind, ChangeKind::Remove);
        assert!(changes[2].new.is_none());
        assert_eq!(changes[2].entity_name, "Device");
    }

    #[tokio::test]
    async fn test_discard_drops_staged_changes() {
        let store = MemoryStore::<Device>::new();
        store.stage_insert(device(1, "alpha"));
        store.discard_changes();
        assert_eq!(store.pending_count(), 0);
        store.save_changes(CancellationToken::new()).await.unwrap();
        assert_eq!(store.committed_count(), 0);
    }

    #[tokio::test]
    async fn test_save_respects_cancellation() {
        let store = MemoryStore::<Device>::new();
        store.stage_insert(device(1, "alpha"));
        let token = CancellationToken::new();
        token.cancel();
        let err = store.save_changes(token).await.unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
        // Staged work survives a cancelled save.
        assert_eq!(store.pending_count(), 1);
    }
}
