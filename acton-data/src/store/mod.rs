//! Storage contracts
//!
//! [`EntityStore`] is what a repository sits on: a queryable source of one
//! entity type plus staged mutations. [`DataContext`] is the commit boundary
//! shared by every store participating in a unit of work: it exposes the
//! staged changes for audit inspection and persists or discards them as one
//! batch. Nothing here touches a concrete database; backends implement these
//! traits, and [`MemoryStore`] provides the in-process implementation.

pub mod include_loaders;
pub mod memory;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::entity::Entity;
use crate::query::{QueryError, Queryable};

pub use include_loaders::{IncludeLoader, IncludeLoaderRegistry};
pub use memory::MemoryStore;

/// The kind of a staged mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new entity will be inserted
    Insert,
    /// An existing entity will be replaced
    Update,
    /// An existing entity will be removed
    Remove,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// A staged mutation described for audit purposes
///
/// Old and new values are JSON snapshots taken against the committed state
/// at description time; either side is absent when the mutation has no
/// before or after image.
#[derive(Debug, Clone)]
pub struct ChangeDescriptor {
    /// Entity type name
    pub entity_name: &'static str,
    /// Mutation kind
    pub kind: ChangeKind,
    /// Rendered primary key
    pub key: String,
    /// Committed state before the change, if the entity exists
    pub old: Option<Value>,
    /// State after the change, absent for removals
    pub new: Option<Value>,
}

/// A queryable store of one entity type with staged mutations
///
/// Mutations are staged, not applied; they take effect when the owning
/// [`DataContext`] saves.
pub trait EntityStore<T: Entity>: Send + Sync {
    /// The queryable this store produces
    type Query: Queryable<T>;

    /// A query over the committed state
    fn query(&self) -> Self::Query;

    /// Fetch one entity by id from the committed state
    fn get(&self, id: &T::Id) -> Option<T>;

    /// Stage an insertion
    fn stage_insert(&self, entity: T);

    /// Stage a replacement of the entity with the same id
    fn stage_update(&self, entity: T);

    /// Stage a removal by id
    fn stage_remove(&self, id: T::Id);
}

/// The commit boundary over one or more stores
pub trait DataContext: Send + Sync {
    /// Describe all staged changes, in staging order
    fn tracked_changes(&self) -> Vec<ChangeDescriptor>;

    /// Persist all staged changes as one batch
    ///
    /// Returns the number of changes applied. Staged changes are consumed
    /// on success.
    fn save_changes(
        &self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<usize, QueryError>> + Send;

    /// Drop all staged changes without applying them
    fn discard_changes(&self);
}

/// Supplies the store for entity type `T` within a context
///
/// A context implements this once per entity type it manages; the unit of
/// work uses it to construct repositories on demand.
pub trait StoreProvider<T: Entity>: DataContext {
    /// The store type for `T`
    type Store: EntityStore<T> + 'static;

    /// The store instance
    fn store(&self) -> Arc<Self::Store>;
}
