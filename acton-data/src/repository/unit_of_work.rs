//! Unit of work
//!
//! Owns a [`DataContext`], hands out cached repositories over its stores,
//! and turns the staged changes of all of them into a single commit. When an
//! audit recorder is attached, every committed change is described and
//! recorded after the save succeeds.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entity::{Entity, FieldAccess};
use crate::repository::read_only::ReadOnlyRepository;
use crate::repository::write::Repository;
use crate::repository::RepositoryResult;
use crate::store::{DataContext, StoreProvider};

/// Transaction-like boundary over a context and its repositories
///
/// # Example
///
/// ```rust,ignore
/// let uow = UnitOfWork::new(context).with_audit(Arc::new(TracingAuditRecorder));
/// let users = uow.repository::<User>();
/// users.add(new_user);
/// uow.commit_as("admin-7", CancellationToken::new()).await?;
/// ```
pub struct UnitOfWork<C: DataContext> {
    context: Arc<C>,
    recorder: Option<Arc<dyn AuditRecorder>>,
    repositories: DashMap<TypeId, Arc<dyn std::any::Any + Send + Sync>>,
}

impl<C: DataContext> UnitOfWork<C> {
    /// A unit of work over a context, without audit recording
    #[must_use]
    pub fn new(context: Arc<C>) -> Self {
        Self {
            context,
            recorder: None,
            repositories: DashMap::new(),
        }
    }

    /// Attach an audit recorder; committed changes will be described to it
    #[must_use]
    pub fn with_audit(mut self, recorder: Arc<dyn AuditRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// The underlying context
    #[must_use]
    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    /// The read-write repository for `T`, created on first use and cached
    pub fn repository<T>(&self) -> Arc<Repository<T, C::Store>>
    where
        T: Entity + FieldAccess,
        C: StoreProvider<T>,
    {
        let key = TypeId::of::<Repository<T, C::Store>>();
        let entry = self
            .repositories
            .entry(key)
            .or_insert_with(|| Arc::new(Repository::new(self.context.store())))
            .clone();
        entry
            .downcast::<Repository<T, C::Store>>()
            .unwrap_or_else(|_| Arc::new(Repository::new(self.context.store())))
    }

    /// The read-only repository for `T`, created on first use and cached
    pub fn read_only_repository<T>(&self) -> Arc<ReadOnlyRepository<T, C::Store>>
    where
        T: Entity + FieldAccess,
        C: StoreProvider<T>,
    {
        let key = TypeId::of::<ReadOnlyRepository<T, C::Store>>();
        let entry = self
            .repositories
            .entry(key)
            .or_insert_with(|| Arc::new(ReadOnlyRepository::new(self.context.store())))
            .clone();
        entry
            .downcast::<ReadOnlyRepository<T, C::Store>>()
            .unwrap_or_else(|_| Arc::new(ReadOnlyRepository::new(self.context.store())))
    }

    /// Commit all staged changes without a named user
    pub async fn commit(&self, cancellation: CancellationToken) -> RepositoryResult<usize> {
        self.commit_inner(None, cancellation).await
    }

    /// Commit all staged changes, attributing them to `user_id` in the audit
    /// trail
    pub async fn commit_as(
        &self,
        user_id: &str,
        cancellation: CancellationToken,
    ) -> RepositoryResult<usize> {
        self.commit_inner(Some(user_id), cancellation).await
    }

    async fn commit_inner(
        &self,
        user_id: Option<&str>,
        cancellation: CancellationToken,
    ) -> RepositoryResult<usize> {
        // Changes must be described before the save consumes them; entries
        // are recorded only after the save succeeds.
        let entries: Vec<AuditEntry> = match &self.recorder {
            Some(_) => self
                .context
                .tracked_changes()
                .into_iter()
                .map(|change| AuditEntry::from_change(change, user_id))
                .collect(),
            None => Vec::new(),
        };

        let applied = self.context.save_changes(cancellation).await?;
        debug!(applied, user_id = user_id.unwrap_or("system"), "commit");

        if let Some(recorder) = &self.recorder {
            if !entries.is_empty() {
                recorder.record(entries);
            }
        }
        Ok(applied)
    }

    /// Drop all staged changes
    pub fn rollback(&self) {
        self.context.discard_changes();
    }
}
