//! Read-side repository
//!
//! Wraps an [`EntityStore`] and evaluates specifications against its
//! queries. All methods take a [`CancellationToken`]; a cancelled token
//! aborts materialization before any rows are produced.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entity::{Entity, FieldAccess};
use crate::query::{ProjectedQueryable, Queryable};
use crate::repository::{RepositoryError, RepositoryResult};
use crate::specification::evaluators::SpecificationEvaluator;
use crate::specification::{ProjectionSpecification, Specification};
use crate::store::EntityStore;

/// Specification-driven read access to one entity type
///
/// # Example
///
/// ```rust,ignore
/// let repository = ReadOnlyRepository::new(Arc::clone(&store));
/// let spec = Specification::<User>::builder()
///     .filter(FilterCondition::eq("active", true))?
///     .order_by("name")?
///     .build();
/// let users = repository.find(&spec, CancellationToken::new()).await?;
/// ```
pub struct ReadOnlyRepository<T: Entity, S: EntityStore<T>> {
    store: Arc<S>,
    evaluator: SpecificationEvaluator<T, S::Query>,
}

impl<T, S> ReadOnlyRepository<T, S>
where
    T: Entity + FieldAccess,
    S: EntityStore<T>,
{
    /// A repository over a store, using the standard evaluation pipeline
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            evaluator: SpecificationEvaluator::default(),
        }
    }

    /// A repository with a custom evaluation pipeline
    #[must_use]
    pub fn with_evaluator(store: Arc<S>, evaluator: SpecificationEvaluator<T, S::Query>) -> Self {
        Self { store, evaluator }
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch one entity by id
    pub fn find_by_id(&self, id: &T::Id) -> RepositoryResult<T> {
        self.store.get(id).ok_or_else(|| RepositoryError::NotFound {
            entity: T::entity_name(),
            id: id.to_string(),
        })
    }

    /// The first entity matching the specification, if any
    ///
    /// Post-processing does not run for single-result lookups.
    pub async fn find_one(
        &self,
        specification: &Specification<T>,
        cancellation: CancellationToken,
    ) -> RepositoryResult<Option<T>> {
        let query = self.evaluator.apply(self.store.query(), specification)?;
        Ok(query.first_or_default(cancellation).await?)
    }

    /// All entities matching the specification
    pub async fn find(
        &self,
        specification: &Specification<T>,
        cancellation: CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        let query = self.evaluator.apply(self.store.query(), specification)?;
        let rows = query.to_list(cancellation).await?;
        debug!(
            entity = T::entity_name(),
            rows = rows.len(),
            "specification query materialized"
        );
        Ok(match specification.post_processor() {
            Some(action) => action(rows),
            None => rows,
        })
    }

    /// All entities matching the specification, projected into `R`
    pub async fn find_projected<R: Send + 'static>(
        &self,
        specification: &ProjectionSpecification<T, R>,
        cancellation: CancellationToken,
    ) -> RepositoryResult<Vec<R>> {
        let projected = self
            .evaluator
            .apply_projected(self.store.query(), specification)?;
        let rows = projected.to_list(cancellation).await?;
        Ok(match specification.post_processor() {
            Some(action) => action(rows),
            None => rows,
        })
    }

    /// All entities, unshaped
    pub async fn find_all(&self, cancellation: CancellationToken) -> RepositoryResult<Vec<T>> {
        Ok(self.store.query().to_list(cancellation).await?)
    }

    /// Count entities, optionally restricted to a specification's criteria
    ///
    /// Only filters and search participate; ordering and pagination never
    /// change a count.
    pub async fn count(
        &self,
        specification: Option<&Specification<T>>,
        cancellation: CancellationToken,
    ) -> RepositoryResult<u64> {
        let query = match specification {
            Some(spec) => self.evaluator.apply_criteria_only(self.store.query(), spec)?,
            None => self.store.query(),
        };
        Ok(query.long_count(cancellation).await?)
    }

    /// Whether any entity matches the specification's criteria
    pub async fn exists_where(
        &self,
        specification: &Specification<T>,
        cancellation: CancellationToken,
    ) -> RepositoryResult<bool> {
        let query = self
            .evaluator
            .apply_criteria_only(self.store.query(), specification)?;
        Ok(query.first_or_default(cancellation).await?.is_some())
    }
}
