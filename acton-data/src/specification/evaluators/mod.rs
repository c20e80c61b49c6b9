//! Specification evaluation pipelines
//!
//! Each evaluator applies one slice of a specification to a query source.
//! The orchestrators run them in a fixed order: filters, search, eager
//! loads, ordering, pagination, backend hints, grouping, caching. Custom
//! pipelines can be assembled by passing an explicit evaluator list; the
//! `Default` orchestrators build the standard chain.
//!
//! The in-memory pipeline is intentionally shorter (filters, search,
//! ordering, pagination): backend hints are meaningless against a `Vec`, and
//! post-processing runs after everything else.

mod filter;
mod flags;
mod group_by;
mod include;
mod order;
mod pagination;
mod projection;
pub(crate) mod search;

pub use filter::WhereEvaluator;
pub use flags::{CachingEvaluator, IgnoreFiltersEvaluator, SplitQueryEvaluator, TrackingEvaluator};
pub use group_by::GroupByEvaluator;
pub use include::IncludeEvaluator;
pub use order::OrderEvaluator;
pub use pagination::PaginationEvaluator;
pub use search::SearchEvaluator;

use tracing::trace;

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::{EvaluationError, ProjectionSpecification, Specification};

/// One step of the query-side evaluation pipeline
pub trait QueryEvaluator<T, Q: Queryable<T>>: Send + Sync {
    /// Whether this step shapes the row criteria (filters, search) rather
    /// than the result presentation
    ///
    /// Criteria evaluators are the only ones that run for existence and
    /// count queries.
    fn is_criteria_evaluator(&self) -> bool {
        false
    }

    /// Apply this step's slice of the specification to the query
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError>;
}

/// One step of the in-memory evaluation pipeline
pub trait InMemoryEvaluator<T>: Send + Sync {
    /// Apply this step's slice of the specification to materialized items
    fn apply(
        &self,
        items: Vec<T>,
        specification: &Specification<T>,
    ) -> Result<Vec<T>, EvaluationError>;
}

/// Ordered evaluation pipeline against a [`Queryable`] backend
pub struct SpecificationEvaluator<T, Q: Queryable<T>> {
    evaluators: Vec<Box<dyn QueryEvaluator<T, Q>>>,
}

impl<T, Q> SpecificationEvaluator<T, Q>
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    /// A pipeline with an explicit evaluator list, applied in order
    #[must_use]
    pub fn new(evaluators: Vec<Box<dyn QueryEvaluator<T, Q>>>) -> Self {
        Self { evaluators }
    }

    /// Apply the full pipeline
    pub fn apply(
        &self,
        query: Q,
        specification: &Specification<T>,
    ) -> Result<Q, EvaluationError> {
        trace!(evaluators = self.evaluators.len(), "applying specification");
        self.evaluators
            .iter()
            .try_fold(query, |query, evaluator| {
                evaluator.apply(query, specification)
            })
    }

    /// Apply only the criteria evaluators (filters and search)
    ///
    /// Used for count and existence queries, where ordering, pagination,
    /// and presentation hints must not alter the row set.
    pub fn apply_criteria_only(
        &self,
        query: Q,
        specification: &Specification<T>,
    ) -> Result<Q, EvaluationError> {
        self.evaluators
            .iter()
            .filter(|evaluator| evaluator.is_criteria_evaluator())
            .try_fold(query, |query, evaluator| {
                evaluator.apply(query, specification)
            })
    }

    /// Apply the full pipeline, then project through the specification's
    /// selector or mapping configuration
    pub fn apply_projected<R: Send + 'static>(
        &self,
        query: Q,
        specification: &ProjectionSpecification<T, R>,
    ) -> Result<Q::Projected<R>, EvaluationError> {
        let projector = specification.projector()?;
        let shaped = self.apply(query, specification)?;
        Ok(shaped.select(projector))
    }
}

impl<T, Q> Default for SpecificationEvaluator<T, Q>
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn default() -> Self {
        Self::new(vec![
            Box::new(WhereEvaluator),
            Box::new(SearchEvaluator),
            Box::new(IncludeEvaluator),
            Box::new(OrderEvaluator),
            Box::new(PaginationEvaluator),
            Box::new(TrackingEvaluator),
            Box::new(SplitQueryEvaluator),
            Box::new(IgnoreFiltersEvaluator),
            Box::new(GroupByEvaluator),
            Box::new(CachingEvaluator),
        ])
    }
}

/// Ordered evaluation pipeline over already-materialized items
pub struct InMemorySpecificationEvaluator<T> {
    evaluators: Vec<Box<dyn InMemoryEvaluator<T>>>,
}

impl<T: FieldAccess + Send + 'static> InMemorySpecificationEvaluator<T> {
    /// A pipeline with an explicit evaluator list, applied in order
    #[must_use]
    pub fn new(evaluators: Vec<Box<dyn InMemoryEvaluator<T>>>) -> Self {
        Self { evaluators }
    }

    /// Evaluate a specification over items, post-processing last
    pub fn evaluate(
        &self,
        items: Vec<T>,
        specification: &Specification<T>,
    ) -> Result<Vec<T>, EvaluationError> {
        let items = self
            .evaluators
            .iter()
            .try_fold(items, |items, evaluator| {
                evaluator.apply(items, specification)
            })?;
        Ok(match specification.post_processor() {
            Some(action) => action(items),
            None => items,
        })
    }

    /// Evaluate a projection specification over items
    ///
    /// Requires the explicit selector; mapping configurations serve the
    /// query-side path only.
    pub fn evaluate_projected<R>(
        &self,
        items: Vec<T>,
        specification: &ProjectionSpecification<T, R>,
    ) -> Result<Vec<R>, EvaluationError>
    where
        R: Send + 'static,
    {
        let projector = projection::resolve_in_memory_projector(specification)?;
        let items = self
            .evaluators
            .iter()
            .try_fold(items, |items, evaluator| {
                evaluator.apply(items, specification)
            })?;
        let projected: Vec<R> = items.into_iter().map(|item| projector(item)).collect();
        Ok(match specification.post_processor() {
            Some(action) => action(projected),
            None => projected,
        })
    }
}

impl<T: FieldAccess + Send + 'static> Default for InMemorySpecificationEvaluator<T> {
    fn default() -> Self {
        Self::new(vec![
            Box::new(WhereEvaluator),
            Box::new(SearchEvaluator),
            Box::new(OrderEvaluator),
            Box::new(PaginationEvaluator),
        ])
    }
}
