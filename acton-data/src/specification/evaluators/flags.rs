//! Hint steps: tracking, split query, query-filter bypass, caching
//!
//! These forward backend hints; backends without the concept inherit the
//! trait's no-op defaults, so the steps are always safe to run.

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::evaluators::QueryEvaluator;
use crate::specification::{EvaluationError, Specification};

/// Forwards the tracking mode
pub struct TrackingEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for TrackingEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        Ok(query.with_tracking(specification.tracking_mode()))
    }
}

/// Forwards the split-query hint when set
pub struct SplitQueryEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for SplitQueryEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        Ok(if specification.is_split_query() {
            query.as_split_query()
        } else {
            query
        })
    }
}

/// Forwards the query-filter bypass when set
pub struct IgnoreFiltersEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for IgnoreFiltersEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        Ok(if specification.ignores_query_filters() {
            query.ignore_query_filters()
        } else {
            query
        })
    }
}

/// Forwards the caching hint when set
pub struct CachingEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for CachingEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        Ok(match specification.cache_hint() {
            Some(hint) => query.with_cache(hint),
            None => query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use crate::query::{MemoryQuery, TrackingMode};

    #[derive(Debug, Clone)]
    struct Item;

    impl FieldAccess for Item {
        fn field(&self, _name: &str) -> Option<FieldValue> {
            None
        }
    }

    #[test]
    fn test_tracking_mode_recorded_on_query() {
        let spec = Specification::<Item>::builder().as_tracking().build();
        let query =
            QueryEvaluator::apply(&TrackingEvaluator, MemoryQuery::new(vec![Item]), &spec)
                .unwrap();
        assert_eq!(query.tracking(), TrackingMode::Tracking);
    }

    #[test]
    fn test_hints_are_pass_through_for_memory_backend() {
        let spec = Specification::<Item>::builder()
            .as_split_query()
            .ignore_query_filters()
            .with_caching()
            .build();
        let query = MemoryQuery::new(vec![Item]);
        let query = QueryEvaluator::apply(&SplitQueryEvaluator, query, &spec).unwrap();
        let query = QueryEvaluator::apply(&IgnoreFiltersEvaluator, query, &spec).unwrap();
        // No panic, no behavior change; hints are advisory.
        QueryEvaluator::apply(&CachingEvaluator, query, &spec).unwrap();
    }
}
