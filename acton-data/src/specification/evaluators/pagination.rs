//! Pagination step: applies the effective skip/take window
//!
//! A skip of zero is elided rather than forwarded, so backends see no
//! offset clause they would have to optimize away.

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::evaluators::{InMemoryEvaluator, QueryEvaluator};
use crate::specification::{EvaluationError, Specification};

/// Applies skip and take, whether set explicitly or via a pagination filter
pub struct PaginationEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for PaginationEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        let mut query = query;
        match specification.effective_skip() {
            Some(skip) if skip > 0 => query = query.skip(skip),
            _ => {}
        }
        if let Some(take) = specification.effective_take() {
            query = query.take(take);
        }
        Ok(query)
    }
}

impl<T: FieldAccess + Send + 'static> InMemoryEvaluator<T> for PaginationEvaluator {
    fn apply(
        &self,
        mut items: Vec<T>,
        specification: &Specification<T>,
    ) -> Result<Vec<T>, EvaluationError> {
        if let Some(skip) = specification.effective_skip() {
            let skip = usize::try_from(skip).unwrap_or(usize::MAX);
            if skip >= items.len() {
                items.clear();
            } else if skip > 0 {
                items.drain(..skip);
            }
        }
        if let Some(take) = specification.effective_take() {
            items.truncate(usize::try_from(take).unwrap_or(usize::MAX));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use crate::pagination::PaginationFilter;
    use crate::query::MemoryQuery;

    #[derive(Debug, Clone)]
    struct Row(i64);

    impl FieldAccess for Row {
        fn field(&self, name: &str) -> Option<FieldValue> {
            (name == "n").then(|| self.0.into())
        }
    }

    fn rows() -> Vec<Row> {
        (1..=10).map(Row).collect()
    }

    #[test]
    fn test_window_applied_in_memory() {
        let spec = Specification::<Row>::builder()
            .skip(3)
            .unwrap()
            .take(4)
            .unwrap()
            .build();
        let windowed = InMemoryEvaluator::apply(&PaginationEvaluator, rows(), &spec).unwrap();
        let values: Vec<i64> = windowed.iter().map(|r| r.0).collect();
        assert_eq!(values, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_pagination_filter_drives_window() {
        let spec = Specification::<Row>::builder()
            .with_pagination_filter(PaginationFilter::new(2, 3))
            .unwrap()
            .build();
        let windowed = InMemoryEvaluator::apply(&PaginationEvaluator, rows(), &spec).unwrap();
        let values: Vec<i64> = windowed.iter().map(|r| r.0).collect();
        assert_eq!(values, vec![4, 5, 6]);
    }

    #[test]
    fn test_zero_skip_elided_on_query_side() {
        let spec = Specification::<Row>::builder()
            .skip(0)
            .unwrap()
            .take(5)
            .unwrap()
            .build();
        let query = QueryEvaluator::apply(&PaginationEvaluator, MemoryQuery::new(rows()), &spec)
            .unwrap();
        assert_eq!(query.pending_skip(), None);
        assert_eq!(query.pending_take(), Some(5));
    }

    #[test]
    fn test_no_pagination_is_a_pass_through() {
        let spec = Specification::<Row>::builder().build();
        let query =
            QueryEvaluator::apply(&PaginationEvaluator, MemoryQuery::new(rows()), &spec).unwrap();
        assert_eq!(query.pending_skip(), None);
        assert_eq!(query.pending_take(), None);
    }
}
