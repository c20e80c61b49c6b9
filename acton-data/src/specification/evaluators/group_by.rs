//! Group step: forwards the grouping field to the backend

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::evaluators::QueryEvaluator;
use crate::specification::{EvaluationError, Specification};

/// Forwards the group-by field, if one is set
pub struct GroupByEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for GroupByEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        Ok(match specification.group_by() {
            Some(field) => query.group_by(field),
            None => query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use crate::query::{MemoryQuery, Queryable as _};
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone)]
    struct Event {
        name: String,
        severity: i64,
    }

    impl FieldAccess for Event {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "name" => Some(self.name.clone().into()),
                "severity" => Some(self.severity.into()),
                _ => None,
            }
        }
    }

    fn event(name: &str, severity: i64) -> Event {
        Event {
            name: name.to_string(),
            severity,
        }
    }

    #[tokio::test]
    async fn test_groups_flatten_in_first_appearance_order() {
        let spec = Specification::<Event>::builder().group_by("severity").build();
        let items = vec![event("a", 2), event("b", 1), event("c", 2), event("d", 1)];
        let rows = QueryEvaluator::apply(&GroupByEvaluator, MemoryQuery::new(items), &spec)
            .unwrap()
            .to_list(CancellationToken::new())
            .await
            .unwrap();
        let names: Vec<&str> = rows.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b", "d"]);
    }
}
