//! Filter step: applies where-expressions, combined with AND

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::evaluators::{InMemoryEvaluator, QueryEvaluator};
use crate::specification::{EvaluationError, Specification};

/// Applies every filter directive to the query
pub struct WhereEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for WhereEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn is_criteria_evaluator(&self) -> bool {
        true
    }

    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        Ok(specification
            .where_expressions()
            .iter()
            .fold(query, |query, expression| {
                query.filter(expression.condition())
            }))
    }
}

impl<T: FieldAccess + Send + 'static> InMemoryEvaluator<T> for WhereEvaluator {
    fn apply(
        &self,
        mut items: Vec<T>,
        specification: &Specification<T>,
    ) -> Result<Vec<T>, EvaluationError> {
        let expressions = specification.where_expressions();
        if !expressions.is_empty() {
            items.retain(|item| expressions.iter().all(|expression| expression.matches(item)));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use crate::filter::FilterCondition;

    #[derive(Debug, Clone, PartialEq)]
    struct Reading {
        sensor: String,
        value: i64,
    }

    impl FieldAccess for Reading {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "sensor" => Some(self.sensor.clone().into()),
                "value" => Some(self.value.into()),
                _ => None,
            }
        }
    }

    fn readings() -> Vec<Reading> {
        vec![
            Reading {
                sensor: "a".to_string(),
                value: 10,
            },
            Reading {
                sensor: "b".to_string(),
                value: 20,
            },
            Reading {
                sensor: "a".to_string(),
                value: 30,
            },
        ]
    }

    #[test]
    fn test_conditions_combine_with_and() {
        let spec = Specification::<Reading>::builder()
            .filter(FilterCondition::eq("sensor", "a"))
            .unwrap()
            .filter(FilterCondition::gt("value", 15_i64))
            .unwrap()
            .build();
        let kept = InMemoryEvaluator::apply(&WhereEvaluator, readings(), &spec).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].value, 30);
    }

    #[test]
    fn test_no_filters_passes_everything_through() {
        let spec = Specification::<Reading>::builder().build();
        let kept = InMemoryEvaluator::apply(&WhereEvaluator, readings(), &spec).unwrap();
        assert_eq!(kept.len(), 3);
    }
}
