//! Order step: applies the sort chain, primary first
//!
//! The builder already rejects a second primary directive; the evaluator
//! re-checks so that a hand-assembled specification cannot slip a broken
//! chain past the pipeline.

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::evaluators::{InMemoryEvaluator, QueryEvaluator};
use crate::specification::{EvaluationError, Specification, SpecificationError};

/// Applies the order directives to the query
pub struct OrderEvaluator;

fn check_single_primary<T: FieldAccess>(
    specification: &Specification<T>,
) -> Result<(), EvaluationError> {
    let primaries = specification
        .order_expressions()
        .iter()
        .filter(|expression| expression.kind().is_primary())
        .count();
    if primaries > 1 {
        return Err(SpecificationError::DuplicateOrderChain.into());
    }
    Ok(())
}

impl<T, Q> QueryEvaluator<T, Q> for OrderEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        check_single_primary(specification)?;
        Ok(specification
            .order_expressions()
            .iter()
            .fold(query, |query, expression| query.order(expression)))
    }
}

impl<T: FieldAccess + Send + 'static> InMemoryEvaluator<T> for OrderEvaluator {
    fn apply(
        &self,
        mut items: Vec<T>,
        specification: &Specification<T>,
    ) -> Result<Vec<T>, EvaluationError> {
        check_single_primary(specification)?;
        let expressions = specification.order_expressions();
        if expressions.is_empty() {
            return Ok(items);
        }
        items.sort_by(|a, b| {
            for expression in expressions {
                let mut ordering = expression.key_of(a).sort_cmp(&expression.key_of(b));
                if expression.kind().is_descending() {
                    ordering = ordering.reverse();
                }
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use crate::specification::{OrderExpression, OrderKind};

    #[derive(Debug, Clone)]
    struct Player {
        name: String,
        score: i64,
    }

    impl FieldAccess for Player {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "name" => Some(self.name.clone().into()),
                "score" => Some(self.score.into()),
                _ => None,
            }
        }
    }

    fn player(name: &str, score: i64) -> Player {
        Player {
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_sorts_by_chain() {
        let spec = Specification::<Player>::builder()
            .order_by_descending("score")
            .unwrap()
            .then_by("name")
            .unwrap()
            .build();
        let items = vec![player("carol", 10), player("alice", 20), player("bob", 20)];
        let sorted = InMemoryEvaluator::apply(&OrderEvaluator, items, &spec).unwrap();
        let names: Vec<&str> = sorted.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_rejects_hand_assembled_duplicate_primary() {
        // Bypass the builder guard by pushing directly.
        let mut spec = Specification::<Player>::builder().build();
        spec.order_expressions
            .push(OrderExpression::new("name", OrderKind::OrderBy).unwrap());
        spec.order_expressions
            .push(OrderExpression::new("score", OrderKind::OrderByDescending).unwrap());

        let err = InMemoryEvaluator::apply(&OrderEvaluator, vec![player("a", 1)], &spec)
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Specification(SpecificationError::DuplicateOrderChain)
        ));
    }
}
