//! Search step: case-insensitive substring matching with OR-groups
//!
//! Directives sharing a group number combine with OR; distinct groups
//! combine with AND. Null and non-string fields never match.

use std::collections::BTreeMap;

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::evaluators::{InMemoryEvaluator, QueryEvaluator};
use crate::specification::{EvaluationError, SearchExpression, Specification};

/// Applies the search directives to the query
pub struct SearchEvaluator;

pub(crate) fn matches_search_groups<T: FieldAccess>(
    item: &T,
    expressions: &[SearchExpression<T>],
) -> bool {
    let mut groups: BTreeMap<u32, Vec<&SearchExpression<T>>> = BTreeMap::new();
    for expression in expressions {
        groups.entry(expression.group()).or_default().push(expression);
    }
    groups
        .values()
        .all(|group| group.iter().any(|expression| expression.matches(item)))
}

impl<T, Q> QueryEvaluator<T, Q> for SearchEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn is_criteria_evaluator(&self) -> bool {
        true
    }

    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        let expressions = specification.search_expressions();
        if expressions.is_empty() {
            return Ok(query);
        }
        Ok(query.search(expressions))
    }
}

impl<T: FieldAccess + Send + 'static> InMemoryEvaluator<T> for SearchEvaluator {
    fn apply(
        &self,
        mut items: Vec<T>,
        specification: &Specification<T>,
    ) -> Result<Vec<T>, EvaluationError> {
        let expressions = specification.search_expressions();
        if !expressions.is_empty() {
            items.retain(|item| matches_search_groups(item, expressions));
        }
        Ok(items)
    }
}
