//! Include step: forwards eager-load directives to the backend

use crate::entity::FieldAccess;
use crate::query::Queryable;
use crate::specification::evaluators::QueryEvaluator;
use crate::specification::{EvaluationError, Specification};

/// Forwards typed and string-path includes, in the order they were declared
pub struct IncludeEvaluator;

impl<T, Q> QueryEvaluator<T, Q> for IncludeEvaluator
where
    T: FieldAccess + Send + 'static,
    Q: Queryable<T>,
{
    fn apply(&self, query: Q, specification: &Specification<T>) -> Result<Q, EvaluationError> {
        let query = specification
            .include_expressions()
            .iter()
            .fold(query, |query, expression| query.include(expression));
        Ok(specification
            .include_paths()
            .iter()
            .fold(query, |query, path| query.include_path(path)))
    }
}
