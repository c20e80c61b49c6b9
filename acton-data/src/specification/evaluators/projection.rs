//! Projection step: resolves the selector for the projected tail of a query
//!
//! Projection is applied by the orchestrators after every shaping step, not
//! as a pipeline member, because it changes the element type of the query.

use std::sync::Arc;

use crate::query::Projector;
use crate::specification::{short_type_name, EvaluationError, ProjectionSpecification};

/// Resolve the projector for an in-memory evaluation
///
/// Only the explicit selector runs in memory; a mapping configuration
/// describes a backend-side translation and does not substitute here. No
/// selector is a `SelectorNotFound` error.
pub(crate) fn resolve_in_memory_projector<T, R>(
    specification: &ProjectionSpecification<T, R>,
) -> Result<Projector<T, R>, EvaluationError>
where
    T: 'static,
    R: 'static,
{
    specification
        .selector()
        .map(Arc::clone)
        .ok_or(EvaluationError::SelectorNotFound {
            entity: short_type_name::<T>(),
        })
}
