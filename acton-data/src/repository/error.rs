//! Repository error types

use thiserror::Error;

use crate::query::QueryError;
use crate::specification::{EvaluationError, SpecificationError};

/// Errors surfaced by repository and unit-of-work operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No entity with the given id exists
    #[error("{entity} with id '{id}' was not found")]
    NotFound {
        /// Entity type name
        entity: &'static str,
        /// Rendered id
        id: String,
    },

    /// The specification could not be evaluated
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The query source failed or was cancelled
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The specification itself is malformed
    #[error(transparent)]
    Specification(#[from] SpecificationError),
}

/// Result alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = RepositoryError::NotFound {
            entity: "User",
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "User with id '42' was not found");
    }

    #[test]
    fn test_conversions() {
        let err: RepositoryError = QueryError::Cancelled.into();
        assert!(matches!(err, RepositoryError::Query(_)));

        let err: RepositoryError = SpecificationError::DuplicateTake.into();
        assert!(matches!(err, RepositoryError::Specification(_)));
    }
}
