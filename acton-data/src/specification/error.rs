//! Specification construction and evaluation errors

use thiserror::Error;

/// Errors raised while constructing a specification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecificationError {
    /// A second primary order directive was added to the same specification
    #[error("a primary order directive is already present; use then_by to extend the chain")]
    DuplicateOrderChain,

    /// `take` was set more than once
    #[error("take is already set for this specification")]
    DuplicateTake,

    /// `skip` was set more than once
    #[error("skip is already set for this specification")]
    DuplicateSkip,

    /// A pagination filter conflicts with skip/take already present (or vice versa)
    #[error("pagination is already configured for this specification")]
    DuplicatePagination,

    /// `then_by` was called before any primary order directive
    #[error("then_by requires a preceding order_by")]
    ThenByWithoutOrderBy,

    /// `then_include` was called before any include directive
    #[error("then_include requires a preceding include")]
    ThenIncludeWithoutInclude,

    /// A chained include was constructed without its previous hop type
    #[error("chained include '{path}' is missing its previous hop type")]
    MissingPreviousHop {
        /// The include path in question
        path: String,
    },

    /// A filter condition named an empty field
    #[error("filter field must not be empty")]
    EmptyFilterField,

    /// An order directive named an empty field
    #[error("order field must not be empty")]
    EmptyOrderField,

    /// A search expression carried an empty term
    #[error("search term must not be empty")]
    EmptySearchTerm,

    /// A search expression named an empty field
    #[error("search field must not be empty")]
    EmptySearchField,

    /// An include directive carried an empty path
    #[error("include path must not be empty")]
    EmptyIncludePath,
}

/// Errors raised while evaluating a specification against a query source
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The specification itself is malformed
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    /// A projection was requested but the specification has no selector
    #[error("projection specification for '{entity}' has no selector")]
    SelectorNotFound {
        /// Entity type name
        entity: &'static str,
    },

    /// A mapped projection was requested but no mapping configuration is present
    #[error("no mapping configured to project '{entity}' into '{target}'")]
    MappingNotConfigured {
        /// Source entity type name
        entity: &'static str,
        /// Projection target type name
        target: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SpecificationError::DuplicateTake.to_string(),
            "take is already set for this specification"
        );
        assert_eq!(
            SpecificationError::MissingPreviousHop {
                path: "orders".to_string()
            }
            .to_string(),
            "chained include 'orders' is missing its previous hop type"
        );
    }

    #[test]
    fn test_evaluation_error_from_specification_error() {
        let err: EvaluationError = SpecificationError::DuplicateOrderChain.into();
        assert!(matches!(err, EvaluationError::Specification(_)));
    }
}
