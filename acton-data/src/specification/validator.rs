//! Entity validation against a specification's criteria
//!
//! Answers "would this entity satisfy the specification" without touching a
//! data source. Only the criteria parts participate: filters must all hold,
//! and each search group must be satisfied. Ordering, pagination, and hints
//! say nothing about a single entity.

use crate::entity::FieldAccess;
use crate::specification::evaluators::search::matches_search_groups;
use crate::specification::Specification;

/// One criteria check over a single entity
pub trait PartialValidator<T>: Send + Sync {
    /// Whether the entity satisfies this slice of the specification
    fn is_satisfied_by(&self, specification: &Specification<T>, entity: &T) -> bool;
}

/// Checks every filter directive (AND)
pub struct WhereValidator;

impl<T: FieldAccess> PartialValidator<T> for WhereValidator {
    fn is_satisfied_by(&self, specification: &Specification<T>, entity: &T) -> bool {
        specification
            .where_expressions()
            .iter()
            .all(|expression| expression.matches(entity))
    }
}

/// Checks the search directives (OR within a group, AND across groups)
pub struct SearchValidator;

impl<T: FieldAccess> PartialValidator<T> for SearchValidator {
    fn is_satisfied_by(&self, specification: &Specification<T>, entity: &T) -> bool {
        let expressions = specification.search_expressions();
        expressions.is_empty() || matches_search_groups(entity, expressions)
    }
}

/// Runs every partial validator; an entity satisfies the specification when
/// all of them pass
pub struct SpecificationValidator<T> {
    validators: Vec<Box<dyn PartialValidator<T>>>,
}

impl<T: FieldAccess + 'static> SpecificationValidator<T> {
    /// A validator with an explicit check list
    #[must_use]
    pub fn new(validators: Vec<Box<dyn PartialValidator<T>>>) -> Self {
        Self { validators }
    }

    /// Whether the entity satisfies all criteria of the specification
    pub fn is_satisfied_by(&self, specification: &Specification<T>, entity: &T) -> bool {
        self.validators
            .iter()
            .all(|validator| validator.is_satisfied_by(specification, entity))
    }
}

impl<T: FieldAccess + 'static> Default for SpecificationValidator<T> {
    fn default() -> Self {
        Self::new(vec![Box::new(WhereValidator), Box::new(SearchValidator)])
    }
}
