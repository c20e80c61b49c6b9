//! Expression descriptors
//!
//! Each descriptor pairs the declarative shape of a query directive (field
//! names, operators, include paths) with a lazily-compiled delegate for
//! in-memory evaluation. Store backends read only the declarative side;
//! the delegate is compiled on first in-memory use and memoized with
//! [`OnceCell`], so concurrent first callers race benignly and every later
//! call reuses the same closure.

use std::any::TypeId;
use std::fmt;

use once_cell::sync::OnceCell;

use crate::entity::{FieldAccess, FieldValue};
use crate::filter::FilterCondition;
use crate::specification::error::SpecificationError;

/// A filter directive with its lazily-compiled predicate
pub struct WhereExpression<T> {
    condition: FilterCondition,
    predicate: OnceCell<Box<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T: FieldAccess> WhereExpression<T> {
    /// Wrap a condition, rejecting an empty field name
    pub fn new(condition: FilterCondition) -> Result<Self, SpecificationError> {
        if condition.field.trim().is_empty() {
            return Err(SpecificationError::EmptyFilterField);
        }
        Ok(Self {
            condition,
            predicate: OnceCell::new(),
        })
    }

    /// The declarative condition, for backends that translate it
    pub fn condition(&self) -> &FilterCondition {
        &self.condition
    }

    /// Evaluate the predicate against an entity, compiling it on first use
    pub fn matches(&self, entity: &T) -> bool {
        let predicate = self.predicate.get_or_init(|| {
            let condition = self.condition.clone();
            Box::new(move |entity: &T| condition.matches(entity))
        });
        predicate(entity)
    }

    /// Whether the predicate has been compiled yet
    pub fn is_compiled(&self) -> bool {
        self.predicate.get().is_some()
    }
}

impl<T> fmt::Debug for WhereExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhereExpression")
            .field("condition", &self.condition)
            .field("compiled", &self.predicate.get().is_some())
            .finish()
    }
}

/// Position of an order directive within an order chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    /// Primary ascending sort
    OrderBy,
    /// Primary descending sort
    OrderByDescending,
    /// Secondary ascending sort
    ThenBy,
    /// Secondary descending sort
    ThenByDescending,
}

impl OrderKind {
    /// Whether this directive starts an order chain
    pub const fn is_primary(&self) -> bool {
        matches!(self, Self::OrderBy | Self::OrderByDescending)
    }

    /// Whether this directive sorts descending
    pub const fn is_descending(&self) -> bool {
        matches!(self, Self::OrderByDescending | Self::ThenByDescending)
    }
}

/// An order directive with its lazily-compiled key extractor
pub struct OrderExpression<T> {
    field: String,
    kind: OrderKind,
    key: OnceCell<Box<dyn Fn(&T) -> FieldValue + Send + Sync>>,
}

impl<T: FieldAccess> OrderExpression<T> {
    /// Wrap a field and chain position, rejecting an empty field name
    pub fn new(field: impl Into<String>, kind: OrderKind) -> Result<Self, SpecificationError> {
        let field = field.into();
        if field.trim().is_empty() {
            return Err(SpecificationError::EmptyOrderField);
        }
        Ok(Self {
            field,
            kind,
            key: OnceCell::new(),
        })
    }

    /// The field this directive sorts on
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The chain position and direction
    pub const fn kind(&self) -> OrderKind {
        self.kind
    }

    /// Extract the sort key from an entity, compiling the extractor on first use
    ///
    /// A missing field yields [`FieldValue::Null`], which sorts first.
    pub fn key_of(&self, entity: &T) -> FieldValue {
        let key = self.key.get_or_init(|| {
            let field = self.field.clone();
            Box::new(move |entity: &T| entity.field(&field).unwrap_or(FieldValue::Null))
        });
        key(entity)
    }
}

impl<T> fmt::Debug for OrderExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderExpression")
            .field("field", &self.field)
            .field("kind", &self.kind)
            .field("compiled", &self.key.get().is_some())
            .finish()
    }
}

/// A search directive with its lazily-compiled matcher
///
/// Search is a case-insensitive substring test. Directives sharing a group
/// number are combined with OR; distinct groups combine with AND.
pub struct SearchExpression<T> {
    field: String,
    term: String,
    group: u32,
    matcher: OnceCell<Box<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T: FieldAccess> SearchExpression<T> {
    /// Wrap a field and term, rejecting empty inputs
    pub fn new(
        field: impl Into<String>,
        term: impl Into<String>,
        group: u32,
    ) -> Result<Self, SpecificationError> {
        let field = field.into();
        let term = term.into();
        if field.trim().is_empty() {
            return Err(SpecificationError::EmptySearchField);
        }
        if term.is_empty() {
            return Err(SpecificationError::EmptySearchTerm);
        }
        Ok(Self {
            field,
            term,
            group,
            matcher: OnceCell::new(),
        })
    }

    /// The field this directive searches
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The search term
    pub fn term(&self) -> &str {
        &self.term
    }

    /// The OR-group this directive belongs to
    pub const fn group(&self) -> u32 {
        self.group
    }

    /// Test an entity against this directive, compiling the matcher on first use
    ///
    /// Null and non-string fields never match.
    pub fn matches(&self, entity: &T) -> bool {
        let matcher = self.matcher.get_or_init(|| {
            let field = self.field.clone();
            let needle = self.term.to_lowercase();
            Box::new(move |entity: &T| {
                entity
                    .field(&field)
                    .as_ref()
                    .and_then(FieldValue::as_text)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        });
        matcher(entity)
    }
}

impl<T> fmt::Debug for SearchExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchExpression")
            .field("field", &self.field)
            .field("term", &self.term)
            .field("group", &self.group)
            .finish()
    }
}

/// The type identity of one hop in an include chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeShape {
    /// Runtime type id
    pub id: TypeId,
    /// Unqualified type name, for diagnostics
    pub name: &'static str,
}

impl TypeShape {
    /// The shape of a concrete type
    pub fn of<T: 'static>() -> Self {
        let full = std::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name: full.rsplit("::").next().unwrap_or(full),
        }
    }
}

/// Whether an include starts a chain or extends the previous hop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// First hop, navigating from the root entity
    Root,
    /// Subsequent hop, navigating from the previously included property
    Chained,
}

/// A typed eager-load directive
///
/// Records the navigation path plus the type identity of the root entity,
/// the included property, and (for chained hops) the previous property.
/// These shapes key the loader registry used by in-memory stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeExpression {
    path: String,
    entity: TypeShape,
    property: TypeShape,
    previous: Option<TypeShape>,
    kind: IncludeKind,
}

impl IncludeExpression {
    /// Construct from raw parts, validating path and chain shape
    pub fn new(
        path: impl Into<String>,
        entity: TypeShape,
        property: TypeShape,
        previous: Option<TypeShape>,
        kind: IncludeKind,
    ) -> Result<Self, SpecificationError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(SpecificationError::EmptyIncludePath);
        }
        if kind == IncludeKind::Chained && previous.is_none() {
            return Err(SpecificationError::MissingPreviousHop { path });
        }
        Ok(Self {
            path,
            entity,
            property,
            previous,
            kind,
        })
    }

    /// A root include of property `P` on entity `E`
    pub fn include<E: 'static, P: 'static>(
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        Self::new(
            path,
            TypeShape::of::<E>(),
            TypeShape::of::<P>(),
            None,
            IncludeKind::Root,
        )
    }

    /// A chained include of property `P` reached through previous hop `Prev`
    pub fn then_include<E: 'static, Prev: 'static, P: 'static>(
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        Self::new(
            path,
            TypeShape::of::<E>(),
            TypeShape::of::<P>(),
            Some(TypeShape::of::<Prev>()),
            IncludeKind::Chained,
        )
    }

    /// The navigation path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The root entity's type shape
    pub const fn entity(&self) -> TypeShape {
        self.entity
    }

    /// The included property's type shape
    pub const fn property(&self) -> TypeShape {
        self.property
    }

    /// The previous hop's type shape, for chained includes
    pub const fn previous(&self) -> Option<TypeShape> {
        self.previous
    }

    /// Chain position
    pub const fn kind(&self) -> IncludeKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc {
        title: String,
        pages: i64,
        summary: Option<String>,
    }

    impl FieldAccess for Doc {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "title" => Some(self.title.clone().into()),
                "pages" => Some(self.pages.into()),
                "summary" => Some(self.summary.clone().map(FieldValue::String).unwrap_or(FieldValue::Null)),
                _ => None,
            }
        }
    }

    fn doc(title: &str, pages: i64) -> Doc {
        Doc {
            title: title.to_string(),
            pages,
            summary: None,
        }
    }

    #[test]
    fn test_where_expression_compiles_lazily() {
        let expr = WhereExpression::<Doc>::new(FilterCondition::gt("pages", 100_i64)).unwrap();
        assert!(!expr.is_compiled());
        assert!(expr.matches(&doc("a", 200)));
        assert!(expr.is_compiled());
        assert!(!expr.matches(&doc("b", 50)));
    }

    #[test]
    fn test_where_expression_rejects_empty_field() {
        let err = WhereExpression::<Doc>::new(FilterCondition::eq("  ", 1_i64)).unwrap_err();
        assert_eq!(err, SpecificationError::EmptyFilterField);
    }

    #[test]
    fn test_order_expression_key_missing_field_is_null() {
        let expr = OrderExpression::<Doc>::new("ghost", OrderKind::OrderBy).unwrap();
        assert_eq!(expr.key_of(&doc("a", 1)), FieldValue::Null);
    }

    #[test]
    fn test_order_expression_rejects_empty_field() {
        let err = OrderExpression::<Doc>::new("", OrderKind::ThenBy).unwrap_err();
        assert_eq!(err, SpecificationError::EmptyOrderField);
    }

    #[test]
    fn test_order_kind_flags() {
        assert!(OrderKind::OrderBy.is_primary());
        assert!(OrderKind::OrderByDescending.is_primary());
        assert!(!OrderKind::ThenBy.is_primary());
        assert!(OrderKind::ThenByDescending.is_descending());
        assert!(!OrderKind::ThenBy.is_descending());
    }

    #[test]
    fn test_search_expression_case_insensitive_substring() {
        let expr = SearchExpression::<Doc>::new("title", "RUST", 1).unwrap();
        assert!(expr.matches(&doc("The Rust Book", 500)));
        assert!(!expr.matches(&doc("The C Book", 300)));
    }

    #[test]
    fn test_search_expression_null_field_never_matches() {
        let expr = SearchExpression::<Doc>::new("summary", "x", 1).unwrap();
        assert!(!expr.matches(&doc("has null summary", 10)));
        // Non-string fields never match either.
        let expr = SearchExpression::<Doc>::new("pages", "1", 1).unwrap();
        assert!(!expr.matches(&doc("a", 100)));
    }

    #[test]
    fn test_search_expression_rejects_empty_inputs() {
        assert_eq!(
            SearchExpression::<Doc>::new("", "x", 1).unwrap_err(),
            SpecificationError::EmptySearchField
        );
        assert_eq!(
            SearchExpression::<Doc>::new("title", "", 1).unwrap_err(),
            SpecificationError::EmptySearchTerm
        );
    }

    struct Order;
    struct Customer;
    struct Address;

    #[test]
    fn test_include_ctors() {
        let root = IncludeExpression::include::<Order, Customer>("customer").unwrap();
        assert_eq!(root.kind(), IncludeKind::Root);
        assert_eq!(root.property().name, "Customer");
        assert!(root.previous().is_none());

        let chained =
            IncludeExpression::then_include::<Order, Customer, Address>("customer.address")
                .unwrap();
        assert_eq!(chained.kind(), IncludeKind::Chained);
        assert_eq!(chained.previous().unwrap().name, "Customer");
    }

    #[test]
    fn test_include_validation() {
        assert_eq!(
            IncludeExpression::include::<Order, Customer>("   ").unwrap_err(),
            SpecificationError::EmptyIncludePath
        );
        let err = IncludeExpression::new(
            "address",
            TypeShape::of::<Order>(),
            TypeShape::of::<Address>(),
            None,
            IncludeKind::Chained,
        )
        .unwrap_err();
        assert!(matches!(err, SpecificationError::MissingPreviousHop { .. }));
    }
}
