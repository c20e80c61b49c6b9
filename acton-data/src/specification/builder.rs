//! Fluent specification builders
//!
//! Builders accumulate directives into a [`Specification`] and fail fast on
//! malformed chains: a second primary order, a duplicate `take`/`skip`, or a
//! `then_by`/`then_include` without its opening directive all error at build
//! time rather than at the data source.
//!
//! The `*_if` variants take a runtime condition; when the condition is false
//! the directive is skipped. Skipping a chain-opening directive discards the
//! rest of that chain: `then_by` after a skipped `order_by_if` is silently
//! dropped, mirroring the skip of its primary.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::entity::FieldAccess;
use crate::filter::FilterCondition;
use crate::pagination::PaginationFilter;
use crate::query::{CacheExpirationMode, CacheHint, MappingConfig, Projector, TrackingMode};
use crate::specification::error::SpecificationError;
use crate::specification::expressions::{
    IncludeExpression, IncludeKind, OrderExpression, OrderKind, SearchExpression, TypeShape,
    WhereExpression,
};
use crate::specification::{PostProcessor, ProjectionSpecification, Specification};

/// Lifecycle of a chained directive sequence (order chain, include chain)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainState {
    /// No opening directive yet
    None,
    /// An opening directive is in place; continuations attach to it
    Active,
    /// The opening directive was conditionally skipped; continuations no-op
    Discarded,
}

/// Builder for a [`Specification`]
///
/// # Example
///
/// ```rust
/// use acton_data::filter::FilterCondition;
/// use acton_data::specification::Specification;
///
/// # struct User { name: String, age: i64 }
/// # impl acton_data::entity::FieldAccess for User {
/// #     fn field(&self, name: &str) -> Option<acton_data::entity::FieldValue> {
/// #         match name {
/// #             "name" => Some(self.name.clone().into()),
/// #             "age" => Some(self.age.into()),
/// #             _ => None,
/// #         }
/// #     }
/// # }
/// let spec = Specification::<User>::builder()
///     .filter(FilterCondition::gte("age", 18_i64))?
///     .search("name", "ada")?
///     .order_by("name")?
///     .then_by_descending("age")?
///     .take(25)?
///     .build();
/// # Ok::<(), acton_data::specification::SpecificationError>(())
/// ```
pub struct SpecificationBuilder<T> {
    spec: Specification<T>,
    order_chain: ChainState,
    include_chain: ChainState,
    last_include: Option<TypeShape>,
}

impl<T: FieldAccess + 'static> SpecificationBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            spec: Specification::empty(),
            order_chain: ChainState::None,
            include_chain: ChainState::None,
            last_include: None,
        }
    }

    /// Add a filter condition; conditions combine with AND
    pub fn filter(mut self, condition: FilterCondition) -> Result<Self, SpecificationError> {
        self.spec
            .where_expressions
            .push(WhereExpression::new(condition)?);
        Ok(self)
    }

    /// Add a filter condition only when `condition` holds
    pub fn filter_if(
        self,
        condition: bool,
        filter: FilterCondition,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.filter(filter)
        } else {
            Ok(self)
        }
    }

    /// Add a search directive in the default group
    ///
    /// Directives in the same group combine with OR; distinct groups combine
    /// with AND.
    pub fn search(
        self,
        field: impl Into<String>,
        term: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        self.search_grouped(field, term, 1)
    }

    /// Add a search directive in an explicit group
    pub fn search_grouped(
        mut self,
        field: impl Into<String>,
        term: impl Into<String>,
        group: u32,
    ) -> Result<Self, SpecificationError> {
        self.spec
            .search_expressions
            .push(SearchExpression::new(field, term, group)?);
        Ok(self)
    }

    /// Add a default-group search directive only when `condition` holds
    pub fn search_if(
        self,
        condition: bool,
        field: impl Into<String>,
        term: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.search(field, term)
        } else {
            Ok(self)
        }
    }

    fn push_primary_order(
        mut self,
        field: impl Into<String>,
        kind: OrderKind,
    ) -> Result<Self, SpecificationError> {
        if self.order_chain == ChainState::Active {
            return Err(SpecificationError::DuplicateOrderChain);
        }
        self.spec
            .order_expressions
            .push(OrderExpression::new(field, kind)?);
        self.order_chain = ChainState::Active;
        Ok(self)
    }

    fn push_secondary_order(
        mut self,
        field: impl Into<String>,
        kind: OrderKind,
    ) -> Result<Self, SpecificationError> {
        match self.order_chain {
            ChainState::None => Err(SpecificationError::ThenByWithoutOrderBy),
            ChainState::Discarded => Ok(self),
            ChainState::Active => {
                self.spec
                    .order_expressions
                    .push(OrderExpression::new(field, kind)?);
                Ok(self)
            }
        }
    }

    /// Open the order chain with an ascending sort
    pub fn order_by(self, field: impl Into<String>) -> Result<Self, SpecificationError> {
        self.push_primary_order(field, OrderKind::OrderBy)
    }

    /// Open the order chain with a descending sort
    pub fn order_by_descending(
        self,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        self.push_primary_order(field, OrderKind::OrderByDescending)
    }

    /// Conditionally open the order chain; when skipped, later `then_by`
    /// calls are discarded with it
    pub fn order_by_if(
        mut self,
        condition: bool,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.push_primary_order(field, OrderKind::OrderBy)
        } else {
            self.order_chain = ChainState::Discarded;
            Ok(self)
        }
    }

    /// Conditional variant of [`order_by_descending`](Self::order_by_descending)
    pub fn order_by_descending_if(
        mut self,
        condition: bool,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.push_primary_order(field, OrderKind::OrderByDescending)
        } else {
            self.order_chain = ChainState::Discarded;
            Ok(self)
        }
    }

    /// Extend the order chain with an ascending tie-break
    pub fn then_by(self, field: impl Into<String>) -> Result<Self, SpecificationError> {
        self.push_secondary_order(field, OrderKind::ThenBy)
    }

    /// Extend the order chain with a descending tie-break
    pub fn then_by_descending(
        self,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        self.push_secondary_order(field, OrderKind::ThenByDescending)
    }

    /// Conditionally extend the order chain
    pub fn then_by_if(
        self,
        condition: bool,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.push_secondary_order(field, OrderKind::ThenBy)
        } else {
            Ok(self)
        }
    }

    /// Conditional variant of [`then_by_descending`](Self::then_by_descending)
    pub fn then_by_descending_if(
        self,
        condition: bool,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.push_secondary_order(field, OrderKind::ThenByDescending)
        } else {
            Ok(self)
        }
    }

    /// Eagerly load property `P` at `path`
    pub fn include<P: 'static>(
        mut self,
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        let expr = IncludeExpression::include::<T, P>(path)?;
        self.last_include = Some(expr.property());
        self.include_chain = ChainState::Active;
        self.spec.include_expressions.push(expr);
        Ok(self)
    }

    /// Conditionally eager-load; when skipped, later `then_include` calls
    /// are discarded with it
    pub fn include_if<P: 'static>(
        mut self,
        condition: bool,
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.include::<P>(path)
        } else {
            self.include_chain = ChainState::Discarded;
            self.last_include = None;
            Ok(self)
        }
    }

    /// Eagerly load the property chain reached through the previous include
    pub fn then_include<P: 'static>(
        mut self,
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        match self.include_chain {
            ChainState::None => Err(SpecificationError::ThenIncludeWithoutInclude),
            ChainState::Discarded => Ok(self),
            ChainState::Active => {
                let path = path.into();
                let previous = self
                    .last_include
                    .ok_or(SpecificationError::MissingPreviousHop { path: path.clone() })?;
                let expr = IncludeExpression::new(
                    path,
                    TypeShape::of::<T>(),
                    TypeShape::of::<P>(),
                    Some(previous),
                    IncludeKind::Chained,
                )?;
                self.last_include = Some(expr.property());
                self.spec.include_expressions.push(expr);
                Ok(self)
            }
        }
    }

    /// Conditional variant of [`then_include`](Self::then_include)
    pub fn then_include_if<P: 'static>(
        self,
        condition: bool,
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.then_include::<P>(path)
        } else {
            Ok(self)
        }
    }

    /// Eagerly load by string navigation path
    ///
    /// String paths are opaque to the type system; they start no typed
    /// chain, so `then_include` cannot extend them.
    pub fn include_path(
        mut self,
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(SpecificationError::EmptyIncludePath);
        }
        self.spec.include_paths.push(path);
        Ok(self)
    }

    /// Conditional variant of [`include_path`](Self::include_path)
    pub fn include_path_if(
        self,
        condition: bool,
        path: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        if condition {
            self.include_path(path)
        } else {
            Ok(self)
        }
    }

    /// Group results by a field; groups are flattened back in first-appearance
    /// order at materialization
    #[must_use]
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.spec.group_by = Some(field.into());
        self
    }

    /// Limit the result to `count` rows
    pub fn take(mut self, count: u64) -> Result<Self, SpecificationError> {
        if self.spec.take.is_some() {
            return Err(SpecificationError::DuplicateTake);
        }
        if self.spec.pagination.is_some() {
            return Err(SpecificationError::DuplicatePagination);
        }
        self.spec.take = Some(count);
        Ok(self)
    }

    /// Conditional variant of [`take`](Self::take)
    pub fn take_if(self, condition: bool, count: u64) -> Result<Self, SpecificationError> {
        if condition {
            self.take(count)
        } else {
            Ok(self)
        }
    }

    /// Skip the first `count` rows
    pub fn skip(mut self, count: u64) -> Result<Self, SpecificationError> {
        if self.spec.skip.is_some() {
            return Err(SpecificationError::DuplicateSkip);
        }
        if self.spec.pagination.is_some() {
            return Err(SpecificationError::DuplicatePagination);
        }
        self.spec.skip = Some(count);
        Ok(self)
    }

    /// Conditional variant of [`skip`](Self::skip)
    pub fn skip_if(self, condition: bool, count: u64) -> Result<Self, SpecificationError> {
        if condition {
            self.skip(count)
        } else {
            Ok(self)
        }
    }

    /// Paginate by page number and size; conflicts with explicit skip/take
    pub fn with_pagination_filter(
        mut self,
        filter: PaginationFilter,
    ) -> Result<Self, SpecificationError> {
        if self.spec.pagination.is_some() || self.spec.take.is_some() || self.spec.skip.is_some() {
            return Err(SpecificationError::DuplicatePagination);
        }
        self.spec.pagination = Some(filter);
        Ok(self)
    }

    /// Track returned entities for change detection
    #[must_use]
    pub fn as_tracking(mut self) -> Self {
        self.spec.tracking = TrackingMode::Tracking;
        self
    }

    /// Return detached entities (the default)
    #[must_use]
    pub fn as_no_tracking(mut self) -> Self {
        self.spec.tracking = TrackingMode::NoTracking;
        self
    }

    /// Return detached entities, deduplicated by identity within the result
    #[must_use]
    pub fn as_no_tracking_with_identity_resolution(mut self) -> Self {
        self.spec.tracking = TrackingMode::NoTrackingWithIdentityResolution;
        self
    }

    /// Hint the backend to run one query per included collection
    #[must_use]
    pub fn as_split_query(mut self) -> Self {
        self.spec.split_query = true;
        self
    }

    /// Bypass backend-level global filters
    #[must_use]
    pub fn ignore_query_filters(mut self) -> Self {
        self.spec.ignore_query_filters = true;
        self
    }

    /// Conditional variant of [`ignore_query_filters`](Self::ignore_query_filters)
    #[must_use]
    pub fn ignore_query_filters_if(mut self, condition: bool) -> Self {
        if condition {
            self.spec.ignore_query_filters = true;
        }
        self
    }

    /// Hint the backend to cache this query's results
    #[must_use]
    pub fn with_caching(mut self) -> Self {
        self.spec.cache.get_or_insert_with(CacheHint::default);
        self
    }

    /// Cache with an explicit timeout (implies caching)
    #[must_use]
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.spec
            .cache
            .get_or_insert_with(CacheHint::default)
            .timeout = Some(timeout);
        self
    }

    /// Cache with an explicit expiration mode (implies caching)
    #[must_use]
    pub fn with_cache_expiration_mode(mut self, mode: CacheExpirationMode) -> Self {
        self.spec
            .cache
            .get_or_insert_with(CacheHint::default)
            .expiration_mode = mode;
        self
    }

    /// Transform materialized results before they are returned
    #[must_use]
    pub fn with_post_processing<F>(mut self, action: F) -> Self
    where
        F: Fn(Vec<T>) -> Vec<T> + Send + Sync + 'static,
    {
        self.spec.post_processing = Some(Arc::new(action));
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> Specification<T> {
        self.spec
    }
}

impl<T> fmt::Debug for SpecificationBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationBuilder")
            .field("spec", &self.spec)
            .field("order_chain", &self.order_chain)
            .field("include_chain", &self.include_chain)
            .finish()
    }
}

/// Builder for a [`ProjectionSpecification`]
///
/// Extends the base builder with a selector, member expansion paths, and a
/// mapping configuration for selector-less projection.
pub struct ProjectionSpecificationBuilder<T, R> {
    inner: SpecificationBuilder<T>,
    selector: Option<Projector<T, R>>,
    members_to_expand: Vec<String>,
    mapper: Option<Arc<dyn MappingConfig<T, R>>>,
    post_processing: Option<PostProcessor<R>>,
}

impl<T: FieldAccess + 'static, R> ProjectionSpecificationBuilder<T, R> {
    pub(crate) fn new() -> Self {
        Self {
            inner: SpecificationBuilder::new(),
            selector: None,
            members_to_expand: Vec::new(),
            mapper: None,
            post_processing: None,
        }
    }

    fn map_inner(
        mut self,
        apply: impl FnOnce(SpecificationBuilder<T>) -> Result<SpecificationBuilder<T>, SpecificationError>,
    ) -> Result<Self, SpecificationError> {
        self.inner = apply(self.inner)?;
        Ok(self)
    }

    /// Add a filter condition
    pub fn filter(self, condition: FilterCondition) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.filter(condition))
    }

    /// Add a default-group search directive
    pub fn search(
        self,
        field: impl Into<String>,
        term: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.search(field, term))
    }

    /// Open the order chain with an ascending sort
    pub fn order_by(self, field: impl Into<String>) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.order_by(field))
    }

    /// Open the order chain with a descending sort
    pub fn order_by_descending(
        self,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.order_by_descending(field))
    }

    /// Extend the order chain with an ascending tie-break
    pub fn then_by(self, field: impl Into<String>) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.then_by(field))
    }

    /// Extend the order chain with a descending tie-break
    pub fn then_by_descending(
        self,
        field: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.then_by_descending(field))
    }

    /// Eagerly load by string navigation path
    pub fn include_path(self, path: impl Into<String>) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.include_path(path))
    }

    /// Limit the result to `count` rows
    pub fn take(self, count: u64) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.take(count))
    }

    /// Skip the first `count` rows
    pub fn skip(self, count: u64) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.skip(count))
    }

    /// Paginate by page number and size
    pub fn with_pagination_filter(
        self,
        filter: PaginationFilter,
    ) -> Result<Self, SpecificationError> {
        self.map_inner(|b| b.with_pagination_filter(filter))
    }

    /// Project each entity through an explicit selector
    #[must_use]
    pub fn select(mut self, selector: Projector<T, R>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Expand a member path during mapped projection
    #[must_use]
    pub fn expand(mut self, member: impl Into<String>) -> Self {
        self.members_to_expand.push(member.into());
        self
    }

    /// Project through a mapping configuration when no selector is set
    #[must_use]
    pub fn with_mapping(mut self, mapper: Arc<dyn MappingConfig<T, R>>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Transform projected results before they are returned
    #[must_use]
    pub fn with_post_processing<F>(mut self, action: F) -> Self
    where
        F: Fn(Vec<R>) -> Vec<R> + Send + Sync + 'static,
    {
        self.post_processing = Some(Arc::new(action));
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> ProjectionSpecification<T, R> {
        ProjectionSpecification {
            base: self.inner.build(),
            selector: self.selector,
            members_to_expand: self.members_to_expand,
            mapper: self.mapper,
            post_processing: self.post_processing,
        }
    }
}

impl<T, R> fmt::Debug for ProjectionSpecificationBuilder<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionSpecificationBuilder")
            .field("inner", &self.inner)
            .field("has_selector", &self.selector.is_some())
            .field("members_to_expand", &self.members_to_expand)
            .field("has_mapper", &self.mapper.is_some())
            .finish()
    }
}
