//! Specifications: declarative, reusable query descriptions
//!
//! A [`Specification`] captures everything a query needs (filters, search,
//! ordering, eager loads, pagination, tracking and caching hints) as a value,
//! built once through [`SpecificationBuilder`] and handed to a repository or
//! an evaluator. The specification never touches a data source itself;
//! evaluators apply its parts to a [`Queryable`](crate::query::Queryable) in
//! a fixed pipeline order.
//!
//! # Example
//!
//! ```rust
//! use acton_data::filter::FilterCondition;
//! use acton_data::specification::Specification;
//!
//! # struct User { name: String, active: bool }
//! # impl acton_data::entity::FieldAccess for User {
//! #     fn field(&self, name: &str) -> Option<acton_data::entity::FieldValue> {
//! #         match name {
//! #             "name" => Some(self.name.clone().into()),
//! #             "active" => Some(self.active.into()),
//! #             _ => None,
//! #         }
//! #     }
//! # }
//! let spec = Specification::<User>::builder()
//!     .filter(FilterCondition::eq("active", true))?
//!     .order_by("name")?
//!     .take(10)?
//!     .build();
//! # Ok::<(), acton_data::specification::SpecificationError>(())
//! ```

mod builder;
mod error;
mod expressions;
pub mod evaluators;
mod validator;

pub use builder::{ProjectionSpecificationBuilder, SpecificationBuilder};
pub use error::{EvaluationError, SpecificationError};
pub use expressions::{
    IncludeExpression, IncludeKind, OrderExpression, OrderKind, SearchExpression, TypeShape,
    WhereExpression,
};
pub use validator::{PartialValidator, SearchValidator, SpecificationValidator, WhereValidator};

use std::fmt;
use std::sync::Arc;

use crate::entity::FieldAccess;
use crate::pagination::PaginationFilter;
use crate::query::{CacheHint, MappingConfig, Projector, TrackingMode};

/// A post-materialization transform applied to query results
pub type PostProcessor<T> = Arc<dyn Fn(Vec<T>) -> Vec<T> + Send + Sync>;

/// A declarative query description over entities of type `T`
///
/// Construct through [`Specification::builder`]; the fields are read by
/// evaluators and store backends through the accessor methods.
pub struct Specification<T> {
    pub(crate) where_expressions: Vec<WhereExpression<T>>,
    pub(crate) search_expressions: Vec<SearchExpression<T>>,
    pub(crate) order_expressions: Vec<OrderExpression<T>>,
    pub(crate) include_expressions: Vec<IncludeExpression>,
    pub(crate) include_paths: Vec<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) take: Option<u64>,
    pub(crate) skip: Option<u64>,
    pub(crate) pagination: Option<PaginationFilter>,
    pub(crate) tracking: TrackingMode,
    pub(crate) split_query: bool,
    pub(crate) ignore_query_filters: bool,
    pub(crate) cache: Option<CacheHint>,
    pub(crate) post_processing: Option<PostProcessor<T>>,
}

impl<T: FieldAccess + 'static> Specification<T> {
    /// Start building a specification
    #[must_use]
    pub fn builder() -> SpecificationBuilder<T> {
        SpecificationBuilder::new()
    }

    /// Whether a single entity satisfies this specification's criteria
    ///
    /// Runs the default [`SpecificationValidator`] chain; only filters and
    /// search participate.
    pub fn is_satisfied_by(&self, entity: &T) -> bool {
        SpecificationValidator::default().is_satisfied_by(self, entity)
    }
}

impl<T> Specification<T> {
    pub(crate) fn empty() -> Self {
        Self {
            where_expressions: Vec::new(),
            search_expressions: Vec::new(),
            order_expressions: Vec::new(),
            include_expressions: Vec::new(),
            include_paths: Vec::new(),
            group_by: None,
            take: None,
            skip: None,
            pagination: None,
            // Read paths default to detached results.
            tracking: TrackingMode::NoTracking,
            split_query: false,
            ignore_query_filters: false,
            cache: None,
            post_processing: None,
        }
    }

    /// Filter directives, in the order they were added
    pub fn where_expressions(&self) -> &[WhereExpression<T>] {
        &self.where_expressions
    }

    /// Search directives, in the order they were added
    pub fn search_expressions(&self) -> &[SearchExpression<T>] {
        &self.search_expressions
    }

    /// Order directives, primary first
    pub fn order_expressions(&self) -> &[OrderExpression<T>] {
        &self.order_expressions
    }

    /// Typed eager-load directives
    pub fn include_expressions(&self) -> &[IncludeExpression] {
        &self.include_expressions
    }

    /// String-path eager-load directives
    pub fn include_paths(&self) -> &[String] {
        &self.include_paths
    }

    /// Grouping field, if any
    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    /// Row limit, if any
    pub const fn take(&self) -> Option<u64> {
        self.take
    }

    /// Row offset, if any
    pub const fn skip(&self) -> Option<u64> {
        self.skip
    }

    /// The page-based view of this specification's pagination
    ///
    /// Returns the explicitly configured filter when one was set, otherwise
    /// derives one from skip/take. A specification without a row limit has
    /// no pagination.
    pub fn pagination_filter(&self) -> Option<PaginationFilter> {
        if let Some(filter) = self.pagination {
            return Some(filter);
        }
        self.take
            .map(|take| PaginationFilter::from_skip_take(self.skip.unwrap_or(0), take))
    }

    /// The offset actually in effect, from skip or the pagination filter
    pub fn effective_skip(&self) -> Option<u64> {
        self.skip.or_else(|| self.pagination.map(|p| p.skip()))
    }

    /// The limit actually in effect, from take or the pagination filter
    pub fn effective_take(&self) -> Option<u64> {
        self.take.or_else(|| self.pagination.map(|p| p.take()))
    }

    /// Result tracking mode
    pub const fn tracking_mode(&self) -> TrackingMode {
        self.tracking
    }

    /// Whether the backend should split the query per included collection
    pub const fn is_split_query(&self) -> bool {
        self.split_query
    }

    /// Whether backend-level global filters should be bypassed
    pub const fn ignores_query_filters(&self) -> bool {
        self.ignore_query_filters
    }

    /// Result caching hint, if any
    pub const fn cache_hint(&self) -> Option<&CacheHint> {
        self.cache.as_ref()
    }

    /// Post-materialization transform, if any
    pub fn post_processor(&self) -> Option<&PostProcessor<T>> {
        self.post_processing.as_ref()
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("where_expressions", &self.where_expressions)
            .field("search_expressions", &self.search_expressions)
            .field("order_expressions", &self.order_expressions)
            .field("include_expressions", &self.include_expressions)
            .field("include_paths", &self.include_paths)
            .field("group_by", &self.group_by)
            .field("take", &self.take)
            .field("skip", &self.skip)
            .field("tracking", &self.tracking)
            .field("split_query", &self.split_query)
            .field("ignore_query_filters", &self.ignore_query_filters)
            .field("cache", &self.cache)
            .field("post_processing", &self.post_processing.is_some())
            .finish()
    }
}

/// A specification that also projects entities into a target type `R`
///
/// Carries either an explicit selector or a set of member paths resolved
/// through a [`MappingConfig`]. Derefs to the underlying [`Specification`]
/// for all query-shaping accessors.
pub struct ProjectionSpecification<T, R> {
    pub(crate) base: Specification<T>,
    pub(crate) selector: Option<Projector<T, R>>,
    pub(crate) members_to_expand: Vec<String>,
    pub(crate) mapper: Option<Arc<dyn MappingConfig<T, R>>>,
    pub(crate) post_processing: Option<PostProcessor<R>>,
}

impl<T: FieldAccess + 'static, R> ProjectionSpecification<T, R> {
    /// Start building a projection specification
    #[must_use]
    pub fn builder() -> ProjectionSpecificationBuilder<T, R> {
        ProjectionSpecificationBuilder::new()
    }
}

impl<T: 'static, R: 'static> ProjectionSpecification<T, R> {
    /// The explicit selector, if one was configured
    pub fn selector(&self) -> Option<&Projector<T, R>> {
        self.selector.as_ref()
    }

    /// Member paths to expand during mapped projection
    pub fn members_to_expand(&self) -> &[String] {
        &self.members_to_expand
    }

    /// Post-materialization transform over projected results, if any
    pub fn post_processor(&self) -> Option<&PostProcessor<R>> {
        self.post_processing.as_ref()
    }

    /// Resolve the projector: the explicit selector wins, then the mapping
    /// configuration; with neither, projection cannot proceed
    pub fn projector(&self) -> Result<Projector<T, R>, EvaluationError> {
        if let Some(selector) = &self.selector {
            return Ok(Arc::clone(selector));
        }
        if let Some(mapper) = &self.mapper {
            return Ok(mapper.projector(&self.members_to_expand));
        }
        Err(EvaluationError::MappingNotConfigured {
            entity: short_type_name::<T>(),
            target: short_type_name::<R>(),
        })
    }
}

impl<T, R> std::ops::Deref for ProjectionSpecification<T, R> {
    type Target = Specification<T>;

    fn deref(&self) -> &Specification<T> {
        &self.base
    }
}

impl<T, R> fmt::Debug for ProjectionSpecification<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionSpecification")
            .field("base", &self.base)
            .field("has_selector", &self.selector.is_some())
            .field("members_to_expand", &self.members_to_expand)
            .field("has_mapper", &self.mapper.is_some())
            .finish()
    }
}

pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
