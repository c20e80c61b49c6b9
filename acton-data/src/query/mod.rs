//! Query source abstraction
//!
//! [`Queryable`] is the seam between specifications and data sources. Each
//! combinator accepts one declarative directive; a backend either translates
//! it into its native query language or applies it in memory. Materialization
//! is async and cancellation-aware, taking a
//! [`CancellationToken`] checked before work
//! begins.
//!
//! Backend hints (tracking, split query, query-filter bypass, caching) have
//! no-op default implementations so that backends without the concept stay
//! correct by ignoring them.

pub mod memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::filter::FilterCondition;
use crate::specification::{IncludeExpression, OrderExpression, SearchExpression};

pub use memory::{MemoryQuery, ProjectedRows};

/// How materialized entities relate to the backend's change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingMode {
    /// Entities are tracked for change detection
    Tracking,
    /// Entities are detached copies
    #[default]
    NoTracking,
    /// Detached copies, deduplicated by identity within one result
    NoTrackingWithIdentityResolution,
}

/// How a cached query result expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CacheExpirationMode {
    /// Expires a fixed duration after it was stored
    Absolute,
    /// Expiry extends on each access
    #[default]
    Sliding,
}

/// A request to cache this query's materialized result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheHint {
    /// Time until expiry; `None` leaves the backend's default in place
    pub timeout: Option<Duration>,
    /// Expiration mode
    pub expiration_mode: CacheExpirationMode,
}

/// A compiled projection from `T` to `R`
pub type Projector<T, R> = Arc<dyn Fn(T) -> R + Send + Sync>;

/// Supplies projectors for selector-less projection specifications
///
/// The member paths come from the specification's `expand` directives; an
/// implementation may use them to decide how much of the object graph the
/// projection touches.
pub trait MappingConfig<T, R>: Send + Sync {
    /// Build the projector, honoring the requested member expansions
    fn projector(&self, members_to_expand: &[String]) -> Projector<T, R>;
}

/// Errors surfaced by query materialization
#[derive(Debug, Error)]
pub enum QueryError {
    /// The cancellation token was triggered before or during materialization
    #[error("query was cancelled")]
    Cancelled,

    /// An eager-load directive had no registered loader
    #[error("no include loader registered for '{entity}' path '{path}'")]
    UnresolvedInclude {
        /// Root entity type name
        entity: &'static str,
        /// The include path that failed to resolve
        path: String,
    },

    /// The backend reported a failure
    #[error("query backend error: {0}")]
    Backend(String),
}

/// The tail end of a projected query
///
/// Projection is always the last shaping step, so the projected side of a
/// query only materializes; it composes no further.
pub trait ProjectedQueryable<R>: Sized + Send {
    /// Materialize all projected rows
    fn to_list(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Vec<R>, QueryError>> + Send;

    /// Materialize the first projected row, if any
    fn first_or_default(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Option<R>, QueryError>> + Send;
}

/// A composable query over entities of type `T`
///
/// Combinators are applied by evaluators in pipeline order; each consumes
/// and returns the query so backends can thread native builder state
/// through. `Projected` is the queryable produced by [`select`](Self::select),
/// over the projection target instead of the entity.
pub trait Queryable<T>: Sized + Send {
    /// The queryable over projection results
    type Projected<R: Send + 'static>: ProjectedQueryable<R>;

    /// Restrict to rows matching a filter condition
    #[must_use]
    fn filter(self, condition: &FilterCondition) -> Self;

    /// Restrict to rows matching the search directives
    ///
    /// Directives sharing a group combine with OR; groups combine with AND.
    #[must_use]
    fn search(self, expressions: &[SearchExpression<T>]) -> Self;

    /// Eagerly load a typed navigation
    #[must_use]
    fn include(self, expression: &IncludeExpression) -> Self;

    /// Eagerly load a string navigation path
    #[must_use]
    fn include_path(self, path: &str) -> Self;

    /// Append an order directive to the sort chain
    #[must_use]
    fn order(self, expression: &OrderExpression<T>) -> Self;

    /// Skip the first `count` rows
    #[must_use]
    fn skip(self, count: u64) -> Self;

    /// Limit the result to `count` rows
    #[must_use]
    fn take(self, count: u64) -> Self;

    /// Group rows by a field, flattening groups in first-appearance order
    #[must_use]
    fn group_by(self, field: &str) -> Self;

    /// Set the tracking mode; backends without tracking ignore this
    #[must_use]
    fn with_tracking(self, _mode: TrackingMode) -> Self {
        self
    }

    /// Hint to split the query per included collection
    #[must_use]
    fn as_split_query(self) -> Self {
        self
    }

    /// Bypass backend-level global filters
    #[must_use]
    fn ignore_query_filters(self) -> Self {
        self
    }

    /// Request result caching
    #[must_use]
    fn with_cache(self, _hint: &CacheHint) -> Self {
        self
    }

    /// Project each row through a selector
    #[must_use]
    fn select<R: Send + 'static>(self, projector: Projector<T, R>) -> Self::Projected<R>;

    /// Materialize all rows
    fn to_list(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Vec<T>, QueryError>> + Send;

    /// Materialize the first row, if any
    fn first_or_default(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Option<T>, QueryError>> + Send;

    /// Count matching rows without materializing them
    fn long_count(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<u64, QueryError>> + Send;
}
