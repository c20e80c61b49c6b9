//! Specification-driven data access with repositories, unit of work, and
//! audit logging
//!
//! Queries are described once as [`Specification`](specification::Specification)
//! values: filters, search, ordering, eager loads, pagination, and backend
//! hints, assembled through a fail-fast builder. Evaluator pipelines apply a
//! specification either to a store-backed [`Queryable`](query::Queryable) or
//! to already-materialized items, with identical semantics on both paths.
//!
//! Repositories sit on top: [`ReadOnlyRepository`](repository::ReadOnlyRepository)
//! for specification-driven reads, [`Repository`](repository::Repository)
//! for staged mutations, and [`UnitOfWork`](repository::UnitOfWork) to
//! commit everything as one batch and describe each change to an audit
//! recorder.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use acton_data::prelude::*;
//! use serde::Serialize;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, Clone, Serialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     active: bool,
//! }
//!
//! impl Entity for User {
//!     type Id = i64;
//!
//!     fn id(&self) -> i64 {
//!         self.id
//!     }
//! }
//!
//! impl FieldAccess for User {
//!     fn field(&self, name: &str) -> Option<FieldValue> {
//!         match name {
//!             "id" => Some(self.id.into()),
//!             "name" => Some(self.name.clone().into()),
//!             "active" => Some(self.active.into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::<User>::new());
//! store.seed([
//!     User { id: 1, name: "ada".into(), active: true },
//!     User { id: 2, name: "grace".into(), active: false },
//! ]);
//!
//! let spec = Specification::<User>::builder()
//!     .filter(FilterCondition::eq("active", true))?
//!     .order_by("name")?
//!     .build();
//!
//! let repository = ReadOnlyRepository::new(store);
//! let active = repository.find(&spec, CancellationToken::new()).await?;
//! assert_eq!(active.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! The crate ships [`MemoryStore`](store::MemoryStore), a map-backed store
//! with real commit semantics. Database backends plug in by implementing
//! [`Queryable`](query::Queryable), [`EntityStore`](store::EntityStore), and
//! [`DataContext`](store::DataContext); the repositories and evaluators are
//! generic over them.

pub mod audit;
pub mod config;
pub mod entity;
pub mod filter;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod specification;
pub mod store;

/// Commonly used types, importable in one line
pub mod prelude {
    pub use crate::audit::{AuditEntry, AuditKind, AuditRecorder, TracingAuditRecorder};
    pub use crate::config::DataAccessConfig;
    pub use crate::entity::{Entity, FieldAccess, FieldValue};
    pub use crate::filter::{FilterCondition, FilterOperator};
    pub use crate::pagination::PaginationFilter;
    pub use crate::query::{
        CacheExpirationMode, CacheHint, MappingConfig, MemoryQuery, ProjectedQueryable, Projector,
        QueryError, Queryable, TrackingMode,
    };
    pub use crate::repository::{
        ReadOnlyRepository, Repository, RepositoryError, RepositoryResult, UnitOfWork,
    };
    pub use crate::specification::{
        EvaluationError, ProjectionSpecification, Specification, SpecificationError,
        SpecificationValidator,
    };
    pub use crate::store::{
        DataContext, EntityStore, IncludeLoaderRegistry, MemoryStore, StoreProvider,
    };
}
