//! Repositories and the unit of work
//!
//! [`ReadOnlyRepository`] evaluates specifications against a store's
//! queries; [`Repository`] adds staged mutations; [`UnitOfWork`] owns the
//! context, caches repositories per entity type, and commits everything as
//! one batch with optional audit recording.

mod error;
mod read_only;
mod unit_of_work;
mod write;

pub use error::{RepositoryError, RepositoryResult};
pub use read_only::ReadOnlyRepository;
pub use unit_of_work::UnitOfWork;
pub use write::Repository;
