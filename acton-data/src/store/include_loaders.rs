//! Eager-load delegate registry
//!
//! In-memory stores resolve include directives through this registry: a
//! concurrent map from the include's type shape (root entity, included
//! property, optional previous hop) or its string path to a type-erased
//! loader delegate. Loaders are registered once at startup and looked up on
//! every materialization; concurrent registrations of the same key are a
//! benign last-write-wins race.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

use crate::specification::IncludeExpression;

/// A delegate that populates an eager-loaded navigation on an entity
pub type IncludeLoader<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

type ShapeKey = (TypeId, TypeId, Option<TypeId>);
type ErasedLoader = Arc<dyn Any + Send + Sync>;

/// Concurrent registry of include loaders
///
/// # Example
///
/// ```rust
/// use acton_data::store::IncludeLoaderRegistry;
///
/// struct Order { lines: Vec<String> }
/// struct Lines;
///
/// let registry = IncludeLoaderRegistry::new();
/// registry.register::<Order, Lines>(|order: &mut Order| {
///     order.lines = vec!["loaded".to_string()];
/// });
/// ```
#[derive(Default)]
pub struct IncludeLoaderRegistry {
    by_shape: DashMap<ShapeKey, ErasedLoader>,
    by_path: DashMap<(TypeId, String), ErasedLoader>,
}

impl IncludeLoaderRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the loader for a root include of property `P` on entity `E`
    pub fn register<E, P>(&self, loader: impl Fn(&mut E) + Send + Sync + 'static)
    where
        E: 'static,
        P: 'static,
    {
        let erased: IncludeLoader<E> = Arc::new(loader);
        self.by_shape.insert(
            (TypeId::of::<E>(), TypeId::of::<P>(), None),
            Arc::new(erased),
        );
    }

    /// Register the loader for a chained include of `P` reached through `Prev`
    pub fn register_chained<E, Prev, P>(&self, loader: impl Fn(&mut E) + Send + Sync + 'static)
    where
        E: 'static,
        Prev: 'static,
        P: 'static,
    {
        let erased: IncludeLoader<E> = Arc::new(loader);
        self.by_shape.insert(
            (
                TypeId::of::<E>(),
                TypeId::of::<P>(),
                Some(TypeId::of::<Prev>()),
            ),
            Arc::new(erased),
        );
    }

    /// Register the loader for a string navigation path on entity `E`
    pub fn register_path<E: 'static>(
        &self,
        path: impl Into<String>,
        loader: impl Fn(&mut E) + Send + Sync + 'static,
    ) {
        let erased: IncludeLoader<E> = Arc::new(loader);
        self.by_path
            .insert((TypeId::of::<E>(), path.into()), Arc::new(erased));
    }

    /// Look up the loader matching a typed include directive
    ///
    /// Returns `None` when no loader was registered for the directive's
    /// shape, or when `T` is not the directive's root entity.
    pub fn resolve<T: 'static>(&self, expression: &IncludeExpression) -> Option<IncludeLoader<T>> {
        if expression.entity().id != TypeId::of::<T>() {
            return None;
        }
        let key = (
            expression.entity().id,
            expression.property().id,
            expression.previous().map(|shape| shape.id),
        );
        self.by_shape
            .get(&key)
            .and_then(|entry| entry.value().downcast_ref::<IncludeLoader<T>>().cloned())
    }

    /// Look up the loader for a string navigation path
    pub fn resolve_path<T: 'static>(&self, path: &str) -> Option<IncludeLoader<T>> {
        self.by_path
            .get(&(TypeId::of::<T>(), path.to_string()))
            .and_then(|entry| entry.value().downcast_ref::<IncludeLoader<T>>().cloned())
    }

    /// Number of registered loaders
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_shape.len() + self.by_path.len()
    }

    /// Whether no loaders are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_shape.is_empty() && self.by_path.is_empty()
    }
}
