//! Vec-backed query source
//!
//! [`MemoryQuery`] evaluates specifications against in-memory rows with the
//! same semantics a translating backend would produce: filters and search
//! apply immediately, ordering and pagination are deferred until
//! materialization so the full sort chain is known, and eager loads resolve
//! through an [`IncludeLoaderRegistry`].

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::entity::{FieldAccess, FieldValue};
use crate::filter::FilterCondition;
use crate::query::{ProjectedQueryable, Projector, QueryError, Queryable, TrackingMode};
use crate::specification::short_type_name;
use crate::specification::{IncludeExpression, OrderExpression, SearchExpression};
use crate::store::include_loaders::IncludeLoaderRegistry;

#[derive(Debug, Clone)]
struct OrderStep {
    field: String,
    descending: bool,
}

/// An in-memory [`Queryable`] over a snapshot of rows
pub struct MemoryQuery<T> {
    rows: Vec<T>,
    orders: Vec<OrderStep>,
    skip_count: Option<u64>,
    take_count: Option<u64>,
    group_field: Option<String>,
    typed_includes: Vec<IncludeExpression>,
    path_includes: Vec<String>,
    loaders: Option<Arc<IncludeLoaderRegistry>>,
    tracking: TrackingMode,
}

impl<T> MemoryQuery<T> {
    /// A query over rows with no eager-load support
    #[must_use]
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows,
            orders: Vec::new(),
            skip_count: None,
            take_count: None,
            group_field: None,
            typed_includes: Vec::new(),
            path_includes: Vec::new(),
            loaders: None,
            tracking: TrackingMode::default(),
        }
    }

    /// A query over rows whose include directives resolve through `loaders`
    #[must_use]
    pub fn with_loaders(rows: Vec<T>, loaders: Arc<IncludeLoaderRegistry>) -> Self {
        Self {
            loaders: Some(loaders),
            ..Self::new(rows)
        }
    }

    pub(crate) fn pending_skip(&self) -> Option<u64> {
        self.skip_count
    }

    pub(crate) fn pending_take(&self) -> Option<u64> {
        self.take_count
    }

    pub(crate) fn pending_order_len(&self) -> usize {
        self.orders.len()
    }

    pub(crate) const fn tracking(&self) -> TrackingMode {
        self.tracking
    }
}

impl<T: FieldAccess + Send + 'static> MemoryQuery<T> {
    fn resolve_includes(&self, rows: &mut [T]) -> Result<(), QueryError> {
        if self.typed_includes.is_empty() && self.path_includes.is_empty() {
            return Ok(());
        }
        let registry = self.loaders.as_ref().ok_or_else(|| {
            let path = self
                .typed_includes
                .first()
                .map(|e| e.path().to_string())
                .or_else(|| self.path_includes.first().cloned())
                .unwrap_or_default();
            QueryError::UnresolvedInclude {
                entity: short_type_name::<T>(),
                path,
            }
        })?;

        for expression in &self.typed_includes {
            let loader = registry.resolve::<T>(expression).ok_or_else(|| {
                QueryError::UnresolvedInclude {
                    entity: short_type_name::<T>(),
                    path: expression.path().to_string(),
                }
            })?;
            for row in rows.iter_mut() {
                loader(row);
            }
        }
        for path in &self.path_includes {
            let loader =
                registry
                    .resolve_path::<T>(path)
                    .ok_or_else(|| QueryError::UnresolvedInclude {
                        entity: short_type_name::<T>(),
                        path: path.clone(),
                    })?;
            for row in rows.iter_mut() {
                loader(row);
            }
        }
        Ok(())
    }

    /// Apply the deferred operations and produce the final row set
    ///
    /// Sort runs over the full surviving set, pagination windows it, groups
    /// flatten last. Eager loads run only over the rows that materialize.
    fn run(mut self) -> Result<Vec<T>, QueryError> {
        let mut rows = std::mem::take(&mut self.rows);

        if !self.orders.is_empty() {
            let orders = &self.orders;
            rows.sort_by(|a, b| {
                for step in orders {
                    let key_a = a.field(&step.field).unwrap_or(FieldValue::Null);
                    let key_b = b.field(&step.field).unwrap_or(FieldValue::Null);
                    let mut ordering = key_a.sort_cmp(&key_b);
                    if step.descending {
                        ordering = ordering.reverse();
                    }
                    if ordering != std::cmp::Ordering::Equal {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        if let Some(skip) = self.skip_count {
            let skip = usize::try_from(skip).unwrap_or(usize::MAX);
            if skip >= rows.len() {
                rows.clear();
            } else {
                rows.drain(..skip);
            }
        }
        if let Some(take) = self.take_count {
            rows.truncate(usize::try_from(take).unwrap_or(usize::MAX));
        }

        if let Some(field) = &self.group_field {
            rows = flatten_groups(rows, field);
        }

        self.resolve_includes(&mut rows)?;
        Ok(rows)
    }
}

/// Group rows by a field and flatten groups in first-appearance order
fn flatten_groups<T: FieldAccess>(rows: Vec<T>, field: &str) -> Vec<T> {
    let mut keys: Vec<FieldValue> = Vec::new();
    let mut groups: Vec<Vec<T>> = Vec::new();
    for row in rows {
        let key = row.field(field).unwrap_or(FieldValue::Null);
        match keys.iter().position(|k| *k == key) {
            Some(index) => groups[index].push(row),
            None => {
                keys.push(key);
                groups.push(vec![row]);
            }
        }
    }
    groups.into_iter().flatten().collect()
}

impl<T: FieldAccess + Send + 'static> Queryable<T> for MemoryQuery<T> {
    type Projected<R: Send + 'static> = ProjectedRows<R>;

    fn filter(mut self, condition: &FilterCondition) -> Self {
        self.rows.retain(|row| condition.matches(row));
        self
    }

    fn search(mut self, expressions: &[SearchExpression<T>]) -> Self {
        if expressions.is_empty() {
            return self;
        }
        let mut groups: BTreeMap<u32, Vec<&SearchExpression<T>>> = BTreeMap::new();
        for expression in expressions {
            groups.entry(expression.group()).or_default().push(expression);
        }
        self.rows.retain(|row| {
            groups
                .values()
                .all(|group| group.iter().any(|expression| expression.matches(row)))
        });
        self
    }

    fn include(mut self, expression: &IncludeExpression) -> Self {
        self.typed_includes.push(expression.clone());
        self
    }

    fn include_path(mut self, path: &str) -> Self {
        self.path_includes.push(path.to_string());
        self
    }

    fn order(mut self, expression: &OrderExpression<T>) -> Self {
        self.orders.push(OrderStep {
            field: expression.field().to_string(),
            descending: expression.kind().is_descending(),
        });
        self
    }

    fn skip(mut self, count: u64) -> Self {
        self.skip_count = Some(count);
        self
    }

    fn take(mut self, count: u64) -> Self {
        self.take_count = Some(count);
        self
    }

    fn group_by(mut self, field: &str) -> Self {
        self.group_field = Some(field.to_string());
        self
    }

    fn with_tracking(mut self, mode: TrackingMode) -> Self {
        // Recorded for introspection; in-memory rows are always detached.
        self.tracking = mode;
        self
    }

    fn select<R: Send + 'static>(self, projector: Projector<T, R>) -> ProjectedRows<R> {
        ProjectedRows {
            result: self
                .run()
                .map(|rows| rows.into_iter().map(|row| projector(row)).collect()),
        }
    }

    fn to_list(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Vec<T>, QueryError>> + Send {
        async move {
            if cancellation.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            self.run()
        }
    }

    fn first_or_default(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Option<T>, QueryError>> + Send {
        async move {
            if cancellation.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            Ok(self.run()?.into_iter().next())
        }
    }

    fn long_count(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<u64, QueryError>> + Send {
        async move {
            if cancellation.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            Ok(self.run()?.len() as u64)
        }
    }
}

/// Projected rows awaiting materialization
///
/// Projection runs the source query eagerly; any failure is held and
/// surfaced when the projected result is materialized.
pub struct ProjectedRows<R> {
    result: Result<Vec<R>, QueryError>,
}

impl<R: Send + 'static> ProjectedQueryable<R> for ProjectedRows<R> {
    fn to_list(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Vec<R>, QueryError>> + Send {
        async move {
            if cancellation.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            self.result
        }
    }

    fn first_or_default(
        self,
        cancellation: CancellationToken,
    ) -> impl Future<Output = Result<Option<R>, QueryError>> + Send {
        async move {
            if cancellation.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            Ok(self.result?.into_iter().next())
        }
    }
}
