//! Audit trail for committed changes
//!
//! When a unit of work commits, each staged change is described as an
//! [`AuditEntry`]: who changed what, the before and after snapshots, and
//! which columns differ. Entries go to an [`AuditRecorder`];
//! [`TracingAuditRecorder`] emits them as structured log events and
//! [`InMemoryAuditRecorder`] collects them for inspection in tests.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::store::{ChangeDescriptor, ChangeKind};

/// The kind of audited change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// An entity was created
    Create,
    /// An entity was modified
    Update,
    /// An entity was removed
    Delete,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl From<ChangeKind> for AuditKind {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Insert => Self::Create,
            ChangeKind::Update => Self::Update,
            ChangeKind::Remove => Self::Delete,
        }
    }
}

/// One audited change, built from a staged change descriptor
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Entity type name
    pub entity_name: &'static str,
    /// Change kind
    pub kind: AuditKind,
    /// Rendered primary key
    pub key: String,
    /// Acting user, when the commit names one
    pub user_id: Option<String>,
    /// Snapshot before the change
    pub old_values: Option<Value>,
    /// Snapshot after the change
    pub new_values: Option<Value>,
    /// Top-level fields whose values differ, for updates
    pub changed_columns: Vec<String>,
    /// When the entry was created
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Describe a staged change, attributing it to `user_id`
    #[must_use]
    pub fn from_change(change: ChangeDescriptor, user_id: Option<&str>) -> Self {
        let kind = AuditKind::from(change.kind);
        let changed_columns = match kind {
            AuditKind::Update => diff_columns(change.old.as_ref(), change.new.as_ref()),
            _ => Vec::new(),
        };
        Self {
            entity_name: change.entity_name,
            kind,
            key: change.key,
            user_id: user_id.map(str::to_string),
            old_values: change.old,
            new_values: change.new,
            changed_columns,
            timestamp: Utc::now(),
        }
    }

    /// Flatten into a persistable log row with serialized payloads
    #[must_use]
    pub fn into_log(self) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            entity_name: self.entity_name.to_string(),
            kind: self.kind,
            key: self.key,
            user_id: self.user_id,
            old_values: self.old_values.map(|v| v.to_string()),
            new_values: self.new_values.map(|v| v.to_string()),
            changed_columns: self.changed_columns.join(","),
            timestamp: self.timestamp,
        }
    }
}

/// A persistable audit row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// Row id
    pub id: Uuid,
    /// Entity type name
    pub entity_name: String,
    /// Change kind
    pub kind: AuditKind,
    /// Rendered primary key
    pub key: String,
    /// Acting user
    pub user_id: Option<String>,
    /// Serialized before-snapshot
    pub old_values: Option<String>,
    /// Serialized after-snapshot
    pub new_values: Option<String>,
    /// Comma-separated changed field names
    pub changed_columns: String,
    /// When the change was recorded
    pub timestamp: DateTime<Utc>,
}

/// Top-level fields whose values differ between two JSON object snapshots
fn diff_columns(old: Option<&Value>, new: Option<&Value>) -> Vec<String> {
    let (Some(Value::Object(old)), Some(Value::Object(new))) = (old, new) else {
        return Vec::new();
    };
    let mut columns: Vec<String> = Vec::new();
    for (key, new_value) in new {
        if old.get(key) != Some(new_value) {
            columns.push(key.clone());
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            columns.push(key.clone());
        }
    }
    columns
}

/// Sink for audit entries produced at commit time
pub trait AuditRecorder: Send + Sync {
    /// Record the entries of one committed batch
    fn record(&self, entries: Vec<AuditEntry>);
}

/// Emits each entry as a structured `tracing` event
pub struct TracingAuditRecorder;

impl AuditRecorder for TracingAuditRecorder {
    fn record(&self, entries: Vec<AuditEntry>) {
        for entry in entries {
            info!(
                entity = entry.entity_name,
                kind = %entry.kind,
                key = %entry.key,
                user_id = entry.user_id.as_deref().unwrap_or("system"),
                changed = ?entry.changed_columns,
                "audit"
            );
        }
    }
}

/// Collects entries for inspection, mainly in tests
#[derive(Default)]
pub struct InMemoryAuditRecorder {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditRecorder {
    /// An empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far
    pub fn recorded(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditRecorder for InMemoryAuditRecorder {
    fn record(&self, entries: Vec<AuditEntry>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(entries);
    }
}
