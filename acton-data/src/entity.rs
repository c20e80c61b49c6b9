//! Entity contracts for specification-driven queries
//!
//! Queries in this crate are described declaratively as field conditions, so
//! an entity has to expose its fields to the evaluation machinery. The
//! [`FieldAccess`] trait is that contract: given a field name, return its
//! current value as a [`FieldValue`]. Store backends translate conditions
//! into their native query language; the in-memory paths evaluate them
//! against `FieldAccess` directly, which keeps both backends on identical
//! semantics.
//!
//! # Example
//!
//! ```rust
//! use acton_data::entity::{Entity, FieldAccess, FieldValue};
//!
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
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// A persistable entity with a stable identifier
///
/// The identifier is what repositories key lookups and deletions on, and what
/// audit entries record as the primary key of a change.
pub trait Entity: Send + Sync + 'static {
    /// The identifier type (e.g. `i64`, `Uuid`, a newtype id)
    type Id: fmt::Display + Eq + Hash + Clone + Send + Sync;

    /// The entity's identifier
    fn id(&self) -> Self::Id;

    /// Short entity name used in audit entries and error messages
    ///
    /// Defaults to the unqualified type name.
    fn entity_name() -> &'static str {
        let name = std::any::type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name)
    }
}

/// Field lookup by name, the contract compiled query delegates run against
///
/// Returning `None` for an unknown field is not an error: conditions on a
/// missing field behave like SQL `NULL`. Filters and search never match,
/// and ordering sorts the entity first.
pub trait FieldAccess {
    /// The current value of the named field, if the entity has one
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// A field value usable in filter conditions, order keys, and search
///
/// # Example
///
/// ```rust
/// use acton_data::entity::FieldValue;
///
/// let string_val: FieldValue = "active".into();
/// let int_val: FieldValue = 42_i64.into();
/// let bool_val: FieldValue = true.into();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN conditions)
    StringList(Vec<String>),
    /// List of integer values (for IN conditions)
    IntegerList(Vec<i64>),
    /// Null value
    Null,
}

impl FieldValue {
    /// The string content, if this is a string value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is null
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view for cross-type comparison between integers and floats
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Compare two values of compatible kinds
    ///
    /// Integers and floats compare numerically against each other. Returns
    /// `None` when the kinds are not comparable (e.g. string vs boolean).
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Total ordering used by the order evaluators
    ///
    /// Null sorts first; values of incomparable kinds fall back to a fixed
    /// kind rank so that sorting is always total and deterministic.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        self.compare(other)
            .unwrap_or_else(|| self.kind_rank().cmp(&other.kind_rank()))
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
            Self::StringList(_) => 4,
            Self::IntegerList(_) => 5,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::StringList(list) => write!(f, "[{}]", list.join(", ")),
            Self::IntegerList(list) => {
                let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl<V> From<Option<V>> for FieldValue
where
    V: Into<FieldValue>,
{
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
