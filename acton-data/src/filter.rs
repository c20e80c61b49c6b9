//! Declarative filter conditions
//!
//! A [`FilterCondition`] names a field, an operator, and a comparison value.
//! Store backends translate conditions into their native query language; the
//! in-memory paths evaluate them against [`FieldAccess`] directly. Conditions
//! on a field the entity does not expose behave like SQL `NULL`: nothing
//! matches except `IsNull`.
//!
//! # Example
//!
//! ```rust
//! use acton_data::filter::FilterCondition;
//!
//! let active = FilterCondition::eq("active", true);
//! let adults = FilterCondition::gte("age", 18_i64);
//! let named = FilterCondition::like("name", "%smith%");
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{FieldAccess, FieldValue};

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equal to
    Equal,
    /// Not equal to
    NotEqual,
    /// Greater than
    GreaterThan,
    /// Greater than or equal to
    GreaterThanOrEqual,
    /// Less than
    LessThan,
    /// Less than or equal to
    LessThanOrEqual,
    /// Pattern match (`%` any run, `_` any single character, case-insensitive)
    Like,
    /// Value is contained in a list
    In,
    /// Field is null
    IsNull,
    /// Field is not null
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A single field condition
///
/// Constructed through the operator-specific helpers so that operator and
/// value kind always line up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Field name to filter on
    pub field: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Value to compare against (null for the null-check operators)
    pub value: FieldValue,
}

impl FilterCondition {
    fn new(field: impl Into<String>, operator: FilterOperator, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Field equals value
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Field does not equal value
    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Field is greater than value
    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Field is greater than or equal to value
    pub fn gte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Field is less than value
    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Field is less than or equal to value
    pub fn lte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Field matches a `LIKE` pattern (`%` and `_` wildcards, case-insensitive)
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FieldValue::String(pattern.into()))
    }

    /// Field value is one of the given strings
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FieldValue::StringList(values))
    }

    /// Field value is one of the given integers
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FieldValue::IntegerList(values))
    }

    /// Field is null (or absent on the entity)
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FieldValue::Null)
    }

    /// Field is present and not null
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FieldValue::Null)
    }

    /// Evaluate this condition against an entity
    pub fn matches<T: FieldAccess>(&self, entity: &T) -> bool {
        self.matches_value(entity.field(&self.field).as_ref())
    }

    /// Evaluate this condition against an already-looked-up field value
    ///
    /// `None` means the entity has no such field and is treated like null.
    pub fn matches_value(&self, value: Option<&FieldValue>) -> bool {
        let value = match value {
            Some(v) if !v.is_null() => v,
            // Null or missing: only the null checks can match.
            _ => {
                return matches!(self.operator, FilterOperator::IsNull);
            }
        };

        match self.operator {
            FilterOperator::IsNull => false,
            FilterOperator::IsNotNull => true,
            FilterOperator::Equal => value.compare(&self.value) == Some(Ordering::Equal),
            FilterOperator::NotEqual => match value.compare(&self.value) {
                Some(ordering) => ordering != Ordering::Equal,
                // Incomparable kinds are trivially not equal.
                None => true,
            },
            FilterOperator::GreaterThan => value.compare(&self.value) == Some(Ordering::Greater),
            FilterOperator::GreaterThanOrEqual => matches!(
                value.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::LessThan => value.compare(&self.value) == Some(Ordering::Less),
            FilterOperator::LessThanOrEqual => matches!(
                value.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::Like => match (value.as_text(), self.value.as_text()) {
                (Some(text), Some(pattern)) => like_match(pattern, text),
                _ => false,
            },
            FilterOperator::In => match (&self.value, value) {
                (FieldValue::StringList(list), FieldValue::String(s)) => list.contains(s),
                (FieldValue::IntegerList(list), FieldValue::Integer(n)) => list.contains(n),
                _ => false,
            },
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            FilterOperator::IsNull | FilterOperator::IsNotNull => {
                write!(f, "{} {}", self.field, self.operator)
            }
            _ => write!(f, "{} {} {}", self.field, self.operator, self.value),
        }
    }
}

/// Case-insensitive `LIKE` pattern match
///
/// `%` matches any run of characters (including empty), `_` matches exactly
/// one character. Matching is performed on lowercased text.
pub fn like_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    like_match_inner(&pattern, &text)
}

fn like_match_inner(pattern: &[char], text: &[char]) -> bool {
    // Iterative wildcard matching with single-level backtracking to the most
    // recent `%`.
    let (mut p, mut t) = (0_usize, 0_usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_display() {
        assert_eq!(FilterOperator::Equal.to_string(), "=");
        assert_eq!(FilterOperator::Like.to_string(), "LIKE");
        assert_eq!(FilterOperator::IsNotNull.to_string(), "IS NOT NULL");
    }

    #[test]
    fn test_condition_display() {
        assert_eq!(FilterCondition::eq("name", "ada").to_string(), "name = ada");
        assert_eq!(FilterCondition::is_null("email").to_string(), "email IS NULL");
    }

    #[test]
    fn test_equal_and_not_equal() {
        let cond = FilterCondition::eq("age", 30_i64);
        assert!(cond.matches_value(Some(&FieldValue::Integer(30))));
        assert!(cond.matches_value(Some(&FieldValue::Float(30.0))));
        assert!(!cond.matches_value(Some(&FieldValue::Integer(31))));

        let cond = FilterCondition::ne("age", 30_i64);
        assert!(cond.matches_value(Some(&FieldValue::Integer(31))));
        assert!(!cond.matches_value(Some(&FieldValue::Integer(30))));
        // Incomparable kinds count as not equal.
        assert!(cond.matches_value(Some(&FieldValue::Boolean(true))));
    }

    #[test]
    fn test_ordering_operators() {
        assert!(FilterCondition::gt("n", 5_i64).matches_value(Some(&FieldValue::Integer(6))));
        assert!(!FilterCondition::gt("n", 5_i64).matches_value(Some(&FieldValue::Integer(5))));
        assert!(FilterCondition::gte("n", 5_i64).matches_value(Some(&FieldValue::Integer(5))));
        assert!(FilterCondition::lt("n", 5_i64).matches_value(Some(&FieldValue::Integer(4))));
        assert!(FilterCondition::lte("n", 5_i64).matches_value(Some(&FieldValue::Integer(5))));
        assert!(!FilterCondition::lte("n", 5_i64).matches_value(Some(&FieldValue::Integer(6))));
    }

    #[test]
    fn test_in_lists() {
        let cond = FilterCondition::in_strings("color", vec!["red".to_string(), "blue".to_string()]);
        assert!(cond.matches_value(Some(&FieldValue::String("red".to_string()))));
        assert!(!cond.matches_value(Some(&FieldValue::String("green".to_string()))));

        let cond = FilterCondition::in_integers("n", vec![1, 2, 3]);
        assert!(cond.matches_value(Some(&FieldValue::Integer(2))));
        assert!(!cond.matches_value(Some(&FieldValue::Integer(9))));
    }

    #[test]
    fn test_null_checks() {
        let is_null = FilterCondition::is_null("email");
        assert!(is_null.matches_value(None));
        assert!(is_null.matches_value(Some(&FieldValue::Null)));
        assert!(!is_null.matches_value(Some(&FieldValue::Integer(1))));

        let is_not_null = FilterCondition::is_not_null("email");
        assert!(!is_not_null.matches_value(None));
        assert!(!is_not_null.matches_value(Some(&FieldValue::Null)));
        assert!(is_not_null.matches_value(Some(&FieldValue::Integer(1))));
    }

    #[test]
    fn test_missing_field_matches_nothing_but_is_null() {
        assert!(!FilterCondition::eq("ghost", 1_i64).matches_value(None));
        assert!(!FilterCondition::ne("ghost", 1_i64).matches_value(None));
        assert!(!FilterCondition::like("ghost", "%a%").matches_value(None));
        assert!(FilterCondition::is_null("ghost").matches_value(None));
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like_match("%smith%", "John Smithers"));
        assert!(like_match("smith", "Smith"));
        assert!(like_match("sm_th", "smith"));
        assert!(like_match("%", ""));
        assert!(like_match("a%z", "az"));
        assert!(like_match("a%z", "abcz"));
        assert!(!like_match("a%z", "abc"));
        assert!(!like_match("sm_th", "smiith"));
        assert!(!like_match("", "x"));
        assert!(like_match("", ""));
    }

    #[test]
    fn test_like_is_case_insensitive() {
        let cond = FilterCondition::like("name", "%ADA%");
        assert!(cond.matches_value(Some(&FieldValue::String("ada lovelace".to_string()))));
    }

    #[test]
    fn test_like_non_string_value() {
        let cond = FilterCondition::like("n", "%1%");
        assert!(!cond.matches_value(Some(&FieldValue::Integer(1))));
    }
}
