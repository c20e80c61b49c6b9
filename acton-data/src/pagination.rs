//! Page-based pagination
//!
//! A [`PaginationFilter`] is the page-number view of a skip/take pair. Page
//! numbers are 1-based; both fields are clamped to at least 1 so that a
//! zeroed filter arriving from the wire cannot produce a degenerate query.

use serde::{Deserialize, Serialize};

/// A 1-based page request
///
/// # Example
///
/// ```rust
/// use acton_data::pagination::PaginationFilter;
///
/// let page = PaginationFilter::new(3, 25);
/// assert_eq!(page.skip(), 50);
/// assert_eq!(page.take(), 25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationFilter {
    page_number: u64,
    page_size: u64,
}

impl PaginationFilter {
    /// Create a filter, clamping page number and size to at least 1
    pub fn new(page_number: u64, page_size: u64) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.max(1),
        }
    }

    /// The 1-based page number
    #[must_use]
    pub const fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Number of rows per page
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Rows to skip before this page starts
    #[must_use]
    pub const fn skip(&self) -> u64 {
        self.page_number.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Rows to take for this page
    #[must_use]
    pub const fn take(&self) -> u64 {
        self.page_size
    }

    /// Derive the filter equivalent to an explicit skip/take pair
    ///
    /// The page number is `skip / take + 1` when skip divides evenly;
    /// otherwise the offsets do not align to page boundaries and the first
    /// covering page is used.
    pub fn from_skip_take(skip: u64, take: u64) -> Self {
        let take = take.max(1);
        Self {
            page_number: skip / take + 1,
            page_size: take,
        }
    }
}

impl Default for PaginationFilter {
    fn default() -> Self {
        Self::new(1, 20)
    }
}
