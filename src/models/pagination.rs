//! Pagination types
//!
//! Listings are paged 10 at a time. The requested page number comes straight
//! from the query string and is never an error: garbage falls back to the
//! first page and anything past the end lands on the last page.

use serde::{Deserialize, Serialize};

/// Fixed page size for every post listing
pub const PAGE_SIZE: u32 = 10;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: PAGE_SIZE,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Parse the raw `page` query value.
    ///
    /// Missing, empty or non-numeric input means page 1. Zero and negative
    /// numbers clamp to page 1; numbers too large to represent clamp to the
    /// highest page, which `clamp_to` then brings down to the last one.
    pub fn from_query(raw: Option<&str>) -> Self {
        let page = raw.map(str::trim).map_or(1, parse_page);
        Self::new(page, PAGE_SIZE)
    }

    /// Clamp the requested page into `1..=total_pages` for `total` items
    pub fn clamp_to(self, total: i64) -> Self {
        let last = total_pages_for(total, self.per_page);
        Self {
            page: self.page.min(last),
            per_page: self.per_page,
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

fn parse_page(value: &str) -> u32 {
    if let Ok(n) = value.parse::<i64>() {
        return n.clamp(1, u32::MAX as i64) as u32;
    }
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    if negative {
        1
    } else {
        u32::MAX
    }
}

/// An empty listing still has one (empty) page.
fn total_pages_for(total: i64, per_page: u32) -> u32 {
    let per_page = per_page.max(1) as i64;
    let pages = (total.max(0) + per_page - 1) / per_page;
    pages.clamp(1, u32::MAX as i64) as u32
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        total_pages_for(self.total, self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of items in the current page
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: PAGE_SIZE,
        }
    }
}

/// Page an already-ordered in-memory sequence
#[cfg(test)]
fn paginate<T: Clone>(items: &[T], params: ListParams) -> PagedResult<T> {
    let total = items.len() as i64;
    let params = params.clamp_to(total);
    let start = (params.offset() as usize).min(items.len());
    let end = (start + params.per_page as usize).min(items.len());
    PagedResult::new(items[start..end].to_vec(), total, &params)
}
