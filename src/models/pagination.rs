//! Pagination types shared by the feeds and the moderation API
//!
//! Page numbers are 1-indexed. A requested page is first parsed leniently
//! ([`ListParams::from_query`]) and then clamped against the row count
//! ([`ListParams::clamp_to`]), so every request lands on an existing page.

use serde::{Deserialize, Serialize};

/// Fixed page size of the public feeds
pub const POSTS_PER_PAGE: u32 = 10;

/// Pagination parameters
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
            per_page: POSTS_PER_PAGE,
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
    /// Missing or non-numeric values select page 1, as do numbers below 1.
    /// Numbers past the end are kept and resolved by [`ListParams::clamp_to`].
    pub fn from_query(raw: Option<&str>, per_page: u32) -> Self {
        let page = raw
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(|n| n.clamp(1, u32::MAX as i64) as u32)
            .unwrap_or(1);
        Self::new(page, per_page)
    }

    /// Number of pages needed for `total` items; never less than one.
    pub fn page_count(total: i64, per_page: u32) -> u32 {
        let per_page = per_page.max(1) as i64;
        let total = total.max(0);
        (((total + per_page - 1) / per_page).max(1)).min(u32::MAX as i64) as u32
    }

    /// Clamp the page into `1..=page_count(total)`
    pub fn clamp_to(&self, total: i64) -> Self {
        Self {
            page: self.page.clamp(1, Self::page_count(total, self.per_page)),
            per_page: self.per_page,
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1) as i64 * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
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

    /// Calculate the total number of pages (at least one)
    pub fn total_pages(&self) -> u32 {
        ListParams::page_count(self.total, self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Navigation block for templates
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            number: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages(),
            has_next: self.has_next(),
            has_prev: self.has_prev(),
            next_page: self.has_next().then(|| self.page + 1),
            prev_page: self.has_prev().then(|| self.page - 1),
        }
    }

    /// Transform the items while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Serializable page navigation info
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
}
