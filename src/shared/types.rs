use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl Meta {
    pub fn total(total: i64) -> Self {
        Self {
            total,
            pagination: None,
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Standard pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PaginationQuery {
    /// Page number (1-indexed, default: 1)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    /// Number of items per page (default: 5, max: 100)
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationQuery {
    /// Get clamped page_size (respects MAX_PAGE_SIZE)
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Pagination metadata for response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Page actually served (after clamping)
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    /// Resolve the page to serve for `total_items` rows.
    ///
    /// A page past the end is clamped to the last non-empty page, so deleting
    /// the final row of the last page never leaves the caller on an empty page.
    pub fn resolve(query: &PaginationQuery, total_items: i64) -> Self {
        let page_size = query.limit();
        let total_pages = (total_items + page_size - 1) / page_size;
        let page = query.page.max(1).min(total_pages.max(1));
        Self {
            page,
            page_size,
            total_items,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// Slice an in-memory list into the requested page
pub fn paginate<T>(items: Vec<T>, query: &PaginationQuery) -> (Vec<T>, PaginationMeta) {
    let meta = PaginationMeta::resolve(query, items.len() as i64);
    let page_items = items
        .into_iter()
        .skip(meta.offset() as usize)
        .take(meta.page_size as usize)
        .collect();
    (page_items, meta)
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            errors: None,
        }
    }

    pub fn error(message: Option<String>, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            meta: None,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: i64, page_size: i64) -> PaginationQuery {
        PaginationQuery { page, page_size }
    }

    #[test]
    fn test_paginate_middle_page() {
        let (items, meta) = paginate((1..=12).collect::<Vec<_>>(), &query(2, 5));
        assert_eq!(items, vec![6, 7, 8, 9, 10]);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.page, 2);
    }

    #[test]
    fn test_paginate_clamps_past_last_page() {
        // 10 items after a deletion; the caller was on page 3
        let (items, meta) = paginate((1..=10).collect::<Vec<_>>(), &query(3, 5));
        assert_eq!(meta.page, 2);
        assert_eq!(items, vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_paginate_empty() {
        let (items, meta) = paginate(Vec::<i32>::new(), &query(4, 5));
        assert!(items.is_empty());
        assert_eq!(meta.page, 1);
        assert_eq!(meta.total_pages, 0);
    }

    #[test]
    fn test_resolve_offset() {
        let meta = PaginationMeta::resolve(&query(3, 5), 11);
        assert_eq!(meta.page, 3);
        assert_eq!(meta.offset(), 10);

        let clamped = PaginationMeta::resolve(&query(9, 5), 11);
        assert_eq!(clamped.page, 3);
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(query(1, 0).limit(), 1);
        assert_eq!(query(1, 500).limit(), MAX_PAGE_SIZE);
    }
}
