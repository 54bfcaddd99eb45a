//! Pagination utilities for SonarCloud API responses.

use serde::{Deserialize, Serialize};

/// A page of results from the SonarCloud API.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages (if known).
    pub total: Option<u64>,
    /// Current page number (1-indexed).
    pub page: u32,
    /// Number of items per page.
    pub count: u32,
    /// Whether there are more pages.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Create a new page from items and pagination info.
    ///
    /// With a known total, more pages exist while `page * count < total`.
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, count: u32, total: Option<u64>) -> Self {
        let has_more = match total {
            Some(t) => (u64::from(page) * u64::from(count)) < t,
            None => items.len() >= count as usize,
        };
        Self {
            items,
            total,
            page,
            count,
            has_more,
        }
    }

    /// Returns true if this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// The `paging` envelope returned by SonarQube search endpoints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    /// Current page (1-indexed).
    #[serde(default)]
    pub page_index: u32,
    /// Requested page size.
    #[serde(default)]
    pub page_size: u32,
    /// Total number of matching elements.
    pub total: u64,
}

/// Query parameters for paginated requests (`p` and `ps` in the Web API).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-indexed).
    #[serde(rename = "p")]
    pub page: u32,
    /// Number of items per page.
    #[serde(rename = "ps")]
    pub count: u32,
}

impl PaginationParams {
    /// Create pagination params for a specific page.
    #[must_use]
    pub fn for_page(page: u32, count: u32) -> Self {
        Self { page, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_has_more_with_total() {
        // Page 1 of 3 (total 1200, 500 per page)
        let page: Page<i32> = Page::new(vec![1; 500], 1, 500, Some(1200));
        assert!(page.has_more);

        // Page 3 of 3
        let page: Page<i32> = Page::new(vec![1; 200], 3, 500, Some(1200));
        assert!(!page.has_more);

        // Exactly filled last page
        let page: Page<i32> = Page::new(vec![1; 500], 2, 500, Some(1000));
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_has_more_without_total() {
        // Full page suggests more
        let page: Page<i32> = Page::new(vec![1; 100], 1, 100, None);
        assert!(page.has_more);

        // Partial page means no more
        let page: Page<i32> = Page::new(vec![1; 50], 1, 100, None);
        assert!(!page.has_more);
    }

    #[test]
    fn test_paging_envelope() {
        let paging: Paging =
            serde_json::from_str(r#"{"pageIndex":2,"pageSize":500,"total":1234}"#).unwrap();
        assert_eq!(paging.page_index, 2);
        assert_eq!(paging.total, 1234);
    }

    #[test]
    fn test_pagination_params_wire_names() {
        let json = serde_json::to_value(PaginationParams::for_page(3, 500)).unwrap();
        assert_eq!(json, serde_json::json!({"p": 3, "ps": 500}));
    }
}
