//! Offset-based pagination utilities.

use serde::Serialize;

/// Page used when the client does not ask for one.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Upper bound for a single page.
pub const MAX_PER_PAGE: u32 = 100;

/// Normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Builds a page request from optional query values.
    ///
    /// Page numbers are 1-indexed; zero is treated as the first page.
    /// Page size is clamped to `1..=MAX_PER_PAGE`.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    /// Row limit for the page.
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// Builds the pagination block of a list response.
    pub fn info(&self, total: i64) -> PaginationInfo {
        PaginationInfo {
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages: total_pages(total, self.per_page),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination information returned alongside list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

/// Number of pages needed to hold `total` rows.
pub fn total_pages(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 0;
    }
    let per_page = per_page as i64;
    ((total + per_page - 1) / per_page) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 50);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let page = PageRequest::new(Some(0), Some(10));
        assert_eq!(page.page, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_per_page_is_clamped() {
        assert_eq!(PageRequest::new(None, Some(0)).per_page, 1);
        assert_eq!(PageRequest::new(None, Some(500)).per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_offset() {
        let page = PageRequest::new(Some(3), Some(20));
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(-5, 10), 0);
    }

    #[test]
    fn test_info_serialization() {
        let info = PageRequest::new(Some(2), Some(25)).info(60);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["perPage"], 25);
        assert_eq!(json["total"], 60);
        assert_eq!(json["totalPages"], 3);
    }
}
