//! Page-based pagination.

use serde::Serialize;
use thiserror::Error;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: i64 = 25;

/// Maximum number of items per page.
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("page_size must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidPageSize,
}

/// A validated page request (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: i64,
    page_size: i64,
}

impl Page {
    /// Validates raw request values; absent values take the defaults.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(PaginationError::InvalidPage);
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(PaginationError::InvalidPageSize);
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination info returned with list responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PageInfo {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(page: &Page, total: i64) -> Self {
        let total_pages = (total + page.limit() - 1) / page.limit();
        Self {
            page: page.page(),
            page_size: page.limit(),
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = Page::new(None, None).unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), 25);
        assert_eq!(page.offset(), 0);
        assert_eq!(page, Page::default());
    }

    #[test]
    fn test_offset() {
        let page = Page::new(Some(3), Some(10)).unwrap();
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(Page::new(Some(0), None), Err(PaginationError::InvalidPage));
        assert_eq!(Page::new(None, Some(0)), Err(PaginationError::InvalidPageSize));
        assert_eq!(Page::new(None, Some(101)), Err(PaginationError::InvalidPageSize));
        assert!(Page::new(None, Some(100)).is_ok());
    }

    #[test]
    fn test_page_info() {
        let page = Page::new(Some(2), Some(25)).unwrap();
        let info = PageInfo::new(&page, 75);
        assert_eq!(info.total_pages, 3);
        assert_eq!(PageInfo::new(&page, 0).total_pages, 0);
    }
}
