use serde::Serialize;

use crate::config::{self, ApiConfig};

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    /// Clamp client-supplied values against the configured page sizes.
    pub fn resolve(page: Option<i64>, limit: Option<i64>) -> Self {
        Self::resolve_with(page, limit, &config::config().api)
    }

    pub fn resolve_with(page: Option<i64>, limit: Option<i64>, api: &ApiConfig) -> Self {
        let limit = limit.unwrap_or(api.default_page_size).clamp(1, api.max_page_size);
        // Highest page whose offset still fits in an i64
        let page = page.unwrap_or(1).clamp(1, i64::MAX / limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + page.limit - 1) / page.limit };
        Self {
            items,
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> ApiConfig {
        ApiConfig {
            default_page_size: 20,
            max_page_size: 100,
            enable_request_logging: false,
            max_request_size_bytes: 1024,
        }
    }

    #[test]
    fn defaults_and_clamps() {
        assert_eq!(Page::resolve_with(None, None, &api()), Page { page: 1, limit: 20 });
        assert_eq!(Page::resolve_with(Some(0), Some(1000), &api()), Page { page: 1, limit: 100 });
        assert_eq!(Page::resolve_with(Some(-3), Some(0), &api()), Page { page: 1, limit: 1 });
    }

    #[test]
    fn offset_follows_page() {
        let page = Page::resolve_with(Some(3), Some(25), &api());
        assert_eq!(page.offset(), 50);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let page = Page::resolve_with(Some(i64::MAX), Some(100), &api());
        assert_eq!(page.page, i64::MAX / 100);
        assert!(page.offset() >= 0);
        assert!(page.offset() <= i64::MAX - 100);

        let page = Page::resolve_with(Some(i64::MAX), Some(1), &api());
        assert_eq!(page.offset(), i64::MAX - 1);
    }

    #[test]
    fn counts_pages() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(Paginated::new(vec![1, 2, 3], page, 21).total_pages, 3);
        assert_eq!(Paginated::<i32>::new(vec![], page, 0).total_pages, 0);
        assert_eq!(Paginated::new(vec![1], page, 10).total_pages, 1);
    }
}
