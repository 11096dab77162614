//! Paging parameters and paged responses.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64`.
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// `page` / `page_size` query parameters.
///
/// Out-of-range values are normalized instead of rejected: page is clamped
/// so its offset cannot overflow and page size is clamped to `1..=100`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.clamp(1, MAX_PAGE)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, params: PageParams, total_count: i64) -> Self {
        Self {
            items,
            page: params.page(),
            page_size: params.page_size(),
            total_count,
        }
    }
}
