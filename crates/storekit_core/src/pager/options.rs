use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: i32 = 100;
pub const DEFAULT_MAX_PAGE_SIZE: i32 = 1000;

/// Page-size policy used when building a [`Pager`](super::Pager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PagerOptions {
    pub page_size: i32,
    pub max_page_size: i32,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl PagerOptions {
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: i32) -> Self {
        self.max_page_size = max_page_size;
        self
    }
}
