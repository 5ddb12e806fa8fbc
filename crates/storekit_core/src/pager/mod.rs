//! Page cursor arithmetic and page walking.
//!
//! # Invariants
//! - `page >= 1` and `page_size >= 1` after construction.
//! - `offset == (page - 1) * page_size`.
//! - Advancing requires the total item count to be known.

mod options;
mod walk;

pub use options::{PagerOptions, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
pub use walk::walk;

use crate::error::{RepoError, RepoResult, Tag};
use crate::repo::Query;
use once_cell::sync::Lazy;

static LAST_PAGE_TAG: Lazy<Tag> = Lazy::new(|| Tag::new("last_page"));

/// Tag carried by the error [`Pager::advance`] returns on the last page.
pub fn last_page_tag() -> &'static Tag {
    &LAST_PAGE_TAG
}

/// Outcome of trying to move to the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    /// The cursor moved forward by one page.
    MorePages,
    /// The current page is the last one; the cursor did not move.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    page: i32,
    page_size: i32,
    total_items: Option<i32>,
}

impl Pager {
    /// Builds a pager, clamping the page to at least 1 and the page size to
    /// the range allowed by `options`.
    pub fn new(page: i32, options: &PagerOptions) -> Self {
        let mut page_size = options.page_size;
        if page_size < 1 {
            page_size = DEFAULT_PAGE_SIZE;
        }
        if page_size > options.max_page_size {
            page_size = options.max_page_size;
        }
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            total_items: None,
        }
    }

    pub fn with_page_size(page: i32, page_size: i32) -> Self {
        Self::new(page, &PagerOptions::default().with_page_size(page_size))
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn page(&self) -> i32 {
        self.page
    }

    pub fn page_size(&self) -> i32 {
        self.page_size
    }

    /// Zero while the total is unknown or below 1.
    pub fn total_pages(&self) -> i64 {
        match self.total_items {
            Some(total) if total >= 1 => {
                let total = i64::from(total);
                let size = i64::from(self.page_size);
                (total + size - 1) / size
            }
            _ => 0,
        }
    }

    pub fn total_items(&self) -> i32 {
        self.total_items.unwrap_or(0)
    }

    pub fn set_total_items(&mut self, total: i32) {
        self.total_items = Some(total);
    }

    /// Moves to the next page unless the current one is the last.
    ///
    /// # Errors
    /// - `Internal` when the total item count was never set.
    pub fn next_page(&mut self) -> RepoResult<PageStep> {
        let total = self
            .total_items
            .ok_or_else(|| RepoError::internal("total items must be set"))?;
        if i64::from(self.page) * i64::from(self.page_size) >= i64::from(total) {
            return Ok(PageStep::Done);
        }
        self.page += 1;
        Ok(PageStep::MorePages)
    }

    /// Like [`Pager::next_page`], but reports the last page as an `Internal`
    /// error tagged with [`last_page_tag`].
    pub fn advance(&mut self) -> RepoResult<()> {
        match self.next_page()? {
            PageStep::MorePages => Ok(()),
            PageStep::Done => Err(RepoError::internal(format!("last page is {}", self.page))
                .with_tag(last_page_tag())),
        }
    }

    /// Restricts `query` to the rows of the current page.
    pub fn apply(&self, query: Query) -> Query {
        query.offset(self.offset()).limit(self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::{Pager, PagerOptions};

    #[test]
    fn new_clamps_page_and_page_size() {
        let pager = Pager::new(0, &PagerOptions::default().with_page_size(5000));
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.page_size(), 1000);

        let pager = Pager::with_page_size(-3, 0);
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.page_size(), 100);
    }
}
