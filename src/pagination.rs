use serde::{Deserialize, Serialize};

use crate::constants::system::DEFAULT_PAGE_SIZE;

/// Page number and size requested by a list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Create pagination with page number (1-indexed) and per-page count.
    /// A zero page size is treated as one.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// First page with the given size
    pub fn first(per_page: u32) -> Self {
        Self::new(1, per_page)
    }

    /// Calculate total pages given a total count. An empty list still has one page.
    pub fn total_pages(&self, total_count: usize) -> u32 {
        let per_page = self.per_page as usize;
        let pages = total_count.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Requested page clamped into `1..=total_pages`
    pub fn current_page(&self, total_count: usize) -> u32 {
        self.page.min(self.total_pages(total_count))
    }

    pub fn offset(&self, total_count: usize) -> usize {
        (self.current_page(total_count) as usize - 1) * self.per_page as usize
    }

    /// Check if there's a next page
    pub fn has_next_page(&self, total_count: usize) -> bool {
        self.current_page(total_count) < self.total_pages(total_count)
    }

    /// Check if there's a previous page
    pub fn has_previous_page(&self, total_count: usize) -> bool {
        self.current_page(total_count) > 1
    }

    /// Slice one page out of an already ordered list
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total_count = items.len();
        let offset = self.offset(total_count);

        Page {
            page: self.current_page(total_count),
            per_page: self.per_page,
            total_count,
            total_pages: self.total_pages(total_count),
            has_next: self.has_next_page(total_count),
            has_previous: self.has_previous_page(total_count),
            items: items
                .into_iter()
                .skip(offset)
                .take(self.per_page as usize)
                .collect(),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// One page of an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_count: usize,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
