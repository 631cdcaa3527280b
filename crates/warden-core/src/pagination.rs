//! Page-number pagination shared by the collaborator stores.

use serde::{Deserialize, Serialize};

/// Maximum number of items per page.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Page size used when the caller supplies none.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of records to return.
    pub limit: u64,
    /// Number of records to skip.
    pub offset: u64,
}

impl Pagination {
    /// Creates pagination from a 1-based page number and a page size.
    ///
    /// A page below 1 is treated as the first page and a non-positive page
    /// size falls back to [`DEFAULT_PAGE_SIZE`].
    pub fn from_page(page: i64, page_size: i64) -> Self {
        let page = page.max(1).unsigned_abs();
        let limit = if page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.unsigned_abs().min(MAX_PAGE_SIZE)
        };

        Self {
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    /// Gets the current page number (1-based).
    pub fn page_number(&self) -> u64 {
        (self.offset / self.limit) + 1
    }

    /// Applies the window to an iterator.
    pub fn apply<I: Iterator>(&self, items: I) -> impl Iterator<Item = I::Item> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.skip(offset).take(limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::from_page(1, 0)
    }
}

/// One page of results together with the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Returns `true` if this page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_page_normalizes_input() {
        assert_eq!(Pagination::from_page(0, 0), Pagination { limit: 10, offset: 0 });
        assert_eq!(Pagination::from_page(-3, -1), Pagination { limit: 10, offset: 0 });
        assert_eq!(Pagination::from_page(3, 25), Pagination { limit: 25, offset: 50 });
        assert_eq!(Pagination::from_page(1, 5000).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn page_number_round_trips() {
        assert_eq!(Pagination::from_page(4, 10).page_number(), 4);
        assert_eq!(Pagination::default().page_number(), 1);
    }

    #[test]
    fn apply_windows_items() {
        let items: Vec<_> = Pagination::from_page(2, 3).apply(1..=10).collect();
        assert_eq!(items, vec![4, 5, 6]);
    }
}
