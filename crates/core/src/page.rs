//! Pagination primitives for list queries.

use serde::{Deserialize, Serialize};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page index (0-based).
    pub page: usize,
    /// Maximum number of items per page.
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    /// A single page containing every match (reports, internal scans).
    pub fn unbounded() -> Self {
        Self {
            page: 0,
            size: usize::MAX,
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of an ordered result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    /// Total number of matches across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    /// Slice an already-ordered result set into the requested page.
    pub fn from_ordered(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size)
    }

    pub fn has_more(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_requested_window() {
        let page = Page::from_ordered((1..=7).collect::<Vec<_>>(), PageRequest::new(1, 3));
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_more());
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = Page::from_ordered(vec![1, 2], PageRequest::new(5, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
        assert!(!page.has_more());
    }

    #[test]
    fn unbounded_request_returns_everything() {
        let page = Page::from_ordered(vec!['a', 'b', 'c'], PageRequest::unbounded());
        assert_eq!(page.items.len(), 3);
    }
}
