//! Offset pagination shared by the store and the api layer

use inv_common::{Error, Result};

/// Default page size when the caller does not supply one.
pub const DEFAULT_PER_PAGE: usize = 20;

/// Upper bound on the page size.
pub const MAX_PER_PAGE: usize = 500;

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number, starting at 1
    pub page: usize,
    /// Items per page
    pub per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Validate page bounds.
    pub fn new(page: usize, per_page: usize) -> Result<Pagination> {
        if page < 1 {
            return Err(Error::invalid("page must be at least 1"));
        }
        if per_page < 1 || per_page > MAX_PER_PAGE {
            return Err(Error::invalid(format!(
                "per_page must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }
        Ok(Pagination { page, per_page })
    }

    /// Items skipped before this page.
    pub fn skip(&self) -> usize {
        (self.page - 1) * self.per_page
    }

    /// The window of `items` this page covers.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.skip().min(items.len());
        let end = (start + self.per_page).min(items.len());
        &items[start..end]
    }

    /// True when a following page would be non-empty.
    pub fn has_next(&self, total: usize) -> bool {
        total > self.page * self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(Pagination::new(0, 10).is_err());
        assert!(Pagination::new(1, 0).is_err());
        assert!(Pagination::new(1, MAX_PER_PAGE + 1).is_err());
        assert!(Pagination::new(1, MAX_PER_PAGE).is_ok());
    }

    #[test]
    fn test_slicing() {
        let items: Vec<u32> = (0..45).collect();
        let p = Pagination::new(3, 20).unwrap();
        assert_eq!(p.slice(&items), &items[40..45]);
        assert!(!p.has_next(45));

        let p = Pagination::new(2, 20).unwrap();
        assert_eq!(p.slice(&items).len(), 20);
        assert!(p.has_next(45));

        // page entirely past the end is empty, not a panic
        let p = Pagination::new(9, 20).unwrap();
        assert!(p.slice(&items).is_empty());
    }
}
