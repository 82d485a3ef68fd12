//! Fixed-size pagination over filtered records
//!
//! Page numbers are 1-based. [`paginate`] clamps any requested page into
//! `1..=total_pages`, so slicing never fails; an empty input yields page 1 with
//! no items and zero total pages.

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A contiguous slice of the filtered result set
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows on this page, in filtered order
    pub items: Vec<T>,

    /// 1-based page number actually served (after clamping)
    pub page_number: usize,

    pub page_size: usize,

    /// Number of matching records across all pages
    pub total_count: usize,

    pub total_pages: usize,
}

impl<T> Page<T> {
    /// 1-based index of the first row on this page, 0 when empty
    pub fn first_row(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page_number - 1) * self.page_size + 1
        }
    }

    /// 1-based index of the last row on this page, 0 when empty
    pub fn last_row(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.first_row() + self.items.len() - 1
        }
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Number of pages needed for `count` rows: `ceil(count / page_size)`
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count / page_size + usize::from(count % page_size != 0)
}

/// Clamp a requested page into `1..=total_pages` (or 1 when there are none)
pub fn clamp_page(page_number: usize, total_pages: usize) -> usize {
    page_number.clamp(1, total_pages.max(1))
}

/// Slice `items` into the requested page
///
/// A zero `page_size` is treated as 1.
///
/// # Example
///
/// ```rust
/// use devscope_core::paginate::paginate;
///
/// let rows: Vec<u32> = (1..=25).collect();
/// let page = paginate(&rows, 3, 10);
/// assert_eq!(page.items, vec![&21, &22, &23, &24, &25]);
/// assert_eq!(page.total_pages, 3);
///
/// // Out of range requests are clamped
/// assert_eq!(paginate(&rows, 99, 10).page_number, 3);
/// assert_eq!(paginate(&rows, 0, 10).page_number, 1);
/// ```
pub fn paginate<T>(items: &[T], page_number: usize, page_size: usize) -> Page<&T> {
    let page_size = page_size.max(1);
    let total_count = items.len();
    let total_pages = total_pages(total_count, page_size);
    let page_number = clamp_page(page_number, total_pages);

    let start = (page_number - 1) * page_size;
    let end = start.saturating_add(page_size).min(total_count);
    let items = if start < total_count {
        items[start..end].iter().collect()
    } else {
        Vec::new()
    };

    Page {
        items,
        page_number,
        page_size,
        total_count,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(5, 0), 5);
        assert_eq!(total_pages(3, usize::MAX), 1);
        assert_eq!(total_pages(usize::MAX, usize::MAX), 1);
    }

    #[test]
    fn test_huge_page_size() {
        let rows = [1, 2, 3];
        let page = paginate(&rows, 1, usize::MAX);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.items, vec![&1, &2, &3]);
        assert!(!page.has_next());
    }

    #[test]
    fn test_empty_input() {
        let rows: Vec<u8> = Vec::new();
        let page = paginate(&rows, 1, 10);
        assert!(page.is_empty());
        assert_eq!(page.page_number, 1);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.first_row(), 0);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn test_row_indices() {
        let rows: Vec<u8> = (0..12).collect();
        let page = paginate(&rows, 2, 10);
        assert_eq!(page.first_row(), 11);
        assert_eq!(page.last_row(), 12);
        assert!(page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 3), 1);
        assert_eq!(clamp_page(2, 3), 2);
        assert_eq!(clamp_page(7, 3), 3);
        assert_eq!(clamp_page(5, 0), 1);
    }
}
