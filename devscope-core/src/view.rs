//! Paginated, filterable view over a record snapshot
//!
//! [`LogView`] owns one immutable snapshot together with the current
//! [`FilterCriteria`] and page number. Every read re-derives the filtered set
//! from scratch; nothing is cached between calls.
//!
//! Navigation rules:
//! - any change to the criteria resets the current page to 1;
//! - `go_to_page` outside `1..=total_pages` is a no-op and reports `false`.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::filter::{filter, FilterCriteria};
use crate::paginate::{clamp_page, paginate, total_pages, Page, DEFAULT_PAGE_SIZE};
use crate::records::LogRecord;

/// Filter state plus page cursor over a shared record snapshot
#[derive(Debug, Clone)]
pub struct LogView<R> {
    records: Arc<[R]>,
    criteria: FilterCriteria,
    current_page: usize,
    page_size: usize,
}

impl<R: LogRecord> LogView<R> {
    /// Create a view with the default page size of 10
    pub fn new(records: impl Into<Arc<[R]>>) -> Self {
        Self::with_page_size(records, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(records: impl Into<Arc<[R]>>, page_size: usize) -> Self {
        Self {
            records: records.into(),
            criteria: FilterCriteria::default(),
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    /// The unfiltered snapshot
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.criteria.search_term = term.into();
        self.reset_page();
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) {
        self.criteria.start_date = date;
        self.reset_page();
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) {
        self.criteria.end_date = date;
        self.reset_page();
    }

    /// Restrict to one calendar day, or lift the restriction with `None`
    pub fn set_single_day(&mut self, date: Option<NaiveDate>) {
        self.criteria.start_date = date;
        self.criteria.end_date = date;
        self.reset_page();
    }

    /// Replace all criteria at once
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.reset_page();
    }

    pub fn clear_filters(&mut self) {
        self.set_criteria(FilterCriteria::default());
    }

    /// Records matching the current criteria, in snapshot order
    pub fn matching(&self) -> Vec<&R> {
        filter(&self.records, &self.criteria)
    }

    pub fn total_matching(&self) -> usize {
        self.matching().len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_matching(), self.page_size)
    }

    /// The current page of matching records
    pub fn page(&self) -> Page<&R> {
        let matching = self.matching();
        let page = paginate(&matching, self.current_page, self.page_size);
        Page {
            items: page.items.into_iter().copied().collect(),
            page_number: page.page_number,
            page_size: page.page_size,
            total_count: page.total_count,
            total_pages: page.total_pages,
        }
    }

    /// Move to `page`; out-of-range requests leave the cursor untouched
    pub fn go_to_page(&mut self, page: usize) -> bool {
        let total = self.total_pages();
        if page < 1 || page > total {
            debug!(
                "Ignoring navigation to page {} (valid range 1..={})",
                page, total
            );
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    /// Page number that [`page`](Self::page) will actually serve
    pub fn effective_page(&self) -> usize {
        clamp_page(self.current_page, self.total_pages())
    }

    fn reset_page(&mut self) {
        self.current_page = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CallLogRecord;

    fn records(n: usize) -> Vec<CallLogRecord> {
        (0..n)
            .map(|i| CallLogRecord {
                id: i.to_string(),
                phone_number: format!("+1 202 {:03}", i),
                timestamp: format!("2024-03-{:02} 12:00:00", (i % 28) + 1),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_default_page_size() {
        let view = LogView::new(records(3));
        assert_eq!(view.page_size(), 10);
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn test_navigation_bounds() {
        let mut view = LogView::new(records(25));
        assert_eq!(view.total_pages(), 3);

        assert!(view.go_to_page(3));
        assert_eq!(view.page().items.len(), 5);

        assert!(!view.go_to_page(4));
        assert_eq!(view.current_page(), 3);

        assert!(!view.go_to_page(0));
        assert_eq!(view.current_page(), 3);

        assert!(!view.next_page());
        assert!(view.previous_page());
        assert_eq!(view.current_page(), 2);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut view = LogView::new(records(25));
        view.go_to_page(2);

        view.set_search_term("202");
        assert_eq!(view.current_page(), 1);

        view.go_to_page(2);
        view.set_start_date(NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(view.current_page(), 1);

        view.go_to_page(2);
        view.clear_filters();
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn test_snapshot_untouched_by_filtering() {
        let source = records(12);
        let mut view = LogView::new(source.clone());
        view.set_search_term("005");
        assert_eq!(view.total_matching(), 1);
        assert_eq!(view.records(), source.as_slice());
    }

    #[test]
    fn test_empty_view() {
        let view: LogView<CallLogRecord> = LogView::new(Vec::new());
        let page = view.page();
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
        assert_eq!(view.effective_page(), 1);
    }
}
