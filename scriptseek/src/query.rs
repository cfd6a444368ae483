//! Query state and its two-way binding to the address bar.

use std::sync::Arc;

use crate::cache::Pagination;
use crate::router::{NavigateOptions, Router};
use crate::types::{QueryState, ResultPage, SearchMode};

pub const PARAM_QUERY: &str = "q";
pub const PARAM_MODE: &str = "type";
pub const PARAM_PAGE: &str = "page";

/// Owns the `{text, mode, page}` triple for a mounted search view.
///
/// Setters write the URL; [`QueryStore::sync_from_location`] reads it back
/// after an external navigation.
pub struct QueryStore {
    router: Arc<dyn Router>,
    state: QueryState,
    /// Known only after a page for the current text and mode has arrived.
    total_count: Option<u64>,
}

impl QueryStore {
    /// Creates the store from whatever the URL currently says.
    pub fn from_location(router: Arc<dyn Router>) -> Self {
        let state = read_location(router.as_ref());
        Self {
            router,
            state,
            total_count: None,
        }
    }

    pub fn current(&self) -> &QueryState {
        &self.state
    }

    /// New query text, back on page 1. Returns whether the triple changed.
    pub fn set_query(&mut self, text: impl Into<String>) -> bool {
        let next = QueryState::new(text, self.state.mode);
        self.commit(next)
    }

    /// Switch mode, back on page 1. Returns whether the triple changed.
    pub fn set_mode(&mut self, mode: SearchMode) -> bool {
        let next = QueryState::new(self.state.text.clone(), mode);
        self.commit(next)
    }

    /// Move to page `n`. Rejected (returns false) when `n` falls outside the
    /// known page range; accepted speculatively while no total is known.
    pub fn set_page(&mut self, n: u32) -> bool {
        if n == 0 {
            return false;
        }
        if let Some(pagination) = self.pagination() {
            if !pagination.contains(n) {
                tracing::debug!(page = n, total = pagination.total_count, "page out of range");
                return false;
            }
        }
        let next = self.state.clone().with_page(n);
        self.commit(next)
    }

    /// Records the total of a page fetched for the current text and mode.
    pub fn record_total(&mut self, page: &ResultPage) {
        if page.query.text == self.state.text && page.query.mode == self.state.mode {
            self.total_count = Some(page.total_count);
        }
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.total_count.map(Pagination::new)
    }

    /// Applies an external URL change. Returns the new triple only when it
    /// differs from the last applied one.
    pub fn sync_from_location(&mut self) -> Option<QueryState> {
        let next = read_location(self.router.as_ref());
        if next == self.state {
            return None;
        }
        self.forget_total_if_new_query(&next);
        self.state = next.clone();
        Some(next)
    }

    fn commit(&mut self, next: QueryState) -> bool {
        if next == self.state {
            return false;
        }
        self.forget_total_if_new_query(&next);
        self.state = next;
        self.write_location();
        true
    }

    fn forget_total_if_new_query(&mut self, next: &QueryState) {
        if next.text != self.state.text || next.mode != self.state.mode {
            self.total_count = None;
        }
    }

    fn write_location(&self) {
        let mode = self.state.mode.to_string();
        let page = self.state.page().to_string();
        self.router.set_params(
            &[
                (PARAM_QUERY, self.state.text.as_str()),
                (PARAM_MODE, mode.as_str()),
                (PARAM_PAGE, page.as_str()),
            ],
            NavigateOptions::PUSH,
        );
    }
}

/// Parses the triple out of the URL. Missing or malformed `type` and `page`
/// fall back to script mode and page 1.
pub fn read_location(router: &dyn Router) -> QueryState {
    let text = router.get_param(PARAM_QUERY).unwrap_or_default();
    let mode = router
        .get_param(PARAM_MODE)
        .and_then(|raw| raw.parse::<SearchMode>().ok())
        .unwrap_or_default();
    let page = router
        .get_param(PARAM_PAGE)
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1);
    QueryState::new(text, mode).with_page(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MemoryRouter;

    fn store_at(location: &str) -> (Arc<MemoryRouter>, QueryStore) {
        let router = Arc::new(MemoryRouter::new(location).unwrap());
        let store = QueryStore::from_location(router.clone());
        (router, store)
    }

    fn page_with_total(store: &QueryStore, total: u64) -> ResultPage {
        ResultPage {
            items: vec![],
            total_count: total,
            query: store.current().clone(),
        }
    }

    #[test]
    fn mount_reads_the_url() {
        let (_, store) = store_at("/search?q=hello&type=video&page=3");
        assert_eq!(
            store.current(),
            &QueryState::new("hello", SearchMode::Video).with_page(3)
        );
    }

    #[test]
    fn malformed_params_fall_back_to_defaults() {
        let (_, store) = store_at("/search?q=hi&type=podcast&page=-2");
        assert_eq!(store.current(), &QueryState::new("hi", SearchMode::Script));

        let (_, store) = store_at("/search?page=0");
        assert_eq!(store.current().page(), 1);
    }

    #[test]
    fn set_query_and_set_mode_reset_page() {
        let (_, mut store) = store_at("/search?q=hello&page=4");

        assert!(store.set_query("hello"));
        assert_eq!(store.current().page(), 1);

        assert!(store.set_page(5));
        assert!(store.set_mode(SearchMode::Video));
        assert_eq!(store.current().page(), 1);

        assert!(store.set_page(2));
        assert!(store.set_query("other words"));
        assert_eq!(store.current().page(), 1);
    }

    #[test]
    fn setters_write_the_url_with_one_history_entry() {
        let (router, mut store) = store_at("/search");
        store.set_query("hello world");

        assert_eq!(router.history_len(), 2);
        assert_eq!(router.get_param("q").as_deref(), Some("hello world"));
        assert_eq!(router.get_param("type").as_deref(), Some("script"));
        assert_eq!(router.get_param("page").as_deref(), Some("1"));
    }

    #[test]
    fn unchanged_setter_does_not_touch_history() {
        let (router, mut store) = store_at("/search?q=a&type=script&page=1");
        assert!(!store.set_query("a"));
        assert!(!store.set_mode(SearchMode::Script));
        assert!(!store.set_page(1));
        assert_eq!(router.history_len(), 1);
    }

    #[test]
    fn set_page_is_bounded_once_total_is_known() {
        let (_, mut store) = store_at("/search?q=a");
        assert!(store.set_page(40), "speculative before any total");
        assert!(store.set_page(1));

        let page = page_with_total(&store, 27);
        store.record_total(&page);
        assert!(!store.set_page(4));
        assert!(!store.set_page(0));
        assert!(store.set_page(3));
        assert_eq!(store.current().page(), 3);
    }

    #[test]
    fn new_query_forgets_the_known_total() {
        let (_, mut store) = store_at("/search?q=a");
        let page = page_with_total(&store, 5);
        store.record_total(&page);
        assert!(!store.set_page(2));

        store.set_query("b");
        assert!(store.pagination().is_none());
        assert!(store.set_page(2));
    }

    #[test]
    fn record_total_ignores_pages_for_other_queries() {
        let (_, mut store) = store_at("/search?q=a");
        let other = ResultPage::empty(QueryState::new("b", SearchMode::Script));
        store.record_total(&other);
        assert!(store.pagination().is_none());
    }

    #[test]
    fn sync_from_location_reports_only_real_changes() {
        let (router, mut store) = store_at("/search?q=a");
        store.set_query("b");
        assert!(store.sync_from_location().is_none());

        router.back();
        let applied = store.sync_from_location().expect("triple changed");
        assert_eq!(applied.text, "a");
        assert_eq!(store.current().text, "a");
        assert!(store.sync_from_location().is_none());
    }
}
