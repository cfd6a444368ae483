//! Last fetched page per search mode, and the pagination bounds derived from it.

use crate::bookmark::{BookmarkTarget, FlagSlot};
use crate::types::{QueryState, ResultPage, SearchMode, PAGE_SIZE};

/// Page-count arithmetic for a known `total_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total_count: u64,
}

impl Pagination {
    pub fn new(total_count: u64) -> Self {
        Self { total_count }
    }

    /// `ceil(total_count / PAGE_SIZE)`.
    pub fn page_count(&self) -> u32 {
        let pages = self.total_count.div_ceil(u64::from(PAGE_SIZE));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Whether `page` is navigable. An empty result set still has page 1.
    pub fn contains(&self, page: u32) -> bool {
        page >= 1 && page <= self.page_count().max(1)
    }

    /// Controls are only rendered when there is somewhere else to go.
    pub fn shows_controls(&self) -> bool {
        self.page_count() > 1
    }

    /// Pages beyond the first one.
    pub fn extra_pages(&self) -> u32 {
        self.page_count().saturating_sub(1)
    }
}

/// Holds at most one page per mode. Navigating to another page replaces it.
#[derive(Debug, Default)]
pub struct ResultCache {
    script: Option<ResultPage>,
    video: Option<ResultPage>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the slot for the page's mode wholesale.
    pub fn store(&mut self, page: ResultPage) {
        let mode = page.query.mode;
        *self.slot_mut(mode) = Some(page);
    }

    /// The cached page for `mode` if it is page `page_number`.
    pub fn get_page(&self, mode: SearchMode, page_number: u32) -> Option<&ResultPage> {
        self.latest(mode)
            .filter(|page| page.query.page() == page_number)
    }

    /// The cached page for `mode`, whatever query produced it.
    pub fn latest(&self, mode: SearchMode) -> Option<&ResultPage> {
        match mode {
            SearchMode::Script => self.script.as_ref(),
            SearchMode::Video => self.video.as_ref(),
        }
    }

    /// The cached page fetched for exactly this snapshot.
    pub fn valid_for(&self, query: &QueryState) -> Option<&ResultPage> {
        self.latest(query.mode).filter(|page| &page.query == query)
    }

    pub fn clear(&mut self) {
        self.script = None;
        self.video = None;
    }

    fn slot_mut(&mut self, mode: SearchMode) -> &mut Option<ResultPage> {
        match mode {
            SearchMode::Script => &mut self.script,
            SearchMode::Video => &mut self.video,
        }
    }
}

impl BookmarkTarget for ResultCache {
    fn find_flags(&self, item_id: &str) -> Vec<(FlagSlot, bool)> {
        [SearchMode::Script, SearchMode::Video]
            .into_iter()
            .filter_map(|mode| self.latest(mode))
            .filter_map(|page| {
                page.items
                    .iter()
                    .find(|item| item.id == item_id)
                    .map(|item| (FlagSlot::ResultPage(page.query.clone()), item.bookmarked))
            })
            .collect()
    }

    fn write_flag(&mut self, item_id: &str, slot: &FlagSlot, value: bool) -> bool {
        let FlagSlot::ResultPage(query) = slot else {
            return false;
        };
        let Some(page) = self.slot_mut(query.mode).as_mut() else {
            return false;
        };
        if &page.query != query {
            return false;
        }

        let mut written = false;
        for item in page.items.iter_mut().filter(|item| item.id == item_id) {
            item.bookmarked = value;
            written = true;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResultDetail, SearchResult, VideoMeta};

    fn video(id: &str) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            title: format!("Video {id}"),
            thumbnail_url: String::new(),
            upload_date: "2024-05-01".to_string(),
            bookmarked: false,
            detail: ResultDetail::Video(VideoMeta {
                channel: "Channel".to_string(),
                view_count: 10,
                duration: "03:00".to_string(),
            }),
        }
    }

    fn page(text: &str, mode: SearchMode, page_number: u32, ids: &[&str]) -> ResultPage {
        ResultPage {
            items: ids.iter().map(|id| video(id)).collect(),
            total_count: 42,
            query: QueryState::new(text, mode).with_page(page_number),
        }
    }

    #[test]
    fn pagination_rounds_up() {
        let pagination = Pagination::new(27);
        assert_eq!(pagination.page_count(), 3);
        assert!(pagination.contains(3));
        assert!(!pagination.contains(4));
        assert!(!pagination.contains(0));
        assert_eq!(pagination.extra_pages(), 2);
    }

    #[test]
    fn pagination_hides_controls_for_a_single_page() {
        let pagination = Pagination::new(3);
        assert_eq!(pagination.page_count(), 1);
        assert!(!pagination.shows_controls());
        assert_eq!(pagination.extra_pages(), 0);

        let exact = Pagination::new(10);
        assert_eq!(exact.page_count(), 1);
        assert!(Pagination::new(11).shows_controls());
    }

    #[test]
    fn empty_result_set_still_allows_page_one() {
        let pagination = Pagination::new(0);
        assert_eq!(pagination.page_count(), 0);
        assert!(pagination.contains(1));
        assert!(!pagination.contains(2));
    }

    #[test]
    fn cache_keeps_one_page_per_mode() {
        let mut cache = ResultCache::new();
        cache.store(page("cats", SearchMode::Video, 1, &["a"]));
        cache.store(page("cats", SearchMode::Video, 2, &["b"]));
        cache.store(page("cats", SearchMode::Script, 1, &["c"]));

        assert!(cache.get_page(SearchMode::Video, 1).is_none());
        assert_eq!(cache.get_page(SearchMode::Video, 2).unwrap().items[0].id, "b");
        assert_eq!(cache.get_page(SearchMode::Script, 1).unwrap().items[0].id, "c");
    }

    #[test]
    fn valid_for_requires_the_exact_snapshot() {
        let mut cache = ResultCache::new();
        cache.store(page("cats", SearchMode::Video, 1, &["a"]));

        assert!(cache
            .valid_for(&QueryState::new("cats", SearchMode::Video))
            .is_some());
        assert!(cache
            .valid_for(&QueryState::new("dogs", SearchMode::Video))
            .is_none());
        assert!(cache
            .valid_for(&QueryState::new("cats", SearchMode::Video).with_page(2))
            .is_none());
    }

    #[test]
    fn write_flag_ignores_replaced_pages() {
        let mut cache = ResultCache::new();
        cache.store(page("cats", SearchMode::Video, 1, &["a"]));
        let slot = FlagSlot::ResultPage(QueryState::new("cats", SearchMode::Video));

        cache.store(page("dogs", SearchMode::Video, 1, &["a"]));
        assert!(!cache.write_flag("a", &slot, true));
        assert!(!cache.latest(SearchMode::Video).unwrap().items[0].bookmarked);
    }

    #[test]
    fn find_flags_looks_in_both_lists() {
        let mut cache = ResultCache::new();
        cache.store(page("cats", SearchMode::Video, 1, &["a", "b"]));
        cache.store(page("cats", SearchMode::Script, 1, &["a"]));

        assert_eq!(cache.find_flags("a").len(), 2);
        assert_eq!(cache.find_flags("b").len(), 1);
        assert!(cache.find_flags("zzz").is_empty());
    }
}
