//! Search orchestration: fetch-on-change with last-issued-wins.
//!
//! Every search is tagged with a monotonically increasing sequence number.
//! Only the ticket carrying the latest number may change visible state; a
//! response for any other ticket, success or failure, is discarded. The
//! displayed page and the pending status are kept apart, so a failed search
//! surfaces an error without hiding the last good page.

use crate::cache::ResultCache;
use crate::error::{Error, Result, TransportError};
use crate::transport::{ScriptSearchRequest, SearchTransport, VideoSearchRequest};
use crate::types::{
    QueryState, ResultPage, SearchMode, SearchResult, DEFAULT_MIN_CONFIDENCE, PAGE_SIZE,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    Success,
    Failed(Error),
}

/// Transport call derived from a query snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRequest {
    Script(ScriptSearchRequest),
    Video(VideoSearchRequest),
}

/// An issued search that still needs its network round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    seq: u64,
    query: QueryState,
    request: SearchRequest,
}

impl SearchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }
}

#[derive(Debug)]
pub enum Issued {
    /// Answered without the network (blank query).
    Ready(ResultPage),
    Pending(SearchTicket),
}

/// What [`SearchOrchestrator::apply`] did with a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Displayed,
    Failed(Error),
    /// The ticket was superseded; visible state is unchanged.
    Discarded,
}

/// The `{status, results, error}` view of the search page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchView<'a> {
    pub status: &'a SearchStatus,
    pub results: Option<&'a ResultPage>,
    pub error: Option<&'a Error>,
}

#[derive(Debug)]
pub struct SearchOrchestrator {
    cache: ResultCache,
    /// Mode whose cached page is the last good one on screen.
    displayed: Option<SearchMode>,
    status: SearchStatus,
    latest_seq: u64,
    min_confidence: f32,
}

impl Default for SearchOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl SearchOrchestrator {
    pub fn new(min_confidence: f32) -> Self {
        Self {
            cache: ResultCache::new(),
            displayed: None,
            status: SearchStatus::Idle,
            latest_seq: 0,
            min_confidence,
        }
    }

    /// Starts a search for `query`, superseding any search still in flight.
    ///
    /// A blank query is answered immediately with an empty page and no
    /// network call.
    pub fn issue(&mut self, query: &QueryState) -> Issued {
        self.latest_seq += 1;

        if query.is_blank() {
            tracing::debug!(seq = self.latest_seq, "blank query, nothing to search");
            self.displayed = None;
            self.status = SearchStatus::Idle;
            return Issued::Ready(ResultPage::empty(query.clone()));
        }

        let request = match query.mode {
            SearchMode::Script => SearchRequest::Script(ScriptSearchRequest {
                query: query.text.clone(),
                limit: PAGE_SIZE,
                min_confidence: self.min_confidence,
                page: query.page(),
            }),
            SearchMode::Video => SearchRequest::Video(VideoSearchRequest {
                query: query.text.clone(),
                limit: PAGE_SIZE,
                page: query.page(),
            }),
        };

        tracing::debug!(
            seq = self.latest_seq,
            query = %query.text,
            mode = %query.mode,
            page = query.page(),
            "search issued"
        );
        self.status = SearchStatus::Searching;
        Issued::Pending(SearchTicket {
            seq: self.latest_seq,
            query: query.clone(),
            request,
        })
    }

    /// Applies the outcome of a ticket's round trip.
    pub fn apply(
        &mut self,
        ticket: SearchTicket,
        outcome: std::result::Result<ResultPage, TransportError>,
    ) -> Applied {
        if ticket.seq != self.latest_seq {
            tracing::debug!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "{}",
                Error::StaleResponseDiscarded
            );
            return Applied::Discarded;
        }

        match outcome {
            Ok(page) => {
                self.displayed = Some(page.query.mode);
                self.cache.store(page);
                self.status = SearchStatus::Success;
                Applied::Displayed
            }
            Err(e) => {
                tracing::warn!(query = %ticket.query.text, error = %e, "search failed");
                let error = Error::TransportFailure(e);
                self.status = SearchStatus::Failed(error.clone());
                Applied::Failed(error)
            }
        }
    }

    /// Displays the cached page for exactly `query`, if there is one.
    /// Supersedes any search in flight when it does.
    pub fn show_cached(&mut self, query: &QueryState) -> bool {
        if self.cache.valid_for(query).is_none() {
            return false;
        }
        self.latest_seq += 1;
        tracing::debug!(query = %query.text, mode = %query.mode, "showing cached page");
        self.displayed = Some(query.mode);
        self.status = SearchStatus::Success;
        true
    }

    /// Issue, fetch and apply in one go.
    pub async fn run_search(
        &mut self,
        transport: &dyn SearchTransport,
        query: &QueryState,
    ) -> Result<ResultPage> {
        let ticket = match self.issue(query) {
            Issued::Ready(page) => return Ok(page),
            Issued::Pending(ticket) => ticket,
        };

        let outcome = fetch(transport, &ticket).await;
        match self.apply(ticket, outcome) {
            Applied::Displayed => self
                .displayed_page()
                .cloned()
                .ok_or(Error::StaleResponseDiscarded),
            Applied::Failed(e) => Err(e),
            Applied::Discarded => Err(Error::StaleResponseDiscarded),
        }
    }

    /// Clears a failure. Back to `Success` when a page is on screen.
    pub fn dismiss_error(&mut self) {
        if matches!(self.status, SearchStatus::Failed(_)) {
            self.status = if self.displayed_page().is_some() {
                SearchStatus::Success
            } else {
                SearchStatus::Idle
            };
        }
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    pub fn is_searching(&self) -> bool {
        self.status == SearchStatus::Searching
    }

    pub fn displayed_page(&self) -> Option<&ResultPage> {
        self.displayed.and_then(|mode| self.cache.latest(mode))
    }

    pub fn view(&self) -> SearchView<'_> {
        SearchView {
            status: &self.status,
            results: self.displayed_page(),
            error: match &self.status {
                SearchStatus::Failed(e) => Some(e),
                _ => None,
            },
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Mutable access for in-place bookmark flips.
    pub fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }
}

/// Performs the network round trip for `ticket`.
pub async fn fetch(
    transport: &dyn SearchTransport,
    ticket: &SearchTicket,
) -> std::result::Result<ResultPage, TransportError> {
    let (items, total) = match &ticket.request {
        SearchRequest::Script(request) => {
            let response = transport.search_scripts(request).await?;
            tracing::debug!(
                seq = ticket.seq,
                processing_time = response.processing_time_seconds,
                "script search answered"
            );
            (response.results, response.total)
        }
        SearchRequest::Video(request) => {
            let response = transport.search_videos(request).await?;
            (response.results, response.total)
        }
    };

    Ok(ResultPage {
        total_count: effective_total(total, &items),
        items,
        query: ticket.query.clone(),
    })
}

/// A missing or zero total with results present falls back to the item count.
fn effective_total(total: Option<u64>, items: &[SearchResult]) -> u64 {
    match total {
        Some(total) if total > 0 || items.is_empty() => total,
        _ => items.len() as u64,
    }
}
