use crate::bookmark::{BookmarkToggler, UndoToken};
use crate::cache::Pagination;
use crate::context::AppContext;
use crate::error::{Error, Result, TransportError};
use crate::orchestrator::{fetch, Applied, Issued, SearchOrchestrator, SearchTicket, SearchView};
use crate::query::QueryStore;
use crate::types::{QueryState, ResultPage, SearchMode};

use super::LOGIN_PATH;

/// The search-results view.
///
/// Handlers are synchronous and return the [`SearchTicket`] that still needs
/// a network round trip, if any. The caller fetches it (inline with
/// [`SearchPage::run`], or on a task through the runtime) and hands the
/// outcome back to [`SearchPage::apply_search`].
pub struct SearchPage {
    ctx: AppContext,
    query: QueryStore,
    orchestrator: SearchOrchestrator,
    toggler: BookmarkToggler,
}

impl SearchPage {
    pub fn new(ctx: AppContext) -> Self {
        let query = QueryStore::from_location(ctx.router.clone());
        let orchestrator = SearchOrchestrator::new(ctx.min_confidence);
        let toggler = BookmarkToggler::new(ctx.auth.clone(), ctx.bookmarks.clone());
        Self {
            ctx,
            query,
            orchestrator,
            toggler,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Initial fetch for whatever the URL says. Never scrolls.
    pub fn mount(&mut self) -> Option<SearchTicket> {
        if self.query.current().is_blank() {
            return None;
        }
        self.search_current()
    }

    /// New query text, back on page 1. Resubmitting the current text runs
    /// the search again.
    pub fn submit_query(&mut self, text: &str) -> Option<SearchTicket> {
        self.query.set_query(text);
        self.search_current()
    }

    /// Switches tabs. Shows the other mode's cached page when it was fetched
    /// for exactly the new query state, else fetches.
    pub fn set_mode(&mut self, mode: SearchMode) -> Option<SearchTicket> {
        if !self.query.set_mode(mode) {
            return None;
        }
        self.show_cached_or_search()
    }

    /// Moves to page `n`. Scrolls to the top once when the page changes;
    /// rejected or unchanged pages do nothing.
    pub fn change_page(&mut self, n: u32) -> Option<SearchTicket> {
        if !self.query.set_page(n) {
            return None;
        }
        self.ctx.viewport.scroll_to_top();
        self.search_current()
    }

    /// Back, forward or a pasted link changed the address.
    pub fn on_location_changed(&mut self) -> Option<SearchTicket> {
        self.query.sync_from_location()?;
        self.show_cached_or_search()
    }

    pub fn apply_search(
        &mut self,
        ticket: SearchTicket,
        outcome: std::result::Result<ResultPage, TransportError>,
    ) -> Applied {
        let applied = self.orchestrator.apply(ticket, outcome);
        if applied == Applied::Displayed {
            if let Some(page) = self.orchestrator.displayed_page() {
                self.query.record_total(page);
            }
        }
        applied
    }

    /// Fetches `ticket` inline and applies the outcome.
    pub async fn run(&mut self, ticket: Option<SearchTicket>) -> Option<Applied> {
        let ticket = ticket?;
        let outcome = fetch(self.ctx.search.as_ref(), &ticket).await;
        Some(self.apply_search(ticket, outcome))
    }

    /// Optimistically flips the item's flag in every cached list. Without a
    /// session this redirects to the login view and changes nothing.
    pub fn begin_bookmark(&mut self, item_id: &str) -> Result<UndoToken> {
        let begun = self.toggler.begin(self.orchestrator.cache_mut(), item_id);
        if matches!(begun, Err(Error::AuthRequired)) {
            self.ctx.router.push(LOGIN_PATH);
        }
        begun
    }

    pub fn finish_bookmark(
        &mut self,
        token: UndoToken,
        outcome: std::result::Result<(), TransportError>,
    ) -> Result<bool> {
        self.toggler
            .finish(self.orchestrator.cache_mut(), token, outcome)
    }

    pub async fn toggle_bookmark(&mut self, item_id: &str) -> Result<bool> {
        let token = self.begin_bookmark(item_id)?;
        let outcome = self.ctx.bookmarks.toggle_bookmark(item_id).await;
        self.finish_bookmark(token, outcome)
    }

    pub fn dismiss_error(&mut self) {
        self.orchestrator.dismiss_error();
    }

    pub fn view(&self) -> SearchView<'_> {
        self.orchestrator.view()
    }

    pub fn query(&self) -> &QueryState {
        self.query.current()
    }

    /// Page bounds for the current query, once its total is known.
    pub fn pagination(&self) -> Option<Pagination> {
        self.query.pagination()
    }

    fn show_cached_or_search(&mut self) -> Option<SearchTicket> {
        let current = self.query.current().clone();
        if self.orchestrator.show_cached(&current) {
            if let Some(page) = self.orchestrator.displayed_page() {
                self.query.record_total(page);
            }
            return None;
        }
        self.search_current()
    }

    fn search_current(&mut self) -> Option<SearchTicket> {
        let current = self.query.current().clone();
        match self.orchestrator.issue(&current) {
            Issued::Ready(page) => {
                self.query.record_total(&page);
                None
            }
            Issued::Pending(ticket) => Some(ticket),
        }
    }
}
