//! The search coordinator: the single source of truth for the current search view.
//!
//! Every operation mutates `SearchState` and issues its search synchronously, when it
//! is called, and hands back a future that only awaits the backend and applies the
//! response. Callers that run those futures on separate tasks still see state changes
//! land in call order. Searches are tagged with a sequence number when they are
//! issued; a response is applied only if no newer search was issued in the meantime,
//! so the visible page always belongs to the most recently issued request, whatever
//! order the responses arrive in.

use std::future::Future;
use std::sync::{Arc, Mutex};

use super::helpers::{lock, with_state_and_notify, ViewState};
use super::proxy::EventProxy;
use super::state::SearchState;
use super::view_model::{generate_search_view, SearchView};
use crate::api::{SearchService, SuggestService};
use crate::config::AppConfig;
use crate::core::search::MAX_SUGGESTIONS;
use crate::core::{
    Category, FileRecord, ResultPage, SearchRequest, SearchResponse, ServiceError, SortDir,
    SortField,
};

/// Queries shorter than this (after trimming) never reach the suggest backend.
pub const MIN_SUGGEST_CHARS: usize = 2;

/// What became of a search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The response was applied to the view.
    Applied,
    /// A newer search was issued before this one resolved; its response was dropped.
    Superseded,
    /// No search was issued (e.g. an out-of-range page).
    Ignored,
}

/// Clears `loading` when the search it guards settles, unless a newer search owns it.
///
/// Runs on every exit path, including the search future being dropped mid-flight or
/// never polled at all.
struct SettleGuard<P: EventProxy> {
    state: Arc<Mutex<SearchState>>,
    proxy: P,
    seq: u64,
}

impl<P: EventProxy> Drop for SettleGuard<P> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.is_latest(self.seq) {
            state.loading = false;
            self.proxy.send_event(state.to_event());
        }
    }
}

#[derive(Clone)]
pub struct SearchCoordinator<P: EventProxy> {
    state: Arc<Mutex<SearchState>>,
    search_service: Arc<dyn SearchService>,
    suggest_service: Arc<dyn SuggestService>,
    proxy: P,
    api_base_url: String,
    page_size: u32,
}

impl<P: EventProxy> SearchCoordinator<P> {
    pub fn new(
        search_service: Arc<dyn SearchService>,
        suggest_service: Arc<dyn SuggestService>,
        proxy: P,
        config: &AppConfig,
    ) -> Self {
        let page_size = config.page_size.max(1);
        Self {
            state: Arc::new(Mutex::new(SearchState::new(page_size))),
            search_service,
            suggest_service,
            proxy,
            api_base_url: config.api_base_url.clone(),
            page_size,
        }
    }

    /// The shared state, for inspection by the embedding UI and tests.
    pub fn state(&self) -> Arc<Mutex<SearchState>> {
        self.state.clone()
    }

    pub fn view(&self) -> SearchView {
        generate_search_view(&lock(&self.state))
    }

    /// Resets filters, sort and page to their defaults and searches.
    pub fn load_default(
        &self,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        let page_size = self.page_size;
        with_state_and_notify(&self.state, &self.proxy, |s| {
            s.reset_query();
            s.query.size = page_size;
        });
        self.search()
    }

    /// Issues a search with the current query state and returns the future that waits
    /// for its response.
    ///
    /// The request is issued here, not on first poll. On failure the results are
    /// emptied, the message is recorded in the view and the error is returned. A
    /// response that was superseded by a newer search is dropped, success or failure
    /// alike.
    pub fn search(
        &self,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        let (seq, request) = with_state_and_notify(&self.state, &self.proxy, |s| s.issue_request());
        tracing::debug!("Issuing search #{}: {:?}", seq, request);
        let settle = SettleGuard {
            state: self.state.clone(),
            proxy: self.proxy.clone(),
            seq,
        };
        let this = self.clone();

        async move {
            let _settle = settle;
            let response = this.search_service.search(&request).await;
            this.apply_response(seq, &request, response)
        }
    }

    fn apply_response(
        &self,
        seq: u64,
        request: &SearchRequest,
        response: Result<SearchResponse, ServiceError>,
    ) -> Result<SearchOutcome, ServiceError> {
        let mut state = lock(&self.state);
        if !state.is_latest(seq) {
            tracing::debug!(
                "Discarding response of search #{}; #{} is newer.",
                seq,
                state.latest_request()
            );
            return Ok(SearchOutcome::Superseded);
        }

        match response {
            Ok(response) => {
                state.result = self.reconcile(response, request);
                state.error = None;
                tracing::debug!(
                    "Search #{} applied: {} of {} results.",
                    seq,
                    state.result.results.len(),
                    state.result.total
                );
                Ok(SearchOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!("Search #{} failed: {}", seq, e);
                state.result = ResultPage::empty(request.size);
                state.error = Some(e.message_or("Search failed"));
                Err(e)
            }
        }
    }

    /// Normalizes the raw page and enforces `results <= size` and `total >= results`.
    fn reconcile(&self, response: SearchResponse, request: &SearchRequest) -> ResultPage {
        let size = request.size.max(1);
        if response.results.len() > size as usize {
            tracing::warn!(
                "Backend returned {} results for a page of {}; truncating.",
                response.results.len(),
                size
            );
        }
        let results: Vec<FileRecord> = response
            .results
            .iter()
            .take(size as usize)
            .map(|raw| FileRecord::from_raw(raw, &self.api_base_url))
            .collect();
        let total = response.total.max(results.len() as u64);

        ResultPage {
            results,
            total,
            page: response.page,
            size: response.size,
        }
    }

    /// Refreshes suggestions for the query text as it is now.
    ///
    /// Best-effort: a failure only clears the suggestions. Suggestions for a text the
    /// user has since changed are dropped.
    pub fn suggest(&self) -> impl Future<Output = ()> + Send + 'static {
        let (q, categories) = {
            let state = lock(&self.state);
            (state.query.q.clone(), state.selected_categories())
        };
        let this = self.clone();

        async move {
            if q.trim().chars().count() < MIN_SUGGEST_CHARS {
                with_state_and_notify(&this.state, &this.proxy, |s| s.suggestions.clear());
                return;
            }

            let suggestions = match this.suggest_service.suggest(&q, &categories).await {
                Ok(mut suggestions) => {
                    suggestions.truncate(MAX_SUGGESTIONS);
                    suggestions
                }
                Err(e) => {
                    tracing::debug!("Suggestion lookup for {:?} failed: {}", q, e);
                    Vec::new()
                }
            };

            let mut state = lock(&this.state);
            if state.query.q != q {
                tracing::debug!("Dropping suggestions for {:?}; the query moved on.", q);
                return;
            }
            state.suggestions = suggestions;
            this.proxy.send_event(state.to_event());
        }
    }

    /// Updates the query text without searching (typing).
    pub fn set_query(&self, q: &str) {
        with_state_and_notify(&self.state, &self.proxy, |s| s.query.q = q.to_string());
    }

    /// Sets the query text, returns to the first page and searches.
    pub fn submit_query(
        &self,
        q: &str,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        {
            let mut state = lock(&self.state);
            state.query.q = q.to_string();
            state.query.page = 1;
        }
        self.search()
    }

    /// Flips one category filter. Filters change what page N means, so the page resets.
    pub fn toggle_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        {
            let mut state = lock(&self.state);
            if !state.query.categories.remove(&category) {
                state.query.categories.insert(category);
            }
            state.query.page = 1;
        }
        self.search()
    }

    /// Sorting by the current field flips the direction; a new field starts descending.
    pub fn set_sort(
        &self,
        field: SortField,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        {
            let mut state = lock(&self.state);
            if state.query.sort_field == field {
                state.query.sort_dir = state.query.sort_dir.flipped();
            } else {
                state.query.sort_field = field;
                state.query.sort_dir = SortDir::Desc;
            }
            state.query.page = 1;
        }
        self.search()
    }

    /// Moves to page `page`. Pages outside `1..=total_pages` are ignored; the bound comes
    /// from the last applied search.
    pub fn set_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        let accepted = {
            let mut state = lock(&self.state);
            let in_range = page >= 1 && u64::from(page) <= state.total_pages();
            if in_range {
                state.query.page = page;
            } else {
                tracing::debug!(
                    "Ignoring page {} outside 1..={}",
                    page,
                    state.total_pages()
                );
            }
            in_range
        };
        let search = accepted.then(|| self.search());

        async move {
            match search {
                Some(search) => search.await,
                None => Ok(SearchOutcome::Ignored),
            }
        }
    }

    pub fn next_page(
        &self,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        let page = lock(&self.state).query.page;
        self.set_page(page.saturating_add(1))
    }

    pub fn prev_page(
        &self,
    ) -> impl Future<Output = Result<SearchOutcome, ServiceError>> + Send + 'static {
        let page = lock(&self.state).query.page;
        self.set_page(page.saturating_sub(1))
    }
}
