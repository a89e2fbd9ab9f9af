//! Defines the central, mutable state of the search view and the session.

use crate::core::{Category, QueryState, ResultPage, SearchRequest, UserProfile};

/// Holds the complete, mutable state of the search view.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` and shared between the command
/// handlers and the in-flight searches they spawn. The lock is never held across an
/// `.await`.
#[derive(Debug)]
pub struct SearchState {
    /// Filter, sort and pagination choices.
    pub query: QueryState,
    /// The last applied search outcome.
    pub result: ResultPage,
    /// Suggestions for the current query text, at most five.
    pub suggestions: Vec<String>,
    /// `true` while the most recently issued search is unresolved.
    pub loading: bool,
    /// The message of the last failed search, cleared when a new one is issued.
    pub error: Option<String>,
    /// Sequence number of the most recently issued search.
    latest_request: u64,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(QueryState::default().size)
    }
}

impl SearchState {
    pub fn new(page_size: u32) -> Self {
        let query = QueryState::with_page_size(page_size);
        Self {
            result: ResultPage::empty(query.size),
            query,
            suggestions: Vec::new(),
            loading: false,
            error: None,
            latest_request: 0,
        }
    }

    /// Marks a new search as in flight and returns its sequence number and request.
    /// Any response tagged with an older sequence number is stale from now on.
    pub fn issue_request(&mut self) -> (u64, SearchRequest) {
        self.latest_request += 1;
        self.loading = true;
        self.error = None;
        (self.latest_request, self.query.to_request())
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.latest_request
    }

    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }

    /// Restores the default filter, sort and page, keeping the page size.
    pub fn reset_query(&mut self) {
        self.query = QueryState::with_page_size(self.query.size);
    }

    pub fn selected_categories(&self) -> Vec<Category> {
        self.query.selected_categories()
    }

    pub fn total_pages(&self) -> u64 {
        self.result.total_pages(self.query.size)
    }

    pub fn has_results(&self) -> bool {
        !self.result.results.is_empty()
    }
}

/// The authenticated-user state held by the auth gate.
///
/// Authentication is derived from the presence of both `user` and `token`, so the
/// two can never disagree with an "authenticated" flag.
#[derive(Debug, Default, Clone)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    /// Wipes the credential, the profile and any error.
    pub fn clear(&mut self) {
        self.user = None;
        self.token = None;
        self.error = None;
    }
}
