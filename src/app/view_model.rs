//! Responsible for transforming `SearchState` and `Session` into serializable views.
//!
//! This module acts as a presentation layer: every derived value the UI renders
//! (ordered categories, page count, result presence, authentication) is computed here.

use serde::Serialize;

use super::state::{SearchState, Session};
use crate::core::{Category, FileRecord, SortDir, SortField, UserProfile};

/// A serializable representation of the search view for the UI.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchView {
    pub q: String,
    /// Selected categories in declaration order.
    pub categories: Vec<Category>,
    pub sort_field: SortField,
    pub sort_dir: SortDir,
    pub page: u32,
    pub size: u32,
    pub results: Vec<FileRecord>,
    pub total: u64,
    pub total_pages: u64,
    pub has_results: bool,
    pub suggestions: Vec<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// A serializable representation of the session for the UI.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Creates the complete `SearchView` from the current `SearchState`.
pub fn generate_search_view(state: &SearchState) -> SearchView {
    SearchView {
        q: state.query.q.clone(),
        categories: state.selected_categories(),
        sort_field: state.query.sort_field,
        sort_dir: state.query.sort_dir,
        page: state.query.page,
        size: state.query.size,
        results: state.result.results.clone(),
        total: state.result.total,
        total_pages: state.total_pages(),
        has_results: state.has_results(),
        suggestions: state.suggestions.clone(),
        loading: state.loading,
        error: state.error.clone(),
    }
}

/// Creates the `SessionView`. The token itself never leaves the core.
pub fn generate_session_view(session: &Session) -> SessionView {
    SessionView {
        user: session.user.clone(),
        is_authenticated: session.is_authenticated(),
        is_loading: session.is_loading,
        error: session.error.clone(),
    }
}
