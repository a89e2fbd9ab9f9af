//! Contains helper functions to reduce boilerplate code in other `app` modules.

use std::sync::{Arc, Mutex, MutexGuard};

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::state::{SearchState, Session};
use super::view_model::{generate_search_view, generate_session_view};

/// State that can describe itself to the UI as a full-update event.
pub trait ViewState {
    fn to_event(&self) -> UserEvent;
}

impl ViewState for SearchState {
    fn to_event(&self) -> UserEvent {
        UserEvent::SearchUpdate(Box::new(generate_search_view(self)))
    }
}

impl ViewState for Session {
    fn to_event(&self) -> UserEvent {
        UserEvent::SessionUpdate(Box::new(generate_session_view(self)))
    }
}

/// Locks shared state. A panic in another holder does not leave the state unusable,
/// so a poisoned lock is recovered.
pub fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// A helper function that locks the state, performs a mutation,
/// and then automatically sends the matching update event to the UI.
///
/// Returns whatever the mutation returns.
pub fn with_state_and_notify<S, F, R, P>(state: &Arc<Mutex<S>>, proxy: &P, update_fn: F) -> R
where
    S: ViewState,
    F: FnOnce(&mut S) -> R,
    P: EventProxy,
{
    let mut state_guard = lock(state);

    // Execute the specific mutation logic
    let result = update_fn(&mut state_guard);

    proxy.send_event(state_guard.to_event());
    result
}
