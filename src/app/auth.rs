//! The auth gate: owns the session, persists it, and gates authenticated operations.

use std::sync::{Arc, Mutex};

use super::helpers::{lock, with_state_and_notify, ViewState};
use super::proxy::EventProxy;
use super::state::Session;
use super::view_model::{generate_session_view, SessionView};
use crate::api::AuthService;
use crate::config::PersistPolicy;
use crate::core::storage::{AUTH_TOKEN_KEY, AUTH_USER_KEY, REMEMBER_EMAIL_KEY, REMEMBER_ME_KEY};
use crate::core::{KeyValueStore, ServiceError, UserProfile};

/// Clears `is_loading` however `login` exits.
struct LoadingReset<'a, P: EventProxy> {
    session: &'a Arc<Mutex<Session>>,
    proxy: &'a P,
}

impl<P: EventProxy> Drop for LoadingReset<'_, P> {
    fn drop(&mut self) {
        let mut session = lock(self.session);
        session.is_loading = false;
        self.proxy.send_event(session.to_event());
    }
}

#[derive(Clone)]
pub struct AuthGate<P: EventProxy> {
    session: Arc<Mutex<Session>>,
    auth_service: Arc<dyn AuthService>,
    store: Arc<dyn KeyValueStore>,
    policy: PersistPolicy,
    proxy: P,
}

impl<P: EventProxy> AuthGate<P> {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        store: Arc<dyn KeyValueStore>,
        policy: PersistPolicy,
        proxy: P,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::default())),
            auth_service,
            store,
            policy,
            proxy,
        }
    }

    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    pub fn view(&self) -> SessionView {
        generate_session_view(&lock(&self.session))
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.session).is_authenticated()
    }

    /// Restores a persisted session and validates it against the backend.
    ///
    /// The restored session is shown as authenticated right away; if the backend
    /// rejects the token, everything is wiped again.
    pub async fn init(&self) {
        let (Some(token), Some(raw_user)) = (
            self.store.get(AUTH_TOKEN_KEY),
            self.store.get(AUTH_USER_KEY),
        ) else {
            tracing::debug!("No persisted session to restore.");
            return;
        };

        let user: UserProfile = match serde_json::from_str(&raw_user) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Discarding unreadable persisted user: {}", e);
                self.clear_auth();
                return;
            }
        };

        self.auth_service.restore_token(Some(&token));
        with_state_and_notify(&self.session, &self.proxy, |s| {
            s.token = Some(token);
            s.user = Some(user);
            s.error = None;
        });

        match self.auth_service.me().await {
            Ok(fresh) => {
                tracing::info!("Restored session for {}", fresh.email);
                self.persist_user(&fresh);
                with_state_and_notify(&self.session, &self.proxy, |s| s.user = Some(fresh));
            }
            Err(e) => {
                tracing::info!("Persisted session is no longer valid: {}", e);
                self.clear_auth();
            }
        }
    }

    /// Logs in and, depending on the persistence policy, stores the session.
    ///
    /// On failure the message is recorded in the session and the error is returned;
    /// nothing is persisted.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<UserProfile, ServiceError> {
        with_state_and_notify(&self.session, &self.proxy, |s| {
            s.is_loading = true;
            s.error = None;
        });
        let _reset = LoadingReset {
            session: &self.session,
            proxy: &self.proxy,
        };

        let result = if email.trim().is_empty() || password.is_empty() {
            Err(ServiceError::Validation(
                "Email and password are required".to_string(),
            ))
        } else {
            self.auth_service.login(email, password, remember).await
        };

        match result {
            Ok(response) => {
                if self.policy == PersistPolicy::Always || remember {
                    self.store_value(AUTH_TOKEN_KEY, &response.token);
                    self.persist_user(&response.user);
                } else {
                    self.remove_value(AUTH_TOKEN_KEY);
                    self.remove_value(AUTH_USER_KEY);
                }
                if remember {
                    self.store_value(REMEMBER_EMAIL_KEY, email);
                    self.store_value(REMEMBER_ME_KEY, "true");
                } else {
                    self.remove_value(REMEMBER_EMAIL_KEY);
                    self.remove_value(REMEMBER_ME_KEY);
                }

                tracing::info!("Logged in as {}", response.user.email);
                let mut session = lock(&self.session);
                session.token = Some(response.token);
                session.user = Some(response.user.clone());
                session.error = None;
                Ok(response.user)
            }
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                lock(&self.session).error = Some(e.message_or("Login failed"));
                Err(e)
            }
        }
    }

    /// Ends the session. A failing remote logout never keeps the user logged in.
    pub async fn logout(&self) {
        if let Err(e) = self.auth_service.logout().await {
            tracing::warn!("Ignoring logout failure: {}", e);
        }
        self.clear_auth();
    }

    /// Wipes the session and the persisted credential. The remembered email survives.
    pub fn clear_auth(&self) {
        self.remove_value(AUTH_TOKEN_KEY);
        self.remove_value(AUTH_USER_KEY);
        self.auth_service.restore_token(None);
        with_state_and_notify(&self.session, &self.proxy, |s| s.clear());
    }

    /// The email to pre-fill on the login form, if the user asked to be remembered.
    pub fn remembered_email(&self) -> Option<String> {
        match self.store.get(REMEMBER_ME_KEY).as_deref() {
            Some("true") => self.store.get(REMEMBER_EMAIL_KEY),
            _ => None,
        }
    }

    /// The current user, or `Unauthenticated` when nobody is logged in.
    pub fn require_session(&self) -> Result<UserProfile, ServiceError> {
        let session = lock(&self.session);
        match (&session.user, &session.token) {
            (Some(user), Some(_)) => Ok(user.clone()),
            _ => Err(ServiceError::Unauthenticated),
        }
    }

    fn persist_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(raw) => self.store_value(AUTH_USER_KEY, &raw),
            Err(e) => tracing::warn!("Failed to encode user profile: {}", e),
        }
    }

    fn store_value(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!("Failed to persist {}: {:#}", key, e);
        }
    }

    fn remove_value(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!("Failed to remove {}: {:#}", key, e);
        }
    }
}
