//! Capability traits for the catalog backend and the strategy that selects one.
//!
//! The coordinator and the auth gate only ever see these traits. Which implementation
//! sits behind them (`mock` or `http`) is decided once, at startup, from `AppConfig`.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{ApiMode, AppConfig};
use crate::core::{Category, SearchRequest, SearchResponse, ServiceError, UserProfile};

pub use http::HttpFilesApi;
pub use mock::MockFilesApi;

/// Executes a search and returns one page of raw records.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError>;
}

/// A lightweight lookup returning at most five suggestions.
#[async_trait]
pub trait SuggestService: Send + Sync {
    async fn suggest(&self, q: &str, categories: &[Category]) -> Result<Vec<String>, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<LoginResponse, ServiceError>;

    /// Ends the remote session. Callers treat any error as non-fatal.
    async fn logout(&self) -> Result<(), ServiceError>;

    /// Validates the current credential and returns the fresh profile.
    async fn me(&self) -> Result<UserProfile, ServiceError>;

    /// Hands a credential restored from storage (or `None` after a local wipe) to the
    /// backend so later calls are authenticated with it.
    fn restore_token(&self, _token: Option<&str>) {}
}

/// A file submitted for upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content: Vec<u8>,
    pub title: String,
    pub category: Category,
    pub metadata_text: String,
}

#[async_trait]
pub trait FileService: Send + Sync {
    /// Uploads a file. `on_progress` receives non-decreasing percentages in `0..=100`
    /// before the call resolves.
    async fn upload(
        &self,
        upload: UploadRequest,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<serde_json::Value, ServiceError>;

    /// Deletes a file. Fails with `PermissionDenied`, `NotFound` or anything else.
    async fn delete(&self, file_id: &str) -> Result<(), ServiceError>;
}

/// Every capability behind one handle, one field per trait.
#[derive(Clone)]
pub struct Backend {
    pub search: Arc<dyn SearchService>,
    pub suggest: Arc<dyn SuggestService>,
    pub auth: Arc<dyn AuthService>,
    pub files: Arc<dyn FileService>,
}

impl Backend {
    pub fn from_api<T>(api: Arc<T>) -> Self
    where
        T: SearchService + SuggestService + AuthService + FileService + 'static,
    {
        Self {
            search: api.clone(),
            suggest: api.clone(),
            auth: api.clone(),
            files: api,
        }
    }
}

/// Selects the backend implementation named by `config.api_mode`.
pub fn build_backend(config: &AppConfig) -> anyhow::Result<Backend> {
    match config.api_mode {
        ApiMode::Mock => {
            tracing::info!("Using the in-memory mock backend.");
            let api = MockFilesApi::with_latency(std::time::Duration::from_millis(
                config.mock_latency_ms,
            ));
            Ok(Backend::from_api(Arc::new(api)))
        }
        ApiMode::Http => {
            tracing::info!("Using the HTTP backend at {}.", config.api_base_url);
            let api = HttpFilesApi::new(&config.api_base_url)?;
            Ok(Backend::from_api(Arc::new(api)))
        }
    }
}
