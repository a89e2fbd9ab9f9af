pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::query::DEFAULT_PAGE_SIZE;

/// Which backend implementation serves the capability traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    Mock,
    Http,
}

/// When a successful login is written to persistent session storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Every login is persisted; "remember me" only controls the remembered email.
    Always,
    /// Only logins with "remember me" checked are persisted.
    RememberOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_mode: ApiMode,
    pub api_base_url: String,
    pub page_size: u32,
    pub session_persistence: PersistPolicy,
    pub mock_latency_ms: u64,
}

impl AppConfig {
    /// Loads the settings file and applies environment overrides on top.
    pub fn load() -> Result<Self> {
        let mut config = settings::load_config(None)?;
        settings::apply_env_overrides(&mut config);
        Ok(config.sanitized())
    }

    /// Coerces out-of-range values to their defaults.
    pub fn sanitized(mut self) -> Self {
        if self.page_size == 0 {
            tracing::warn!("page_size must be at least 1, using {}", DEFAULT_PAGE_SIZE);
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        if self.api_base_url.trim().is_empty() {
            self.api_base_url = AppConfig::default().api_base_url;
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_mode: ApiMode::Mock,
            api_base_url: "http://localhost:8080".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            session_persistence: PersistPolicy::Always,
            mock_latency_ms: 0,
        }
    }
}
