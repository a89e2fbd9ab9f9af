use anyhow::Result;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ApiMode, AppConfig};

const APP_NAME: &str = "CatalogSearch";
const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

pub const API_MODE_ENV: &str = "CATALOG_API_MODE";
pub const API_BASE_URL_ENV: &str = "CATALOG_API_BASE_URL";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "catalogsearch", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

/// Returns the path of the persisted session store.
pub fn get_session_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(SESSION_FILE))
}

fn resolve_path(path_override: Option<&Path>) -> Result<PathBuf> {
    match path_override {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the application configuration from the config file.
/// If the file doesn't exist, it creates a default one.
/// If the file cannot be parsed, it logs a warning and falls back to the defaults.
/// Missing fields take their default values.
pub fn load_config(path_override: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_path(path_override)?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, Some(&config_path))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;
    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(AppConfig::default())
        }
    }
}

/// Saves the provided configuration to the config file.
pub fn save_config(config: &AppConfig, path_override: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path_override)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    fs::write(&config_path, serde_json::to_string_pretty(config)?)?;
    tracing::info!("Saved config to {:?}", config_path);
    Ok(())
}

/// Applies `CATALOG_API_MODE` and `CATALOG_API_BASE_URL` when set.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(mode) = std::env::var(API_MODE_ENV) {
        match mode.trim().to_ascii_lowercase().as_str() {
            "mock" => config.api_mode = ApiMode::Mock,
            "http" => config.api_mode = ApiMode::Http,
            other => tracing::warn!("Ignoring unknown {}={:?}", API_MODE_ENV, other),
        }
    }
    if let Ok(base_url) = std::env::var(API_BASE_URL_ENV) {
        if !base_url.trim().is_empty() {
            config.api_base_url = base_url.trim().to_string();
        }
    }
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.catalogsearch.CatalogSearch/
// Linux:   ~/.config/catalogsearch/
// Windows: %APPDATA%/catalogsearch/CatalogSearch/config/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistPolicy;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg").join(CONFIG_FILE);

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{ "api_mode": "http", "session_persistence": "remember_only" }"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.api_mode, ApiMode::Http);
        assert_eq!(config.session_persistence, PersistPolicy::RememberOnly);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.api_base_url, "http://localhost:8080");
    }

    #[test]
    fn test_corrupted_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ this is not json").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AppConfig {
            page_size: 25,
            mock_latency_ms: 100,
            ..Default::default()
        };
        save_config(&config, Some(&path)).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_sanitized_coerces_zero_page_size() {
        let config = AppConfig {
            page_size: 0,
            api_base_url: "  ".into(),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.api_base_url, "http://localhost:8080");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var(API_MODE_ENV, "HTTP");
        std::env::set_var(API_BASE_URL_ENV, "https://files.example.com");
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config);
        std::env::remove_var(API_MODE_ENV);
        std::env::remove_var(API_BASE_URL_ENV);

        assert_eq!(config.api_mode, ApiMode::Http);
        assert_eq!(config.api_base_url, "https://files.example.com");
    }

    #[test]
    #[serial]
    fn test_unknown_env_mode_is_ignored() {
        std::env::set_var(API_MODE_ENV, "carrier-pigeon");
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config);
        std::env::remove_var(API_MODE_ENV);
        assert_eq!(config.api_mode, ApiMode::Mock);
    }
}
