//! Integration tests for the catalog search application.
//!
//! Commands go through the same JSON IPC entry point the binary uses, against the
//! in-memory mock backend, and assertions are made on the emitted `UserEvent`s.

use catalog_search::api::{Backend, MockFilesApi};
use catalog_search::app::{self, events::UserEvent, AppContext};
use catalog_search::config::AppConfig;
use catalog_search::core::{Category, JsonFileStore, KeyValueStore, SortDir, SortField};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Contains the test infrastructure.
mod helpers {
    use super::*;
    use catalog_search::utils::test_helpers::{event_channel, setup_test_logging, TestEventProxy};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// `TestHarness` sets up a complete, isolated environment for each test case.
    pub struct TestHarness {
        pub ctx: AppContext<TestEventProxy>,
        pub api: Arc<MockFilesApi>,
        pub event_rx: mpsc::UnboundedReceiver<UserEvent>,
        pub root_path: PathBuf,
        _temp_dir: Option<TempDir>,
    }

    impl TestHarness {
        pub fn new() -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let root_path = temp_dir.path().to_path_buf();
            let mut harness = Self::with_api(Arc::new(MockFilesApi::new()), root_path);
            harness._temp_dir = Some(temp_dir);
            harness
        }

        /// A fresh context over `api`, persisting its session under `root_path`.
        /// The caller owns the directory.
        pub fn with_api(api: Arc<MockFilesApi>, root_path: PathBuf) -> Self {
            setup_test_logging();
            let (proxy, event_rx) = event_channel();
            let store: Arc<dyn KeyValueStore> =
                Arc::new(JsonFileStore::open(root_path.join("session.json")));
            let ctx = AppContext::new(
                &Backend::from_api(api.clone()),
                store,
                &AppConfig::default(),
                proxy,
            );
            Self {
                ctx,
                api,
                event_rx,
                root_path,
                _temp_dir: None,
            }
        }

        /// Sends one IPC message and waits until its command has finished.
        /// Returns `false` when the message was rejected without running.
        pub async fn send(&self, command: &str, payload: Value) -> bool {
            let message = json!({ "command": command, "payload": payload }).to_string();
            match app::handle_ipc_message(message, self.ctx.clone()) {
                Some(handle) => {
                    handle.await.expect("Command task panicked");
                    true
                }
                None => false,
            }
        }

        pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.root_path.join(name);
            std::fs::write(&path, content).expect("Failed to write test file");
            path
        }
    }
}

use catalog_search::utils::test_helpers::{drain_events, last_search_update, last_session_update};
use helpers::TestHarness;

#[tokio::test]
async fn test_start_loads_first_page_of_default_search() {
    let mut harness = TestHarness::new();
    harness.ctx.start().await;

    let view = last_search_update(&mut harness.event_rx).expect("No search update");
    assert_eq!(view.total, 200);
    assert_eq!(view.total_pages, 20);
    assert_eq!(view.results.len(), 10);
    assert_eq!(view.page, 1);
    assert_eq!(view.sort_field, SortField::UploadedAt);
    assert_eq!(view.sort_dir, SortDir::Desc);
    assert!(!view.loading);
    assert!(view
        .results
        .windows(2)
        .all(|pair| pair[0].uploaded_at >= pair[1].uploaded_at));
    assert!(view
        .results
        .iter()
        .all(|r| r.download_url.starts_with("http://localhost:8080/api/files/download/")));
    assert!(!harness.ctx.auth.is_authenticated());
}

#[tokio::test]
async fn test_category_filter_and_query() {
    let mut harness = TestHarness::new();
    harness.ctx.start().await;
    harness.send("setPage", json!(3)).await;

    assert!(harness.send("toggleCategory", json!("IMAGE")).await);
    let view = last_search_update(&mut harness.event_rx).unwrap();
    assert_eq!(view.categories, vec![Category::Image]);
    assert_eq!(view.page, 1);
    assert!(view.total > 0 && view.total < 200);
    assert!(view.results.iter().all(|r| r.category == Category::Image));

    assert!(harness.send("search", json!({ "q": "logo" })).await);
    let view = last_search_update(&mut harness.event_rx).unwrap();
    assert_eq!(view.q, "logo");
    assert!(view.results.iter().all(|r| {
        let haystack = format!("{} {} {}", r.title, r.filename, r.metadata_text).to_lowercase();
        r.category == Category::Image && haystack.contains("logo")
    }));
}

#[tokio::test]
async fn test_rapid_toggles_leave_a_consistent_view() {
    let mut harness = TestHarness::new();
    harness.ctx.start().await;

    let first = app::handle_ipc_message(
        json!({"command": "toggleCategory", "payload": "VIDEO"}).to_string(),
        harness.ctx.clone(),
    )
    .unwrap();
    let second = app::handle_ipc_message(
        json!({"command": "toggleCategory", "payload": "AUDIO"}).to_string(),
        harness.ctx.clone(),
    )
    .unwrap();
    first.await.unwrap();
    second.await.unwrap();

    let view = last_search_update(&mut harness.event_rx).unwrap();
    assert!(!view.loading);
    assert!(view
        .results
        .iter()
        .all(|r| view.categories.contains(&r.category)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_back_to_back_commands_apply_in_arrival_order() {
    for _ in 0..10 {
        let temp_dir = tempfile::tempdir().unwrap();
        let api = Arc::new(MockFilesApi::with_latency(Duration::from_millis(5)));
        let mut harness = TestHarness::with_api(api, temp_dir.path().to_path_buf());

        let handles: Vec<_> = [
            ("toggleCategory", json!("DOCUMENT")),
            ("setQuery", json!("zzzz_nomatch")),
            ("search", Value::Null),
        ]
        .into_iter()
        .map(|(command, payload)| {
            let message = json!({ "command": command, "payload": payload }).to_string();
            app::handle_ipc_message(message, harness.ctx.clone()).unwrap()
        })
        .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let view = harness.ctx.search.view();
        assert_eq!(view.q, "zzzz_nomatch");
        assert_eq!(view.categories, vec![Category::Document]);
        assert_eq!(view.total, 0);
        assert!(view.results.is_empty());
        assert!(!view.loading);

        let last = last_search_update(&mut harness.event_rx).unwrap();
        assert_eq!(last.q, "zzzz_nomatch");
        assert_eq!(last.total, 0);
        assert!(!last.loading);
    }
}

#[tokio::test]
async fn test_pagination_bounds() {
    let mut harness = TestHarness::new();
    harness.ctx.start().await;

    assert!(harness.send("setPage", json!(20)).await);
    assert_eq!(last_search_update(&mut harness.event_rx).unwrap().page, 20);

    assert!(harness.send("nextPage", Value::Null).await);
    assert!(drain_events(&mut harness.event_rx).is_empty());
    assert_eq!(harness.ctx.search.view().page, 20);

    assert!(harness.send("prevPage", Value::Null).await);
    assert_eq!(last_search_update(&mut harness.event_rx).unwrap().page, 19);
}

#[tokio::test]
async fn test_sort_by_title_toggles_direction() {
    let mut harness = TestHarness::new();
    harness.ctx.start().await;

    harness.send("setSort", json!("title")).await;
    let view = last_search_update(&mut harness.event_rx).unwrap();
    assert_eq!((view.sort_field, view.sort_dir), (SortField::Title, SortDir::Desc));
    assert!(view.results.windows(2).all(|pair| {
        pair[0].title.to_lowercase() >= pair[1].title.to_lowercase()
    }));

    harness.send("setSort", json!("title")).await;
    let view = last_search_update(&mut harness.event_rx).unwrap();
    assert_eq!(view.sort_dir, SortDir::Asc);
}

#[tokio::test]
async fn test_suggestions_follow_typing() {
    let mut harness = TestHarness::new();
    harness.send("setQuery", json!("b")).await;
    assert!(last_search_update(&mut harness.event_rx).unwrap().suggestions.is_empty());

    harness.send("setQuery", json!("budget")).await;
    let suggestions = last_search_update(&mut harness.event_rx).unwrap().suggestions;
    assert!(!suggestions.is_empty() && suggestions.len() <= 5);
    assert!(suggestions
        .iter()
        .all(|s| s.to_lowercase().contains("budget")));
}

#[tokio::test]
async fn test_invalid_messages_produce_no_events() {
    let mut harness = TestHarness::new();

    assert!(!harness.send("toggleCategory", json!("SPREADSHEET")).await);
    assert!(!harness.send("setPage", json!("two")).await);
    assert!(!harness.send("login", json!({ "email": "a@b.c" })).await);
    assert!(!harness.send("selectDirectory", Value::Null).await);
    assert!(app::handle_ipc_message("not json".to_string(), harness.ctx.clone()).is_none());

    assert!(drain_events(&mut harness.event_rx).is_empty());
}

#[tokio::test]
async fn test_login_failure_surfaces_in_session_view() {
    let mut harness = TestHarness::new();
    harness
        .send("login", json!({ "email": "ann@example.com", "password": "" }))
        .await;

    let view = last_session_update(&mut harness.event_rx).unwrap();
    assert!(!view.is_authenticated);
    assert!(!view.is_loading);
    assert_eq!(view.error.as_deref(), Some("Email and password are required"));
    assert!(!harness.root_path.join("session.json").exists());
}

#[tokio::test]
async fn test_session_survives_restart_while_backend_accepts_it() {
    let temp_dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockFilesApi::new());

    let mut first = TestHarness::with_api(api.clone(), temp_dir.path().to_path_buf());
    first
        .send(
            "login",
            json!({ "email": "ann@example.com", "password": "secret", "remember": true }),
        )
        .await;
    assert!(last_session_update(&mut first.event_rx).unwrap().is_authenticated);

    // Same backend session: the restored token is still valid.
    let mut second = TestHarness::with_api(api, temp_dir.path().to_path_buf());
    second.ctx.start().await;
    let view = last_session_update(&mut second.event_rx).unwrap();
    assert!(view.is_authenticated);
    assert_eq!(view.user.unwrap().email, "ann@example.com");

    // A backend that never issued the token rejects it; the remembered email stays.
    let third = TestHarness::with_api(Arc::new(MockFilesApi::new()), temp_dir.path().to_path_buf());
    third.ctx.start().await;
    assert!(!third.ctx.auth.is_authenticated());
    assert_eq!(
        third.ctx.auth.remembered_email().as_deref(),
        Some("ann@example.com")
    );
}

#[tokio::test]
async fn test_logout_clears_session() {
    let mut harness = TestHarness::new();
    harness
        .send("login", json!({ "email": "ann@example.com", "password": "secret" }))
        .await;
    harness.send("logout", Value::Null).await;

    let view = last_session_update(&mut harness.event_rx).unwrap();
    assert!(!view.is_authenticated);
    assert_eq!(view.user, None);
    assert_eq!(harness.api.active_token(), None);
}

#[tokio::test]
async fn test_upload_then_delete_round_trip() {
    let mut harness = TestHarness::new();
    harness.ctx.start().await;
    harness
        .send("login", json!({ "email": "ann@example.com", "password": "secret" }))
        .await;
    let path = harness.create_file("quarterly.txt", "numbers");
    drain_events(&mut harness.event_rx);

    harness
        .send(
            "upload",
            json!({
                "path": path,
                "title": "Quarterly Numbers",
                "category": "DOCUMENT",
                "metadataText": "finance"
            }),
        )
        .await;

    let events = drain_events(&mut harness.event_rx);
    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            UserEvent::UploadProgress(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|pair| pair[0] < pair[1]));
    let uploaded = events
        .iter()
        .find_map(|e| match e {
            UserEvent::UploadComplete(body) => Some(body.clone()),
            _ => None,
        })
        .expect("No upload completion");
    assert_eq!(uploaded["file"]["title"], "Quarterly Numbers");
    assert_eq!(uploaded["file"]["filename"], "quarterly.txt");
    assert_eq!(uploaded["file"]["fileSize"], 7);
    assert_eq!(harness.ctx.search.view().total, 201);

    let id = uploaded["file"]["id"].as_str().unwrap().to_string();
    harness.send("delete", json!(id)).await;
    let events = drain_events(&mut harness.event_rx);
    assert!(matches!(events.first(), Some(UserEvent::FileDeleted(deleted)) if *deleted == id));
    assert_eq!(harness.ctx.search.view().total, 200);
}

#[tokio::test]
async fn test_delete_of_someone_elses_file_is_denied() {
    let mut harness = TestHarness::new();
    harness
        .send("login", json!({ "email": "ann@example.com", "password": "secret" }))
        .await;
    drain_events(&mut harness.event_rx);

    harness.send("delete", json!("file_7")).await;
    let events = drain_events(&mut harness.event_rx);
    let payload = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(
        payload,
        json!({
            "event": "deleteFailed",
            "payload": {
                "fileId": "file_7",
                "kind": "PERMISSION_DENIED",
                "message": "You do not have permission to delete this file"
            }
        })
    );
}

#[tokio::test]
async fn test_upload_of_missing_file_shows_error() {
    let mut harness = TestHarness::new();
    harness
        .send("login", json!({ "email": "ann@example.com", "password": "secret" }))
        .await;
    drain_events(&mut harness.event_rx);

    let missing = harness.root_path.join("missing.bin");
    harness.send("upload", json!({ "path": missing })).await;

    let events = drain_events(&mut harness.event_rx);
    assert!(matches!(events.as_slice(), [UserEvent::ShowError(m)] if m.starts_with("Could not read")));
    assert_eq!(harness.api.records().len(), 200);
}
