//! Upload and delete, gated on an authenticated session.
//!
//! Both report their outcome as events and, on success, refresh the current search so
//! the visible page reflects the change.

use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;

use super::auth::AuthGate;
use super::coordinator::SearchCoordinator;
use super::events::UserEvent;
use super::proxy::EventProxy;
use crate::api::{FileService, UploadRequest};
use crate::core::{ErrorKind, ServiceError};

#[derive(Clone)]
pub struct FileActions<P: EventProxy> {
    files: Arc<dyn FileService>,
    auth: AuthGate<P>,
    search: SearchCoordinator<P>,
    proxy: P,
}

impl<P: EventProxy> FileActions<P> {
    pub fn new(
        files: Arc<dyn FileService>,
        auth: AuthGate<P>,
        search: SearchCoordinator<P>,
        proxy: P,
    ) -> Self {
        Self {
            files,
            auth,
            search,
            proxy,
        }
    }

    /// Uploads a file, emitting `UploadProgress` along the way and `UploadComplete` at
    /// the end. Failures are shown to the user and returned.
    pub async fn upload(&self, upload: UploadRequest) -> Result<serde_json::Value, ServiceError> {
        if let Err(e) = self.auth.require_session() {
            self.proxy.send_event(UserEvent::ShowError(e.to_string()));
            return Err(e);
        }
        tracing::info!("Uploading {} ({} bytes)", upload.file_name, upload.content.len());

        let last_reported = AtomicI16::new(-1);
        let proxy = &self.proxy;
        let on_progress = |percent: u8| {
            let percent = i16::from(percent.min(100));
            if last_reported.fetch_max(percent, Ordering::SeqCst) < percent {
                proxy.send_event(UserEvent::UploadProgress(percent as u8));
            }
        };

        match self.files.upload(upload, &on_progress).await {
            Ok(body) => {
                self.proxy.send_event(UserEvent::UploadComplete(body.clone()));
                self.refresh().await;
                Ok(body)
            }
            Err(e) => {
                tracing::warn!("Upload failed: {}", e);
                self.proxy
                    .send_event(UserEvent::ShowError(e.message_or("Upload failed")));
                Err(e)
            }
        }
    }

    /// Deletes a file. A rejection is reported as `DeleteFailed` with a kind-specific
    /// message.
    pub async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        let result = match self.auth.require_session() {
            Ok(_) => self.files.delete(file_id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!("Deleted {}", file_id);
                self.proxy.send_event(UserEvent::FileDeleted(file_id.to_string()));
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Delete of {} failed: {}", file_id, e);
                self.proxy.send_event(UserEvent::DeleteFailed {
                    file_id: file_id.to_string(),
                    kind: e.kind(),
                    message: delete_failure_message(&e),
                });
                Err(e)
            }
        }
    }

    async fn refresh(&self) {
        if let Err(e) = self.search.search().await {
            tracing::warn!("Refreshing results failed: {}", e);
        }
    }
}

fn delete_failure_message(error: &ServiceError) -> String {
    match error.kind() {
        ErrorKind::PermissionDenied => "You do not have permission to delete this file".to_string(),
        ErrorKind::NotFound => "File not found".to_string(),
        _ => error.message_or("Delete failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Backend, MockFilesApi};
    use crate::config::{AppConfig, PersistPolicy};
    use crate::core::{Category, MemoryStore};
    use crate::utils::test_helpers::{
        drain_events, event_channel, setup_test_logging, TestEventProxy,
    };
    use tokio::sync::mpsc;

    struct TestHarness {
        actions: FileActions<TestEventProxy>,
        auth: AuthGate<TestEventProxy>,
        search: SearchCoordinator<TestEventProxy>,
        api: Arc<MockFilesApi>,
        event_rx: mpsc::UnboundedReceiver<UserEvent>,
    }

    impl TestHarness {
        fn new() -> Self {
            setup_test_logging();
            let (proxy, event_rx) = event_channel();
            let api = Arc::new(MockFilesApi::new());
            let backend = Backend::from_api(api.clone());
            let config = AppConfig::default();
            let search = SearchCoordinator::new(
                backend.search.clone(),
                backend.suggest.clone(),
                proxy.clone(),
                &config,
            );
            let auth = AuthGate::new(
                backend.auth.clone(),
                Arc::new(MemoryStore::new()),
                PersistPolicy::Always,
                proxy.clone(),
            );
            let actions = FileActions::new(backend.files, auth.clone(), search.clone(), proxy);
            Self {
                actions,
                auth,
                search,
                api,
                event_rx,
            }
        }

        async fn logged_in() -> Self {
            let harness = Self::new();
            harness
                .auth
                .login("ann@example.com", "secret", false)
                .await
                .unwrap();
            harness
        }
    }

    fn upload(name: &str) -> UploadRequest {
        UploadRequest {
            file_name: name.to_string(),
            content: b"hello world".to_vec(),
            title: "Greeting".to_string(),
            category: Category::Document,
            metadata_text: "notes".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_requires_session() {
        let mut harness = TestHarness::new();
        let err = harness.actions.upload(upload("a.txt")).await.unwrap_err();
        assert_eq!(err, ServiceError::Unauthenticated);

        let events = drain_events(&mut harness.event_rx);
        assert!(matches!(events.as_slice(), [UserEvent::ShowError(m)] if m == "Not authenticated"));
        assert_eq!(harness.api.records().len(), 200);
    }

    #[tokio::test]
    async fn test_upload_reports_progress_and_refreshes_results() {
        let mut harness = TestHarness::logged_in().await;
        drain_events(&mut harness.event_rx);

        let body = harness.actions.upload(upload("greeting.txt")).await.unwrap();
        assert_eq!(body["file"]["id"], "file_201");
        assert_eq!(body["file"]["uploadedByUserId"], "user_1");

        let events = drain_events(&mut harness.event_rx);
        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                UserEvent::UploadProgress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![0, 25, 50, 75, 100]);
        assert!(events.iter().any(|e| matches!(e, UserEvent::UploadComplete(_))));
        assert!(matches!(events.last(), Some(UserEvent::SearchUpdate(view)) if view.total == 201));
    }

    #[tokio::test]
    async fn test_delete_own_upload() {
        let mut harness = TestHarness::logged_in().await;
        harness.actions.upload(upload("mine.txt")).await.unwrap();
        drain_events(&mut harness.event_rx);

        harness.actions.delete("file_201").await.unwrap();

        let events = drain_events(&mut harness.event_rx);
        assert!(matches!(events.first(), Some(UserEvent::FileDeleted(id)) if id == "file_201"));
        assert_eq!(harness.search.view().total, 200);
    }

    #[tokio::test]
    async fn test_delete_failures_are_distinguishable() {
        let mut harness = TestHarness::logged_in().await;
        drain_events(&mut harness.event_rx);

        let cases = [
            (
                "file_1",
                ErrorKind::PermissionDenied,
                "You do not have permission to delete this file",
            ),
            ("file_999", ErrorKind::NotFound, "File not found"),
        ];
        for (id, expected_kind, expected_message) in cases {
            assert!(harness.actions.delete(id).await.is_err());
            match drain_events(&mut harness.event_rx).as_slice() {
                [UserEvent::DeleteFailed {
                    file_id,
                    kind,
                    message,
                }] => {
                    assert_eq!(file_id, id);
                    assert_eq!(*kind, expected_kind);
                    assert_eq!(message, expected_message);
                }
                other => panic!("unexpected events: {:?}", other),
            }
        }
        assert_eq!(harness.api.records().len(), 200);
    }

    #[tokio::test]
    async fn test_delete_requires_session() {
        let mut harness = TestHarness::new();
        let err = harness.actions.delete("file_1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert!(matches!(
            drain_events(&mut harness.event_rx).as_slice(),
            [UserEvent::DeleteFailed { message, .. }] if message == "Not authenticated"
        ));
    }

    #[test]
    fn test_delete_failure_message_falls_back() {
        assert_eq!(
            delete_failure_message(&ServiceError::Server {
                status: 500,
                message: String::new()
            }),
            "Delete failed"
        );
        assert_eq!(
            delete_failure_message(&ServiceError::Server {
                status: 404,
                message: "gone".into()
            }),
            "File not found"
        );
    }
}
