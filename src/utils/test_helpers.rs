//! Shared scaffolding for unit and integration tests.

use serde_json::{json, Value};
use std::io;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::app::events::UserEvent;
use crate::app::proxy::EventProxy;
use crate::app::view_model::{SearchView, SessionView};
use crate::core::Category;

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// Wrapped in a `Once` so the global subscriber is set exactly one time, even when
/// tests are run in parallel.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Log output captured by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Captures everything logged on the current thread until the guard is dropped.
///
/// Scoped rather than global, so it coexists with `setup_test_logging`. Only reliable
/// on the current-thread runtime `#[tokio::test]` uses by default.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

/// A test double for the UI channel. Panics if the receiver was dropped, as that
/// indicates a test setup error.
#[derive(Clone)]
pub struct TestEventProxy {
    pub sender: mpsc::UnboundedSender<UserEvent>,
}

impl EventProxy for TestEventProxy {
    fn send_event(&self, event: UserEvent) {
        if let Err(e) = self.sender.send(event) {
            panic!("Test receiver dropped: {}", e);
        }
    }
}

pub fn event_channel() -> (TestEventProxy, mpsc::UnboundedReceiver<UserEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (TestEventProxy { sender }, receiver)
}

/// Waits briefly for the next event.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<UserEvent>) -> Option<UserEvent> {
    tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Collects every event already queued, without waiting.
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<UserEvent>) -> Vec<UserEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// The last queued search update, if any.
pub fn last_search_update(rx: &mut mpsc::UnboundedReceiver<UserEvent>) -> Option<SearchView> {
    drain_events(rx).into_iter().rev().find_map(|event| match event {
        UserEvent::SearchUpdate(view) => Some(*view),
        _ => None,
    })
}

/// The last queued session update, if any.
pub fn last_session_update(rx: &mut mpsc::UnboundedReceiver<UserEvent>) -> Option<SessionView> {
    drain_events(rx).into_iter().rev().find_map(|event| match event {
        UserEvent::SessionUpdate(view) => Some(*view),
        _ => None,
    })
}

/// A raw backend record in camelCase with a relative download URL.
pub fn raw_record(id: &str, title: &str, category: Category) -> Value {
    json!({
        "id": id,
        "title": title,
        "filename": format!("{}.bin", id),
        "category": category.as_str(),
        "uploadedAt": "2024-05-01T12:00:00Z",
        "uploadedBy": "Alice Johnson",
        "fileSize": 1024,
        "metadataText": format!("Metadata for {}", title),
        "downloadUrl": format!("/api/files/download/{}", id)
    })
}
