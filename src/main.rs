use anyhow::Result;
use catalog_search::api;
use catalog_search::app::{self, events::UserEvent, AppContext};
use catalog_search::config::{self, AppConfig};
use catalog_search::core::{JsonFileStore, KeyValueStore, MemoryStore};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Reads JSON commands from stdin, one per line, and writes UI events to stdout as
/// JSON lines. Logs go to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {:#}", e);
        AppConfig::default()
    });
    let backend = api::build_backend(&config)?;

    let store: Arc<dyn KeyValueStore> = match config::settings::get_session_file_path() {
        Some(path) => {
            tracing::info!("Session store at {:?}", path);
            Arc::new(JsonFileStore::open(path))
        }
        None => {
            tracing::warn!("No config directory available; the session will not persist.");
            Arc::new(MemoryStore::new())
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UserEvent>();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = event_rx.recv().await {
            let mut line = match serde_json::to_vec(&event) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            line.push(b'\n');
            if let Err(e) = stdout.write_all(&line).await {
                tracing::error!("Failed to write event: {}", e);
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let ctx = AppContext::new(&backend, store, &config, event_tx);
    ctx.start().await;
    tracing::info!("Ready for commands.");

    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        in_flight.retain(|handle| !handle.is_finished());
        if let Some(handle) = app::handle_ipc_message(line, ctx.clone()) {
            in_flight.push(handle);
        }
    }

    tracing::info!("Input closed, waiting for {} pending command(s).", in_flight.len());
    for handle in in_flight {
        if let Err(e) = handle.await {
            tracing::error!("Command task failed: {}", e);
        }
    }

    // Dropping the last sender lets the printer drain and finish.
    drop(ctx);
    if let Err(e) = printer.await {
        tracing::error!("Event writer failed: {}", e);
    }
    Ok(())
}
