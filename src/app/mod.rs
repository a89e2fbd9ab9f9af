//! The application layer: the coordinator, the auth gate and the file actions, wired
//! together behind a JSON IPC surface.

pub mod auth;
pub mod commands;
pub mod coordinator;
pub mod events;
pub mod files;
pub mod helpers;
pub mod proxy;
pub mod state;
pub mod view_model;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use self::auth::AuthGate;
use self::commands::{LoginPayload, UploadPayload};
use self::coordinator::SearchCoordinator;
use self::events::IpcMessage;
use self::files::FileActions;
use self::proxy::EventProxy;
use crate::api::Backend;
use crate::config::AppConfig;
use crate::core::{Category, KeyValueStore, SortField};

/// Everything a command handler needs, constructed once and passed explicitly.
#[derive(Clone)]
pub struct AppContext<P: EventProxy> {
    pub search: SearchCoordinator<P>,
    pub auth: AuthGate<P>,
    pub files: FileActions<P>,
    pub proxy: P,
}

impl<P: EventProxy> AppContext<P> {
    pub fn new(
        backend: &Backend,
        store: Arc<dyn KeyValueStore>,
        config: &AppConfig,
        proxy: P,
    ) -> Self {
        let search = SearchCoordinator::new(
            backend.search.clone(),
            backend.suggest.clone(),
            proxy.clone(),
            config,
        );
        let auth = AuthGate::new(
            backend.auth.clone(),
            store,
            config.session_persistence,
            proxy.clone(),
        );
        let files = FileActions::new(
            backend.files.clone(),
            auth.clone(),
            search.clone(),
            proxy.clone(),
        );
        Self {
            search,
            auth,
            files,
            proxy,
        }
    }

    /// Restores the session and loads the default search.
    pub async fn start(&self) {
        commands::start(self).await;
    }
}

/// A parsed IPC command with its typed payload.
#[derive(Debug)]
pub enum Command {
    LoadDefault,
    Search(Option<String>),
    SetQuery(String),
    Suggest,
    ToggleCategory(Category),
    SetSort(SortField),
    SetPage(u32),
    NextPage,
    PrevPage,
    Login(LoginPayload),
    Logout,
    Upload(UploadPayload),
    Delete(String),
}

fn payload<T: DeserializeOwned>(command: &str, payload: Value) -> Result<T, String> {
    serde_json::from_value(payload)
        .map_err(|e| format!("Invalid payload for '{}': {}", command, e))
}

/// Turns a raw message into a `Command`, validating its payload.
pub fn parse_command(message: IpcMessage) -> Result<Command, String> {
    let IpcMessage { command, payload: raw } = message;
    let parsed = match command.as_str() {
        "loadDefault" => Command::LoadDefault,
        "search" => Command::Search(match raw {
            Value::Null => None,
            Value::String(q) => Some(q),
            Value::Object(mut fields) => match fields.remove("q") {
                None | Some(Value::Null) => None,
                Some(q) => Some(payload(&command, q)?),
            },
            other => return Err(format!("Invalid payload for 'search': {}", other)),
        }),
        "setQuery" => Command::SetQuery(payload(&command, raw)?),
        "suggest" => Command::Suggest,
        "toggleCategory" => Command::ToggleCategory(payload(&command, raw)?),
        "setSort" => Command::SetSort(payload(&command, raw)?),
        "setPage" => Command::SetPage(payload(&command, raw)?),
        "nextPage" => Command::NextPage,
        "prevPage" => Command::PrevPage,
        "login" => Command::Login(payload(&command, raw)?),
        "logout" => Command::Logout,
        "upload" => Command::Upload(payload(&command, raw)?),
        "delete" => Command::Delete(payload(&command, raw)?),
        unknown => return Err(format!("Unknown command received: {}", unknown)),
    };
    Ok(parsed)
}

/// Starts one command and returns the rest of its work.
///
/// Search-view commands change the query state and issue their search before this
/// returns, so consecutive calls land in call order whichever task later drives the
/// futures. Session and file commands do all their work in the returned future.
pub fn dispatch<P: EventProxy>(command: Command, ctx: &AppContext<P>) -> BoxFuture<'static, ()> {
    match command {
        Command::LoadDefault => commands::load_default(ctx).boxed(),
        Command::Search(q) => commands::search(ctx, q).boxed(),
        Command::SetQuery(q) => commands::set_query(ctx, q).boxed(),
        Command::Suggest => commands::suggest(ctx).boxed(),
        Command::ToggleCategory(category) => commands::toggle_category(ctx, category).boxed(),
        Command::SetSort(field) => commands::set_sort(ctx, field).boxed(),
        Command::SetPage(page) => commands::set_page(ctx, page).boxed(),
        Command::NextPage => commands::next_page(ctx).boxed(),
        Command::PrevPage => commands::prev_page(ctx).boxed(),
        Command::Login(login) => {
            let ctx = ctx.clone();
            async move { commands::login(&ctx, login).await }.boxed()
        }
        Command::Logout => {
            let ctx = ctx.clone();
            async move { commands::logout(&ctx).await }.boxed()
        }
        Command::Upload(upload) => {
            let ctx = ctx.clone();
            async move { commands::upload(&ctx, upload).await }.boxed()
        }
        Command::Delete(file_id) => {
            let ctx = ctx.clone();
            async move { commands::delete(&ctx, file_id).await }.boxed()
        }
    }
}

/// The main IPC message handler.
///
/// The command's state changes are applied here, in message order; only the backend
/// work is spawned, so a slow search never blocks the next message and the
/// coordinator keeps the view consistent however the responses interleave.
/// Malformed messages are logged and produce no event.
pub fn handle_ipc_message<P: EventProxy>(
    message: String,
    ctx: AppContext<P>,
) -> Option<JoinHandle<()>> {
    let msg = match serde_json::from_str::<IpcMessage>(&message) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("Failed to parse IPC message: {}", e);
            return None;
        }
    };
    tracing::debug!("IPC command: {}", msg.command);

    match parse_command(msg) {
        Ok(command) => Some(tokio::spawn(dispatch(command, &ctx))),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}
