//! Contains all the command handlers that are callable from the frontend via IPC.
//!
//! Each function in this module corresponds to a specific `IpcMessage::command`.
//! A handler applies its search-state changes when called and returns the remaining
//! work as a future. Handlers never return errors to the dispatcher: failures are
//! already reflected in the search or session view, or reported through a dedicated
//! `UserEvent`, so they are only logged here.

use futures::FutureExt;
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::AppContext;
use crate::api::UploadRequest;
use crate::core::{Category, ServiceError, SortField};

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    pub path: PathBuf,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_upload_category")]
    pub category: Category,
    #[serde(default)]
    pub metadata_text: String,
}

fn default_upload_category() -> Category {
    Category::Other
}

fn log_outcome<T>(command: &str, result: Result<T, ServiceError>) {
    if let Err(e) = result {
        tracing::debug!("Command '{}' ended with: {}", command, e);
    }
}

/// Restores the persisted session, then loads the first page of the default search.
pub async fn start<P: EventProxy>(ctx: &AppContext<P>) {
    ctx.auth.init().await;
    load_default(ctx).await;
}

pub fn load_default<P: EventProxy>(
    ctx: &AppContext<P>,
) -> impl Future<Output = ()> + Send + 'static {
    let search = ctx.search.load_default();
    async move { log_outcome("loadDefault", search.await) }
}

/// Submits a search. With a query text the text replaces the current one and the page
/// resets; without one the current query state is searched as is.
pub fn search<P: EventProxy>(
    ctx: &AppContext<P>,
    q: Option<String>,
) -> impl Future<Output = ()> + Send + 'static {
    let search = match q {
        Some(q) => ctx.search.submit_query(&q).left_future(),
        None => ctx.search.search().right_future(),
    };
    async move { log_outcome("search", search.await) }
}

/// Updates the query text and refreshes suggestions for it.
pub fn set_query<P: EventProxy>(
    ctx: &AppContext<P>,
    q: String,
) -> impl Future<Output = ()> + Send + 'static {
    ctx.search.set_query(&q);
    ctx.search.suggest()
}

pub fn suggest<P: EventProxy>(ctx: &AppContext<P>) -> impl Future<Output = ()> + Send + 'static {
    ctx.search.suggest()
}

pub fn toggle_category<P: EventProxy>(
    ctx: &AppContext<P>,
    category: Category,
) -> impl Future<Output = ()> + Send + 'static {
    let search = ctx.search.toggle_category(category);
    async move { log_outcome("toggleCategory", search.await) }
}

pub fn set_sort<P: EventProxy>(
    ctx: &AppContext<P>,
    field: SortField,
) -> impl Future<Output = ()> + Send + 'static {
    let search = ctx.search.set_sort(field);
    async move { log_outcome("setSort", search.await) }
}

pub fn set_page<P: EventProxy>(
    ctx: &AppContext<P>,
    page: u32,
) -> impl Future<Output = ()> + Send + 'static {
    let search = ctx.search.set_page(page);
    async move { log_outcome("setPage", search.await) }
}

pub fn next_page<P: EventProxy>(ctx: &AppContext<P>) -> impl Future<Output = ()> + Send + 'static {
    let search = ctx.search.next_page();
    async move { log_outcome("nextPage", search.await) }
}

pub fn prev_page<P: EventProxy>(ctx: &AppContext<P>) -> impl Future<Output = ()> + Send + 'static {
    let search = ctx.search.prev_page();
    async move { log_outcome("prevPage", search.await) }
}

pub async fn login<P: EventProxy>(ctx: &AppContext<P>, payload: LoginPayload) {
    log_outcome(
        "login",
        ctx.auth
            .login(&payload.email, &payload.password, payload.remember)
            .await,
    );
}

pub async fn logout<P: EventProxy>(ctx: &AppContext<P>) {
    ctx.auth.logout().await;
}

/// Reads the file at `payload.path` and uploads it.
pub async fn upload<P: EventProxy>(ctx: &AppContext<P>, payload: UploadPayload) {
    let content = match tokio::fs::read(&payload.path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to read {:?} for upload: {}", payload.path, e);
            ctx.proxy.send_event(UserEvent::ShowError(format!(
                "Could not read {}: {}",
                payload.path.display(),
                e
            )));
            return;
        }
    };
    let file_name = payload
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let request = UploadRequest {
        file_name,
        content,
        title: payload.title,
        category: payload.category,
        metadata_text: payload.metadata_text,
    };
    log_outcome("upload", ctx.files.upload(request).await);
}

pub async fn delete<P: EventProxy>(ctx: &AppContext<P>, file_id: String) {
    log_outcome("delete", ctx.files.delete(&file_id).await);
}
