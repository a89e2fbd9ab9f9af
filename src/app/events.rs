//! Defines the event and message structures for communication between the core and the UI.

use serde::{Deserialize, Serialize};

use super::view_model::{SearchView, SessionView};
use crate::core::ErrorKind;

/// Events sent from the application to the UI.
///
/// Serialized as `{"event": "<name>", "payload": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum UserEvent {
    /// A complete search view update to re-render results, filters and pagination.
    SearchUpdate(Box<SearchView>),
    /// A complete session update to re-render the login state.
    SessionUpdate(Box<SessionView>),
    /// An error message to be displayed to the user.
    ShowError(String),
    /// Upload progress in percent, never decreasing within one upload.
    UploadProgress(u8),
    /// The backend's answer to a finished upload.
    UploadComplete(serde_json::Value),
    /// A file was deleted.
    FileDeleted(String),
    /// A delete was rejected; `kind` lets the UI pick a specific message.
    DeleteFailed {
        file_id: String,
        kind: ErrorKind,
        message: String,
    },
}

/// A message received from the UI via the IPC channel.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}
