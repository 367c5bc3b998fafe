// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Line-delimited JSON messages between the bridge and the editor.
//!
//! Every message is one JSON object on its own line, tagged by `type`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Action, Level};
use crate::env::Environment;

/// Commands the editor can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    /// Show the direnv version.
    Version,
    /// Open the active folder's rc file.
    View,
    /// Allow the active folder's rc file.
    Allow,
    /// Save the environment and restart the editor.
    Restart,
}

/// Messages from the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Run a command.
    Command {
        /// Which command.
        command: CommandName,
    },
    /// Workspace folders were added or removed.
    Folders {
        /// Folders that joined the workspace.
        #[serde(default)]
        added: Vec<PathBuf>,
        /// Folders that left the workspace.
        #[serde(default)]
        removed: Vec<PathBuf>,
    },
    /// The focused document changed.
    ActiveDocument {
        /// Path of the document, or `None` when nothing file-backed is focused.
        path: Option<PathBuf>,
    },
    /// Answer to a notification with choices.
    Response {
        /// Id of the notification being answered.
        id: u64,
        /// The chosen action, or `None` if dismissed.
        #[serde(default)]
        choice: Option<Action>,
    },
    /// Stop the bridge.
    Shutdown,
}

/// Messages to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// A notification; non-empty `actions` expects a `response`.
    Message {
        /// Notification id, echoed by the response.
        id: u64,
        /// Severity.
        level: Level,
        /// Text to show.
        text: String,
        /// Choices offered.
        actions: Vec<Action>,
    },
    /// Open a file.
    Open {
        /// File to open.
        path: PathBuf,
    },
    /// The full environment terminals, debuggers and tasks should inherit.
    Environment {
        /// Variables.
        vars: Environment,
    },
    /// Reload the editor.
    Reload,
}
