// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! The editor as seen by the workflows.
//!
//! Workflows never talk to an editor directly. They show notifications
//! (optionally with choices), ask for files to be opened, request a reload,
//! and publish the environment through a [`Host`].

/// JSON messages exchanged with the editor.
pub mod protocol;
/// [`Host`] over line-delimited JSON on stdin/stdout.
pub mod stdio;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::env::Environment;

pub use protocol::{CommandName, Inbound, Outbound};
pub use stdio::{Inbox, Incoming, StdioHost};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
}

/// A choice offered with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Allow the rc file.
    Allow,
    /// Deny the rc file.
    Deny,
    /// Go back to the environment before direnv changed it.
    Revert,
    /// Open the rc file.
    View,
    /// Restart the editor with the current environment.
    #[serde(rename = "Restart Editor")]
    Restart,
}

impl Action {
    /// Label shown to the user.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
            Self::Revert => "Revert",
            Self::View => "View",
            Self::Restart => "Restart Editor",
        }
    }
}

/// Editor operations the workflows need.
#[allow(
    async_fn_in_trait,
    reason = "Workflows drive the host on a single task; no Send bound is needed"
)]
pub trait Host {
    /// Shows a notification and, if `actions` is non-empty, waits for the
    /// user's choice. Dismissal resolves to `None`.
    async fn show(&self, level: Level, text: &str, actions: &[Action]) -> Option<Action>;

    /// Opens a file in the editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered.
    async fn open(&self, path: &Path) -> Result<()>;

    /// Asks the editor to reload itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered.
    async fn reload(&self) -> Result<()>;

    /// Publishes the full environment the editor should use.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be delivered.
    async fn environment_changed(&self, env: &Environment) -> Result<()>;

    /// Whether a reload has been delivered. The bridge stops once it has.
    fn reload_requested(&self) -> bool;
}
