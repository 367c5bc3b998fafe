// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! The bridge's main loop.
//!
//! Editor messages and watcher events are handled one at a time, in arrival
//! order. The loop ends when the editor shuts the bridge down, closes its
//! input, or has been asked to reload.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::host::{Host, Inbound, Inbox, Incoming};
use crate::session::{SessionFactory, WorkspaceFolder};
use crate::store::WorkspaceStore;
use crate::workflow::Controller;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The editor sent `shutdown`.
    Shutdown,
    /// The editor's input closed.
    Closed,
    /// A reload was requested; the next process restores the environment.
    Reload,
}

/// Feeds inbound messages to the workflow controller.
pub struct BridgeServer<F: SessionFactory, H, S> {
    controller: Controller<F, H, S>,
    inbox: Arc<Inbox>,
}

impl<F, H, S> BridgeServer<F, H, S>
where
    F: SessionFactory,
    H: Host,
    S: WorkspaceStore,
{
    /// Creates a server reading from `inbox`.
    pub const fn new(controller: Controller<F, H, S>, inbox: Arc<Inbox>) -> Self {
        Self { controller, inbox }
    }

    /// The controller.
    pub const fn controller(&self) -> &Controller<F, H, S> {
        &self.controller
    }

    /// Activates, then serves until shutdown.
    pub async fn run(&mut self) -> Exit {
        info!("Bridge starting, waiting for editor messages on stdin");
        self.controller.activate().await;

        let exit = loop {
            if self.controller.host().reload_requested() {
                break Exit::Reload;
            }

            match self.inbox.next().await {
                Some(Incoming::Editor(Inbound::Shutdown)) => break Exit::Shutdown,
                Some(Incoming::Closed) | None => break Exit::Closed,
                Some(Incoming::Editor(message)) => self.handle(message).await,
                Some(Incoming::Rc { folder, event }) => {
                    self.controller.on_rc_event(&folder, event).await;
                }
            }
        };

        info!("Bridge stopping ({exit:?})");
        exit
    }

    async fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Command { command } => {
                if let Err(e) = self.controller.run_command(command).await {
                    error!("{e}");
                }
            }
            Inbound::Folders { added, removed } => {
                self.controller
                    .update_folders(&to_folders(added), &to_folders(removed));
            }
            Inbound::ActiveDocument { path } => {
                self.controller.set_active_document(path.map(canonical));
            }
            Inbound::Response { id, .. } => {
                debug!("Ignoring response {id}, no notification is waiting");
            }
            Inbound::Shutdown => {}
        }
    }
}

/// Resolves symlinks so paths compare equal to the canonical roots. Paths
/// that no longer exist (a removed folder) are kept as given.
fn canonical(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

fn to_folders(paths: Vec<PathBuf>) -> Vec<WorkspaceFolder> {
    paths
        .into_iter()
        .map(|path| WorkspaceFolder::new(canonical(path)))
        .collect()
}
