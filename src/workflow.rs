// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Reconciliation and the allow / deny / revert / view / restart workflows.
//!
//! The [`Controller`] owns every piece of mutable state (sessions, the
//! environment, the store) and each workflow borrows it mutably, so only one
//! workflow runs at a time. A workflow suspends only while direnv runs or
//! while a notification waits for the user.
//!
//! Workflows that lead into one another (allow → reconcile → "Allow" again)
//! go through [`Controller::perform`], a loop over the chosen [`Action`]
//! rather than recursion.

use anyhow::Result;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::direnv::{Direnv, FailureKind};
use crate::env::{EnvState, Environment};
use crate::host::{Action, CommandName, Host, Level};
use crate::messages;
use crate::session::{RcEvent, SessionFactory, SessionRegistry, WorkspaceFolder};
use crate::store::{PROCESS_ENV_CACHE, WorkspaceStore};

/// Internal failures of a workflow. These indicate a broken precondition and
/// are reported to the caller instead of being shown to the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// No workspace folder contains the active document.
    #[error("An internal error occurred while trying to {operation}: no workspace folder for the active document")]
    NoActiveSession {
        /// What was being attempted.
        operation: &'static str,
    },
}

/// Session registry type for a factory.
pub type Registry<F> =
    SessionRegistry<<F as SessionFactory>::Invoker, <F as SessionFactory>::Subscription>;

/// Owns the sessions, the environment and the collaborators every workflow
/// needs.
pub struct Controller<F: SessionFactory, H, S> {
    factory: F,
    host: H,
    store: S,
    registry: Registry<F>,
    env: EnvState,
    active_document: Option<PathBuf>,
    rc_file: String,
    reserved_prefix: String,
}

impl<F, H, S> Controller<F, H, S>
where
    F: SessionFactory,
    H: Host,
    S: WorkspaceStore,
{
    /// Creates a controller with no folders.
    pub fn new(factory: F, host: H, store: S, env: EnvState, config: &Config) -> Self {
        Self {
            factory,
            host,
            store,
            registry: SessionRegistry::new(&config.rc_file),
            env,
            active_document: None,
            rc_file: config.rc_file.clone(),
            reserved_prefix: config.reserved_prefix.clone(),
        }
    }

    /// The environment state.
    pub const fn env(&self) -> &EnvState {
        &self.env
    }

    /// The host.
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// The workspace store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The session registry.
    pub const fn registry(&self) -> &Registry<F> {
        &self.registry
    }

    /// Records the document the user is focused on.
    pub fn set_active_document(&mut self, path: Option<PathBuf>) {
        debug!("Active document: {:?}", path);
        self.active_document = path;
    }

    /// Adds and removes folder sessions.
    pub fn update_folders(&mut self, added: &[WorkspaceFolder], removed: &[WorkspaceFolder]) {
        self.registry.update(added, removed, &self.factory);
    }

    /// Folder of the active document.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoActiveSession`] if there is no active
    /// document or no session contains it.
    pub fn active_folder(&self, operation: &'static str) -> Result<WorkspaceFolder, WorkflowError> {
        self.active_document
            .as_deref()
            .and_then(|path| self.registry.folder_for_path(path))
            .cloned()
            .ok_or(WorkflowError::NoActiveSession { operation })
    }

    /// Startup: restore a cached environment, then load the active folder's
    /// environment without a success notification.
    pub async fn activate(&mut self) {
        if let Err(e) = self.load_cache().await {
            warn!("Failed to restore cached environment: {e}");
        }

        match self.active_folder("load the environment") {
            Ok(folder) => self.reconcile(&folder, false).await,
            Err(e) => info!("Skipping initial load: {e}"),
        }
    }

    /// Restores the environment saved before a restart, consuming it.
    ///
    /// Returns true if an environment was restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or holds something other
    /// than an environment.
    pub async fn load_cache(&mut self) -> Result<bool> {
        let Some(value) = self.store.take(PROCESS_ENV_CACHE)? else {
            return Ok(false);
        };

        let cached: Environment = serde_json::from_value(value)?;
        info!("Restored {} cached variable(s)", cached.len());
        self.env.replace(cached);
        self.publish_environment().await;
        Ok(true)
    }

    /// Runs one of the editor commands.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoActiveSession`] if the command needs a
    /// folder and none can be resolved.
    pub async fn run_command(&mut self, command: CommandName) -> Result<(), WorkflowError> {
        match command {
            CommandName::Restart => self.restart().await,
            CommandName::Version => {
                let folder = self.active_folder("get direnv version")?;
                self.version(&folder).await;
            }
            CommandName::View => {
                let folder = self.active_folder("view the rc file")?;
                self.perform(&folder, Action::View).await;
            }
            CommandName::Allow => {
                let folder = self.active_folder("allow the directory")?;
                self.perform(&folder, Action::Allow).await;
            }
        }
        Ok(())
    }

    /// Shows the direnv version for `folder`.
    pub async fn version(&mut self, folder: &WorkspaceFolder) {
        let Some(session) = self.registry.get(folder) else {
            warn!("No session for {}", folder.path().display());
            return;
        };

        let result = session.invoker().version().await;
        match result {
            Ok(version) => {
                self.host
                    .show(Level::Info, &messages::version(&version), &[])
                    .await;
            }
            Err(e) => self.display_error(&e).await,
        }
    }

    /// Loads `folder`'s environment and acts on the user's answer.
    pub async fn reconcile(&mut self, folder: &WorkspaceFolder, show_success: bool) {
        if let Some(action) = self.reconcile_step(folder, show_success).await {
            self.perform(folder, action).await;
        }
    }

    /// Runs `action` for `folder`, then whatever the user picks next.
    pub async fn perform(&mut self, folder: &WorkspaceFolder, action: Action) {
        let mut next = Some(action);
        while let Some(action) = next.take() {
            debug!("{} for {}", action.label(), folder.path().display());
            next = match action {
                Action::Allow => self.allow_step(folder).await,
                Action::Deny => self.deny_step(folder).await,
                Action::View => {
                    self.view_step(folder).await;
                    None
                }
                Action::Revert => {
                    self.revert().await;
                    None
                }
                Action::Restart => {
                    self.restart().await;
                    None
                }
            };
        }
    }

    /// Reacts to a change of `folder`'s rc file.
    pub async fn on_rc_event(&mut self, folder: &WorkspaceFolder, event: RcEvent) {
        if self.registry.get(folder).is_none() {
            debug!(
                "Ignoring {:?} for unregistered folder {}",
                event,
                folder.path().display()
            );
            return;
        }

        let (text, offer) = match event {
            RcEvent::Changed => (messages::changed(&self.rc_file), Action::Allow),
            RcEvent::Deleted => (messages::deleted(&self.rc_file), Action::Revert),
        };

        if let Some(choice) = self.host.show(Level::Warning, &text, &[offer]).await {
            self.perform(folder, choice).await;
        }
    }

    /// Puts back every value captured before direnv changed it.
    ///
    /// Nothing happens, and nothing is shown, when there is nothing to revert.
    pub async fn revert(&mut self) {
        if !self.env.revert() {
            debug!("Nothing to revert");
            return;
        }

        info!("Reverted to the previous environment");
        self.publish_environment().await;
        self.host
            .show(Level::Info, &messages::reverted(), &[])
            .await;
    }

    /// Saves the live environment and asks the editor to reload.
    pub async fn restart(&mut self) {
        let saved = serde_json::to_value(self.env.live())
            .map_err(anyhow::Error::from)
            .and_then(|value| self.store.update(PROCESS_ENV_CACHE, Some(value)));

        if let Err(e) = saved {
            self.display_error(&e).await;
            return;
        }

        info!("Saved {} variable(s), reloading editor", self.env.live().len());
        if let Err(e) = self.host.reload().await {
            self.display_error(&e).await;
        }
    }

    async fn reconcile_step(
        &mut self,
        folder: &WorkspaceFolder,
        show_success: bool,
    ) -> Option<Action> {
        let Some(session) = self.registry.get(folder) else {
            warn!("No session for {}", folder.path().display());
            return None;
        };

        let exported = session.invoker().export_json(self.env.live()).await;

        match exported {
            Ok(diff) => {
                let changed = self.env.apply(&diff, &self.reserved_prefix);
                info!(
                    "Loaded {} variable(s) for {} ({} changed)",
                    diff.len(),
                    folder.path().display(),
                    changed
                );
                if changed > 0 {
                    self.publish_environment().await;
                }

                if show_success {
                    self.host
                        .show(
                            Level::Info,
                            &messages::loaded(&self.rc_file),
                            &[Action::Restart],
                        )
                        .await
                } else {
                    None
                }
            }
            Err(e) if e.kind() == FailureKind::Blocked => {
                info!("{} is blocked in {}", self.rc_file, folder.path().display());
                self.host
                    .show(
                        Level::Warning,
                        &messages::blocked(&self.rc_file),
                        &[Action::Allow, Action::View],
                    )
                    .await
            }
            Err(e) => {
                self.display_error(&e).await;
                None
            }
        }
    }

    async fn allow_step(&mut self, folder: &WorkspaceFolder) -> Option<Action> {
        let Some(session) = self.registry.get(folder) else {
            warn!("No session for {}", folder.path().display());
            return None;
        };

        let result = session.invoker().allow().await;
        match result {
            Ok(_) => self.reconcile_step(folder, true).await,
            Err(e) if e.kind() == FailureKind::RcNotFound => {
                debug!("direnv found no {} to allow, opening it", self.rc_file);
                if self.view_step(folder).await {
                    self.reconcile_step(folder, true).await
                } else {
                    None
                }
            }
            Err(e) => {
                self.display_error(&e).await;
                None
            }
        }
    }

    async fn deny_step(&mut self, folder: &WorkspaceFolder) -> Option<Action> {
        let Some(session) = self.registry.get(folder) else {
            warn!("No session for {}", folder.path().display());
            return None;
        };

        let result = session.invoker().deny().await;
        match result {
            Ok(_) => {
                self.host
                    .show(Level::Info, &messages::denied(&self.rc_file), &[])
                    .await;
                Some(Action::Revert)
            }
            Err(e) => {
                self.display_error(&e).await;
                None
            }
        }
    }

    /// Opens the rc file. Returns false if there is none or it could not be
    /// opened.
    async fn view_step(&mut self, folder: &WorkspaceFolder) -> bool {
        let Some(rc_path) = self
            .registry
            .get(folder)
            .and_then(|session| session.pattern().find())
        else {
            debug!("No {} in {}", self.rc_file, folder.path().display());
            return false;
        };

        if let Err(e) = self.host.open(&rc_path).await {
            self.display_error(&e).await;
            return false;
        }
        true
    }

    async fn publish_environment(&self) {
        if let Err(e) = self.host.environment_changed(self.env.live()).await {
            error!("Failed to publish environment: {e}");
        }
    }

    async fn display_error(&self, err: &dyn Display) {
        warn!("{}", err.to_string().trim_end());
        self.host
            .show(Level::Error, &messages::error(err), &[])
            .await;
    }
}
