// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Per-folder sessions.
//!
//! Every workspace folder gets one session: a direnv invoker bound to the
//! folder, the pattern locating its rc file, and a watch subscription on that
//! file. The registry keeps exactly one session per folder and disposes a
//! folder's subscription when the folder leaves the workspace.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::direnv::Direnv;

/// A workspace folder, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceFolder {
    path: PathBuf,
}

impl WorkspaceFolder {
    /// Creates a folder identity from a path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The folder's filesystem path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A change to a folder's rc file reported by its watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcEvent {
    /// The file was created or modified.
    Changed,
    /// The file was removed.
    Deleted,
}

/// Locates a folder's rc file: `<folder>/<file_name>`, at the root only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcPattern {
    folder: PathBuf,
    file_name: String,
}

impl RcPattern {
    /// Creates the pattern for `file_name` at the root of `folder`.
    #[must_use]
    pub fn new(folder: &WorkspaceFolder, file_name: &str) -> Self {
        Self {
            folder: folder.path().to_path_buf(),
            file_name: file_name.to_string(),
        }
    }

    /// The folder the pattern is relative to.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// The path the rc file would have.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }

    /// Returns true if `path` is this folder's rc file.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.parent() == Some(self.folder.as_path())
            && path.file_name().is_some_and(|name| name == self.file_name.as_str())
    }

    /// Searches for the rc file, returning it if it exists.
    #[must_use]
    pub fn find(&self) -> Option<PathBuf> {
        let path = self.path();
        path.is_file().then_some(path)
    }
}

/// A live watch on one folder's rc file.
pub trait Subscription {
    /// Stops delivering events.
    fn dispose(&mut self);
}

/// Builds the per-folder collaborators of a session.
pub trait SessionFactory {
    /// Invoker type bound to a folder.
    type Invoker: Direnv;
    /// Watch subscription type.
    type Subscription: Subscription;

    /// Creates an invoker running in `folder`.
    fn invoker(&self, folder: &WorkspaceFolder) -> Self::Invoker;

    /// Starts watching the file described by `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be established.
    fn watch(&self, folder: &WorkspaceFolder, pattern: &RcPattern) -> Result<Self::Subscription>;
}

/// One workspace folder's session.
pub struct FolderSession<I, W> {
    folder: WorkspaceFolder,
    invoker: I,
    pattern: RcPattern,
    subscription: Option<W>,
}

impl<I, W: Subscription> FolderSession<I, W> {
    /// The folder this session serves.
    #[must_use]
    pub const fn folder(&self) -> &WorkspaceFolder {
        &self.folder
    }

    /// The invoker bound to the folder.
    #[must_use]
    pub const fn invoker(&self) -> &I {
        &self.invoker
    }

    /// The rc file pattern.
    #[must_use]
    pub const fn pattern(&self) -> &RcPattern {
        &self.pattern
    }

    /// Whether a watch subscription is active.
    #[must_use]
    pub const fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    fn dispose(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.dispose();
        }
    }
}

/// All sessions, one per workspace folder.
pub struct SessionRegistry<I, W> {
    rc_file: String,
    sessions: BTreeMap<WorkspaceFolder, FolderSession<I, W>>,
}

impl<I, W: Subscription> SessionRegistry<I, W> {
    /// Creates an empty registry whose sessions watch `rc_file`.
    #[must_use]
    pub fn new(rc_file: &str) -> Self {
        Self {
            rc_file: rc_file.to_string(),
            sessions: BTreeMap::new(),
        }
    }

    /// Applies a workspace folder change.
    ///
    /// Removed folders have their subscription disposed and their session
    /// dropped. Added folders get a new session; folders already registered
    /// are left alone. A folder whose watch cannot start is still registered,
    /// without live reload.
    pub fn update<F>(&mut self, added: &[WorkspaceFolder], removed: &[WorkspaceFolder], factory: &F)
    where
        F: SessionFactory<Invoker = I, Subscription = W>,
    {
        for folder in removed {
            if let Some(mut session) = self.sessions.remove(folder) {
                session.dispose();
                info!("Removed session for {}", session.folder().path().display());
            } else {
                debug!("No session to remove for {}", folder.path().display());
            }
        }

        for folder in added {
            if self.sessions.contains_key(folder) {
                debug!("Session already exists for {}", folder.path().display());
                continue;
            }

            let pattern = RcPattern::new(folder, &self.rc_file);
            let subscription = match factory.watch(folder, &pattern) {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    warn!(
                        "Cannot watch {}: {e}. Changes will not be detected",
                        pattern.path().display()
                    );
                    None
                }
            };

            let session = FolderSession {
                folder: folder.clone(),
                invoker: factory.invoker(folder),
                pattern,
                subscription,
            };
            info!("Added session for {}", folder.path().display());
            self.sessions.insert(folder.clone(), session);
        }
    }

    /// Looks up a folder's session.
    #[must_use]
    pub fn get(&self, folder: &WorkspaceFolder) -> Option<&FolderSession<I, W>> {
        self.sessions.get(folder)
    }

    /// Finds the deepest registered folder containing `path`.
    #[must_use]
    pub fn folder_for_path(&self, path: &Path) -> Option<&WorkspaceFolder> {
        self.sessions
            .keys()
            .filter(|folder| path.starts_with(folder.path()))
            .max_by_key(|folder| folder.path().components().count())
    }

    /// Registered folders, in path order.
    pub fn folders(&self) -> impl Iterator<Item = &WorkspaceFolder> {
        self.sessions.keys()
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
