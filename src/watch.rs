// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! File watcher for rc files.
//!
//! Each workspace folder is watched non-recursively with the platform's
//! native backend (inotify, FSEvents, ReadDirectoryChangesW). Only events
//! touching the folder's rc file are forwarded to the server loop.

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::direnv::DirenvCommand;
use crate::host::Incoming;
use crate::session::{RcEvent, RcPattern, SessionFactory, Subscription, WorkspaceFolder};

/// Repeated events of the same kind within this window are reported once.
const COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// Watches one folder's rc file.
pub struct RcWatcher {
    /// The underlying notify watcher. Dropping it stops the watch.
    watcher: Option<RecommendedWatcher>,
    folder: PathBuf,
}

impl RcWatcher {
    /// Starts watching `pattern`, sending events for `folder` to `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or the
    /// folder cannot be watched.
    pub fn start(
        folder: &WorkspaceFolder,
        pattern: &RcPattern,
        tx: UnboundedSender<Incoming>,
    ) -> Result<Self> {
        let target = pattern.clone();
        let owner = folder.clone();
        let mut last: Option<(RcEvent, Instant)> = None;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("Watch error for {}: {e}", target.path().display());
                    return;
                }
            };

            let Some(rc_event) = classify(&event, &target) else {
                return;
            };

            let now = Instant::now();
            if let Some((previous, at)) = last
                && previous == rc_event
                && now.duration_since(at) < COALESCE_WINDOW
            {
                return;
            }
            last = Some((rc_event, now));

            debug!("{:?} on {} ({:?})", rc_event, target.path().display(), event.kind);
            let _ = tx.send(Incoming::Rc {
                folder: owner.clone(),
                event: rc_event,
            });
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(pattern.folder(), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", pattern.folder().display()))?;

        info!("Watching {}", pattern.path().display());

        Ok(Self {
            watcher: Some(watcher),
            folder: pattern.folder().to_path_buf(),
        })
    }
}

impl Subscription for RcWatcher {
    fn dispose(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.folder) {
                debug!("Unwatch {} failed: {e}", self.folder.display());
            }
            info!("Stopped watching {}", self.folder.display());
        }
    }
}

/// Maps a raw notify event to an rc file event, if it concerns the rc file.
fn classify(event: &Event, pattern: &RcPattern) -> Option<RcEvent> {
    let touches = || event.paths.iter().any(|p| pattern.matches(p));

    match &event.kind {
        EventKind::Create(_) => touches().then_some(RcEvent::Changed),
        EventKind::Remove(_) => touches().then_some(RcEvent::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            touches().then_some(RcEvent::Deleted)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            if event.paths.get(1).is_some_and(|p| pattern.matches(p)) {
                Some(RcEvent::Changed)
            } else if event.paths.first().is_some_and(|p| pattern.matches(p)) {
                Some(RcEvent::Deleted)
            } else {
                None
            }
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => touches().then_some(RcEvent::Changed),
        _ => None,
    }
}

/// Builds real invokers and watchers from the configuration.
pub struct SystemSessionFactory {
    config: Config,
    tx: UnboundedSender<Incoming>,
}

impl SystemSessionFactory {
    /// Creates a factory whose watchers report to `tx`.
    #[must_use]
    pub const fn new(config: Config, tx: UnboundedSender<Incoming>) -> Self {
        Self { config, tx }
    }
}

impl SessionFactory for SystemSessionFactory {
    type Invoker = DirenvCommand;
    type Subscription = RcWatcher;

    fn invoker(&self, folder: &WorkspaceFolder) -> DirenvCommand {
        DirenvCommand::new(&self.config.command, folder.path(), &self.config.rc_file)
    }

    fn watch(&self, folder: &WorkspaceFolder, pattern: &RcPattern) -> Result<RcWatcher> {
        RcWatcher::start(folder, pattern, self.tx.clone())
    }
}
