// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! direnv-bridge keeps an editor's environment in sync with direnv.
//!
//! Each workspace folder gets its own direnv invoker and `.envrc` watcher.
//! The bridge applies direnv's diffs to the environment the editor hands to
//! terminals and tasks, remembers what it overwrote so the change can be
//! reverted, and carries the environment across an editor restart.

/// Configuration loading and defaults.
pub mod config;
/// Running direnv and interpreting its output.
pub mod direnv;
/// The live environment and its revert snapshot.
pub mod env;
/// The editor seam and its stdio implementation.
pub mod host;
/// Notification text.
pub mod messages;
/// The main event loop.
pub mod server;
/// Per-folder sessions and the session registry.
pub mod session;
/// Per-workspace persisted state.
pub mod store;
/// `.envrc` file watching.
pub mod watch;
/// Reconciliation and the user-facing workflows.
pub mod workflow;

#[cfg(test)]
mod testing;
