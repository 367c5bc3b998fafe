// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! User-facing notification text.

use std::fmt::Display;

/// Name shown in every notification.
pub const TOOL_NAME: &str = "direnv";

/// Generic failure display.
#[must_use]
pub fn error(detail: impl Display) -> String {
    format!("{TOOL_NAME} error: {detail}")
}

/// Version display.
#[must_use]
pub fn version(version: &str) -> String {
    format!("{TOOL_NAME} version: {}", version.trim_end())
}

/// Confirmation that the prior environment is back.
#[must_use]
pub fn reverted() -> String {
    format!("{TOOL_NAME}: You are now using the old environment.")
}

/// The rc file loaded.
#[must_use]
pub fn loaded(rc: &str) -> String {
    format!("{TOOL_NAME}: Your {rc} loaded successfully!")
}

/// The rc file is blocked.
#[must_use]
pub fn blocked(rc: &str) -> String {
    format!("{TOOL_NAME}: Your {rc} is blocked! You can view {rc} or allow it directly.")
}

/// The rc file changed on disk.
#[must_use]
pub fn changed(rc: &str) -> String {
    format!("{TOOL_NAME}: Your {rc} has changed. Would you like to allow it?")
}

/// The rc file was deleted.
#[must_use]
pub fn deleted(rc: &str) -> String {
    format!("{TOOL_NAME}: You deleted the {rc}. Would you like to revert to the old environment?")
}

/// The rc file was denied.
#[must_use]
pub fn denied(rc: &str) -> String {
    format!("{TOOL_NAME}: Your {rc} has been denied.")
}
