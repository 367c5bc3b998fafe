// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Runs the direnv binary for one workspace folder.
pub mod command;
/// Invocation failures and their classification.
pub mod error;
/// Parsers for `export json` and `status` output.
pub mod parse;

pub use command::{Cwd, Direnv, DirenvCommand};
pub use error::{DirenvError, FailureKind};
pub use parse::{EnvDiff, parse_export, parse_status};
