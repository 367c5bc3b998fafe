// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Errors produced by direnv invocations.
//!
//! A non-zero exit is reported with direnv's own standard error as the
//! message. The failure kind is decided here, once, so callers can branch on
//! it without inspecting the text again.

use thiserror::Error;

/// What a failed invocation means for the workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The folder has no rc file.
    RcNotFound,
    /// The rc file exists but has not been allowed.
    Blocked,
    /// Anything else.
    Other,
}

impl FailureKind {
    /// Classifies captured standard error for the given rc file name.
    #[must_use]
    pub fn classify(stderr: &str, rc_file: &str) -> Self {
        if stderr.contains(&format!("{rc_file} file not found")) {
            Self::RcNotFound
        } else if stderr.contains(&format!("{rc_file} is blocked")) {
            Self::Blocked
        } else {
            Self::Other
        }
    }
}

/// A failed direnv invocation.
#[derive(Debug, Error)]
pub enum DirenvError {
    /// The process ran and exited unsuccessfully.
    #[error("{stderr}")]
    Failed {
        /// Classification of `stderr`.
        kind: FailureKind,
        /// Exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
        /// Captured standard error, verbatim.
        stderr: String,
    },
    /// The process could not be started or waited on.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// The program that was run.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DirenvError {
    /// Returns the failure kind; spawn errors are always `Other`.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Failed { kind, .. } => *kind,
            Self::Spawn { .. } => FailureKind::Other,
        }
    }
}
