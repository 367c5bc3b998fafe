/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! direnv invocation bound to a workspace folder.
//!
//! Commands are executed directly (not via a shell) with stdout and stderr
//! captured. The caller is suspended until the process exits; there is no
//! timeout.

use std::path::PathBuf;
use std::process::Stdio;
use tracing::debug;

use super::error::{DirenvError, FailureKind};
use super::parse::{EnvDiff, parse_export, parse_status};
use crate::env::Environment;

/// Working directory for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cwd {
    /// Run inside the bound folder.
    Folder,
    /// Run in the bridge's own working directory.
    Inherit,
}

/// The direnv operations the workflows rely on.
#[allow(
    async_fn_in_trait,
    reason = "Workflows drive invokers on a single task; no Send bound is needed"
)]
pub trait Direnv {
    /// Runs `direnv version`.
    ///
    /// # Errors
    ///
    /// Returns the invocation failure.
    async fn version(&self) -> Result<String, DirenvError>;

    /// Runs `direnv allow`.
    ///
    /// # Errors
    ///
    /// Returns the invocation failure.
    async fn allow(&self) -> Result<String, DirenvError>;

    /// Runs `direnv deny`.
    ///
    /// # Errors
    ///
    /// Returns the invocation failure.
    async fn deny(&self) -> Result<String, DirenvError>;

    /// Runs `direnv export json` against `env` and parses the diff.
    ///
    /// # Errors
    ///
    /// Returns the invocation failure. Unparseable output is not an error.
    async fn export_json(&self, env: &Environment) -> Result<EnvDiff, DirenvError>;

    /// Runs `direnv status` and reports whether the rc file is allowed.
    ///
    /// # Errors
    ///
    /// Returns the invocation failure.
    async fn is_allowed(&self) -> Result<bool, DirenvError>;
}

/// Runs the real direnv binary.
#[derive(Debug, Clone)]
pub struct DirenvCommand {
    program: String,
    folder: PathBuf,
    rc_file: String,
}

impl DirenvCommand {
    /// Creates an invoker for `folder`.
    ///
    /// `rc_file` is used to classify failures.
    #[must_use]
    pub fn new(program: impl Into<String>, folder: impl Into<PathBuf>, rc_file: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            folder: folder.into(),
            rc_file: rc_file.into(),
        }
    }

    /// Runs direnv with `args` and returns its standard output.
    ///
    /// When `env` is given the child sees exactly that environment; otherwise
    /// it inherits the bridge's.
    ///
    /// # Errors
    ///
    /// Returns [`DirenvError::Failed`] carrying the captured standard error
    /// on a non-zero exit, or [`DirenvError::Spawn`] if the process could not
    /// be run.
    pub async fn exec(
        &self,
        args: &[&str],
        cwd: Cwd,
        env: Option<&Environment>,
    ) -> Result<String, DirenvError> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if cwd == Cwd::Folder {
            command.current_dir(&self.folder);
        }

        if let Some(env) = env {
            command.env_clear().envs(env);
        }

        debug!("Executing: {} {:?} in {:?}", self.program, args, cwd);

        let output = command.output().await.map_err(|source| DirenvError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            debug!(
                "{} {:?} exited with {:?}: {}",
                self.program,
                args,
                output.status.code(),
                stderr.trim_end()
            );
            Err(DirenvError::Failed {
                kind: FailureKind::classify(&stderr, &self.rc_file),
                code: output.status.code(),
                stderr,
            })
        }
    }
}

impl Direnv for DirenvCommand {
    async fn version(&self) -> Result<String, DirenvError> {
        self.exec(&["version"], Cwd::Folder, None).await
    }

    async fn allow(&self) -> Result<String, DirenvError> {
        self.exec(&["allow"], Cwd::Folder, None).await
    }

    async fn deny(&self) -> Result<String, DirenvError> {
        self.exec(&["deny"], Cwd::Folder, None).await
    }

    async fn export_json(&self, env: &Environment) -> Result<EnvDiff, DirenvError> {
        let output = self.exec(&["export", "json"], Cwd::Folder, Some(env)).await?;
        Ok(parse_export(&output))
    }

    async fn is_allowed(&self) -> Result<bool, DirenvError> {
        let output = self.exec(&["status"], Cwd::Folder, None).await?;
        Ok(parse_status(&output))
    }
}
