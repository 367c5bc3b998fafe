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

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default external tool binary.
pub const DEFAULT_COMMAND: &str = "direnv";

/// Default configuration file name at each folder root.
pub const DEFAULT_RC_FILE: &str = ".envrc";

/// Default prefix of the tool's own bookkeeping variables.
pub const DEFAULT_RESERVED_PREFIX: &str = "DIRENV_";

/// Bridge settings, merged from defaults, config files and environment.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The direnv binary to run (name on `PATH` or an absolute path)
    #[serde(default = "default_command")]
    pub command: String,

    /// Configuration file watched at each workspace folder root
    #[serde(default = "default_rc_file")]
    pub rc_file: String,

    /// Variables starting with this prefix never enter the revert snapshot
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,

    /// Override for the directory holding persisted workspace state
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_rc_file() -> String {
    DEFAULT_RC_FILE.to_string()
}

fn default_reserved_prefix() -> String {
    DEFAULT_RESERVED_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: default_command(),
            rc_file: default_rc_file(),
            reserved_prefix: default_reserved_prefix(),
            state_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source cannot be read or the
    /// merged result does not deserialize.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // 1. Start with defaults
        builder = builder
            .set_default("command", DEFAULT_COMMAND)?
            .set_default("rc_file", DEFAULT_RC_FILE)?
            .set_default("reserved_prefix", DEFAULT_RESERVED_PREFIX)?;

        // 2. Load from user config directory (~/.config/direnv-bridge/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("direnv-bridge").join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        // 3. Load from explicit file if provided
        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // 4. Load from environment variables (DIRENV_BRIDGE_COMMAND, etc.)
        builder = builder.add_source(config::Environment::with_prefix("DIRENV_BRIDGE"));

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        config.try_deserialize().context("Failed to deserialize configuration")
    }

    /// Directory holding persisted workspace state.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("direnv-bridge")
        })
    }
}
