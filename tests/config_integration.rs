// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![cfg(unix)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for configuration loading and merging.
//!
//! Verifies that settings come from files and environment variables in the
//! right priority order.

use anyhow::{Context, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use direnv_bridge::config::Config;

fn write_config(dir: &Path, table: &toml::Table) -> Result<PathBuf> {
    let path = dir.join("config.toml");
    std::fs::write(&path, toml::to_string(table)?)?;
    Ok(path)
}

fn install_fake_direnv(dir: &Path) -> Result<PathBuf> {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/assets/fake-direnv.sh");
    let target = dir.join("direnv");
    std::fs::copy(&source, &target).context("Failed to copy fake direnv")?;
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))?;
    Ok(target)
}

fn status(config: &Path, root: &Path, isolate: &Path, env: &[(&str, &str)]) -> Result<Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_direnv-bridge"));
    cmd.arg("status")
        .arg("--config")
        .arg(config)
        .arg("--root")
        .arg(root)
        // Isolate from user-level config
        .env("XDG_CONFIG_HOME", isolate)
        .env_remove("DIRENV_BRIDGE_COMMAND");
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().context("Failed to run direnv-bridge status")
}

#[test]
fn test_explicit_file_overrides_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut table = toml::Table::new();
    table.insert("rc_file".into(), ".env.local".into());
    table.insert("reserved_prefix".into(), "MYTOOL_".into());
    table.insert("state_dir".into(), "/var/tmp/bridge-state".into());
    let path = write_config(dir.path(), &table)?;

    let config = Config::load(Some(path))?;
    assert_eq!(config.rc_file, ".env.local");
    assert_eq!(config.reserved_prefix, "MYTOOL_");
    assert_eq!(config.state_dir(), PathBuf::from("/var/tmp/bridge-state"));
    Ok(())
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let result = Config::load(Some(PathBuf::from("/nonexistent/direnv-bridge.toml")));
    assert!(result.is_err());
}

#[test]
fn test_command_from_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let folder = tempfile::tempdir()?;
    let direnv = install_fake_direnv(dir.path())?;
    std::fs::write(folder.path().join(".envrc"), "export FOO=bar\n")?;

    let mut table = toml::Table::new();
    table.insert("command".into(), direnv.to_string_lossy().into_owned().into());
    let config = write_config(dir.path(), &table)?;

    let output = status(&config, folder.path(), dir.path(), &[])?;
    assert!(output.status.success(), "status failed: {output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "blocked");
    Ok(())
}

#[test]
fn test_environment_overrides_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let folder = tempfile::tempdir()?;
    let direnv = install_fake_direnv(dir.path())?;

    let mut table = toml::Table::new();
    table.insert("command".into(), direnv.to_string_lossy().into_owned().into());
    let config = write_config(dir.path(), &table)?;

    let output = status(
        &config,
        folder.path(),
        dir.path(),
        &[("DIRENV_BRIDGE_COMMAND", "/nonexistent/direnv")],
    )?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/direnv"));
    Ok(())
}
