// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Durable per-workspace key-value state.
//!
//! The bridge only persists one thing: the live environment, written right
//! before a requested restart and consumed once by the next process. State
//! lives in one JSON file per workspace, keyed by a hash of the workspace
//! roots, and is replaced by atomic rename (`temp file` → `state file`).

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key holding the environment saved before a restart.
pub const PROCESS_ENV_CACHE: &str = "processEnvCache";

/// Key-value storage scoped to one workspace.
pub trait WorkspaceStore {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes a value; `None` clears the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn update(&mut self, key: &str, value: Option<Value>) -> Result<()>;

    /// Reads a value and clears its slot in the same step.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or written.
    fn take(&mut self, key: &str) -> Result<Option<Value>>;
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn update(&mut self, key: &str, value: Option<Value>) -> Result<()> {
        match value {
            Some(value) => self.values.insert(key.to_string(), value),
            None => self.values.remove(key),
        };
        Ok(())
    }

    fn take(&mut self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.remove(key))
    }
}

/// On-disk document for one workspace.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    /// When the document was last written.
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    /// Stored values.
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

/// JSON-file-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Opens the store for the workspace made of `roots`, under `state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspaces directory cannot be created.
    pub fn for_workspace(state_dir: &Path, roots: &[PathBuf]) -> Result<Self> {
        let dir = state_dir.join("workspaces");
        std::fs::create_dir_all(&dir).map_err(|e| {
            anyhow!(
                "Failed to create workspace state directory {}: {e}",
                dir.display()
            )
        })?;
        Ok(Self {
            path: dir.join(format!("{}.json", workspace_id(roots))),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreDocument> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| anyhow!("Corrupt state file {}: {e}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(anyhow!(
                "Failed to read state file {}: {e}",
                self.path.display()
            )),
        }
    }

    /// Atomically writes the document via temp + rename.
    fn write(&self, mut document: StoreDocument) -> Result<()> {
        document.updated_at = Some(Utc::now());
        let bytes =
            serde_json::to_vec_pretty(&document).map_err(|e| anyhow!("JSON serialize: {e}"))?;

        let pid = std::process::id();
        let temp_path = self.path.with_extension(format!("tmp.{pid}"));

        std::fs::write(&temp_path, bytes).map_err(|e| {
            anyhow!(
                "Failed to write temp state file {}: {e}",
                temp_path.display()
            )
        })?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = std::fs::remove_file(&temp_path);
            anyhow!(
                "Failed to rename {} -> {}: {e}",
                temp_path.display(),
                self.path.display()
            )
        })
    }
}

impl WorkspaceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read()?.values.get(key).cloned())
    }

    fn update(&mut self, key: &str, value: Option<Value>) -> Result<()> {
        let mut document = self.read()?;
        match value {
            Some(value) => document.values.insert(key.to_string(), value),
            None => document.values.remove(key),
        };
        self.write(document)
    }

    fn take(&mut self, key: &str) -> Result<Option<Value>> {
        let mut document = self.read()?;
        let value = document.values.remove(key);
        if value.is_some() {
            self.write(document)?;
        }
        Ok(value)
    }
}

/// Stable identifier for a set of workspace roots, independent of order.
fn workspace_id(roots: &[PathBuf]) -> String {
    let mut keys: Vec<String> = roots
        .iter()
        .map(|r| r.to_string_lossy().into_owned())
        .collect();
    keys.sort();
    fnv1a_hash(&keys.join("\n"))
}

/// Computes a deterministic FNV-1a 64-bit hash of a string, returned as 16 hex
/// characters.
fn fnv1a_hash(input: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    let mut hash: u64 = FNV_OFFSET;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{hash:016x}")
}
