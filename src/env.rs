// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! The environment the editor should use, and what it looked like before
//! direnv changed it.
//!
//! `EnvState` is owned by the workflow controller rather than living in
//! process globals, so every test can build its own.

use std::collections::BTreeMap;
use std::ffi::OsString;
use tracing::{debug, warn};

/// A full set of environment variables.
pub type Environment = BTreeMap<String, String>;

/// Live environment plus the snapshot needed to revert it.
#[derive(Debug, Default, Clone)]
pub struct EnvState {
    live: Environment,
    /// Value (or absence) of each key before its first unreverted change.
    prior: BTreeMap<String, Option<String>>,
    /// Last value applied from a diff, per key.
    applied: Environment,
}

impl EnvState {
    /// Creates a state whose live environment is `live`.
    #[must_use]
    pub fn new(live: Environment) -> Self {
        Self {
            live,
            prior: BTreeMap::new(),
            applied: Environment::new(),
        }
    }

    /// Creates a state seeded from this process's environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self::from_vars_os(std::env::vars_os())
    }

    /// Creates a state from raw variables, skipping any that are not valid
    /// Unicode.
    #[must_use]
    pub fn from_vars_os<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let live = vars
            .into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    let key = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
                    warn!("Skipping environment variable {key}: not valid Unicode");
                    None
                }
            })
            .collect();
        Self::new(live)
    }

    /// The environment the editor should use.
    #[must_use]
    pub const fn live(&self) -> &Environment {
        &self.live
    }

    /// The captured pre-change values.
    #[must_use]
    pub const fn prior(&self) -> &BTreeMap<String, Option<String>> {
        &self.prior
    }

    /// Applies a diff to the live environment.
    ///
    /// Keys outside `reserved_prefix` whose value differs from the last one
    /// applied have their current live value captured, unless a capture
    /// already exists for that key. Every key of the diff is then written.
    ///
    /// Returns the number of live values that actually changed.
    pub fn apply(&mut self, diff: &Environment, reserved_prefix: &str) -> usize {
        for (key, value) in diff {
            if key.starts_with(reserved_prefix) {
                continue;
            }
            if self.applied.get(key) != Some(value) && !self.prior.contains_key(key) {
                self.prior.insert(key.clone(), self.live.get(key).cloned());
            }
        }

        let mut changed = 0;
        for (key, value) in diff {
            if self.live.get(key) != Some(value) {
                changed += 1;
            }
            self.live.insert(key.clone(), value.clone());
            self.applied.insert(key.clone(), value.clone());
        }

        debug!(
            "Applied {} variable(s), {} changed, {} captured for revert",
            diff.len(),
            changed,
            self.prior.len()
        );
        changed
    }

    /// Restores every captured value and clears the snapshot.
    ///
    /// Returns false (and changes nothing) when there is nothing to restore.
    pub fn revert(&mut self) -> bool {
        if self.prior.is_empty() {
            return false;
        }

        for (key, value) in std::mem::take(&mut self.prior) {
            match value {
                Some(value) => {
                    self.live.insert(key, value);
                }
                None => {
                    self.live.remove(&key);
                }
            }
        }
        self.applied.clear();
        true
    }

    /// Replaces the live environment wholesale.
    pub fn replace(&mut self, live: Environment) {
        self.live = live;
    }
}
