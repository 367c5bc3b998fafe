// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! In-process fakes for unit tests.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::direnv::{Direnv, DirenvError, EnvDiff, FailureKind};
use crate::env::Environment;
use crate::host::{Action, Host, Level};
use crate::session::{RcPattern, SessionFactory, Subscription, WorkspaceFolder};

/// Builds an environment from pairs.
pub fn env(pairs: &[(&str, &str)]) -> Environment {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Scripted outcome of a direnv invocation.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Fail(FailureKind, String),
}

impl<T: Clone> Reply<T> {
    fn resolve(&self) -> Result<T, DirenvError> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Fail(kind, stderr) => Err(DirenvError::Failed {
                kind: *kind,
                code: Some(1),
                stderr: stderr.clone(),
            }),
        }
    }
}

#[derive(Debug)]
struct FakeState {
    version: Reply<String>,
    allow: Reply<String>,
    deny: Reply<String>,
    status: Reply<bool>,
    /// Consumed front to back; the last reply repeats.
    exports: VecDeque<Reply<EnvDiff>>,
    calls: Vec<String>,
    invoked_in: Vec<PathBuf>,
    watches: HashMap<PathBuf, usize>,
    disposes: HashMap<PathBuf, usize>,
    failing: HashSet<PathBuf>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            version: Reply::Ok("2.34.0\n".into()),
            allow: Reply::Ok(String::new()),
            deny: Reply::Ok(String::new()),
            status: Reply::Ok(true),
            exports: VecDeque::new(),
            calls: Vec::new(),
            invoked_in: Vec::new(),
            watches: HashMap::new(),
            disposes: HashMap::new(),
            failing: HashSet::new(),
        }
    }
}

/// Session factory whose invokers and subscriptions share scripted state.
#[derive(Debug, Clone, Default)]
pub struct FakeFactory {
    state: Arc<Mutex<FakeState>>,
}

impl FakeFactory {
    pub fn push_export(&self, reply: Reply<EnvDiff>) {
        self.state.lock().unwrap().exports.push_back(reply);
    }

    pub fn set_allow(&self, reply: Reply<String>) {
        self.state.lock().unwrap().allow = reply;
    }

    pub fn set_deny(&self, reply: Reply<String>) {
        self.state.lock().unwrap().deny = reply;
    }

    pub fn set_version(&self, reply: Reply<String>) {
        self.state.lock().unwrap().version = reply;
    }

    /// Invocations so far, by subcommand.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Folder of each invocation so far.
    pub fn invoked_in(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().invoked_in.clone()
    }

    pub fn fail_watch(&self, folder: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(PathBuf::from(folder));
    }

    pub fn watch_count(&self, folder: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.watches.get(Path::new(folder)).copied().unwrap_or(0)
    }

    pub fn dispose_count(&self, folder: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.disposes.get(Path::new(folder)).copied().unwrap_or(0)
    }
}

impl SessionFactory for FakeFactory {
    type Invoker = FakeDirenv;
    type Subscription = FakeSubscription;

    fn invoker(&self, folder: &WorkspaceFolder) -> FakeDirenv {
        FakeDirenv {
            folder: folder.path().to_path_buf(),
            state: self.state.clone(),
        }
    }

    fn watch(&self, folder: &WorkspaceFolder, _pattern: &RcPattern) -> Result<FakeSubscription> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(folder.path()) {
            bail!("watch limit reached");
        }
        *state.watches.entry(folder.path().to_path_buf()).or_default() += 1;
        Ok(FakeSubscription {
            folder: folder.path().to_path_buf(),
            state: self.state.clone(),
            disposed: false,
        })
    }
}

/// Invoker answering from the factory's script.
#[derive(Debug)]
pub struct FakeDirenv {
    folder: PathBuf,
    state: Arc<Mutex<FakeState>>,
}

impl FakeDirenv {
    fn record(&self, call: &str) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        state.invoked_in.push(self.folder.clone());
    }
}

impl Direnv for FakeDirenv {
    async fn version(&self) -> Result<String, DirenvError> {
        self.record("version");
        self.state.lock().unwrap().version.resolve()
    }

    async fn allow(&self) -> Result<String, DirenvError> {
        self.record("allow");
        self.state.lock().unwrap().allow.resolve()
    }

    async fn deny(&self) -> Result<String, DirenvError> {
        self.record("deny");
        self.state.lock().unwrap().deny.resolve()
    }

    async fn export_json(&self, _env: &Environment) -> Result<EnvDiff, DirenvError> {
        self.record("export");
        let mut state = self.state.lock().unwrap();
        let reply = if state.exports.len() > 1 {
            state.exports.pop_front()
        } else {
            state.exports.front().cloned()
        };
        reply.map_or_else(|| Ok(EnvDiff::new()), |reply| reply.resolve())
    }

    async fn is_allowed(&self) -> Result<bool, DirenvError> {
        self.record("status");
        self.state.lock().unwrap().status.resolve()
    }
}

/// Subscription counting its disposals.
#[derive(Debug)]
pub struct FakeSubscription {
    folder: PathBuf,
    state: Arc<Mutex<FakeState>>,
    disposed: bool,
}

impl Subscription for FakeSubscription {
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        *self
            .state
            .lock()
            .unwrap()
            .disposes
            .entry(self.folder.clone())
            .or_default() += 1;
    }
}

/// Shown notification: level, text, offered actions.
pub type Shown = (Level, String, Vec<Action>);

/// Host recording everything and answering prompts from a queue.
#[derive(Debug, Default)]
pub struct RecordingHost {
    shown: Mutex<Vec<Shown>>,
    choices: Mutex<VecDeque<Option<Action>>>,
    opened: Mutex<Vec<PathBuf>>,
    reloads: Mutex<usize>,
    environments: Mutex<Vec<Environment>>,
}

impl RecordingHost {
    /// Queues the answer to the next prompt that offers actions.
    pub fn choose(&self, choice: Option<Action>) {
        self.choices.lock().unwrap().push_back(choice);
    }

    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }

    pub fn reloads(&self) -> usize {
        *self.reloads.lock().unwrap()
    }

    pub fn environments(&self) -> Vec<Environment> {
        self.environments.lock().unwrap().clone()
    }
}

impl Host for RecordingHost {
    async fn show(&self, level: Level, text: &str, actions: &[Action]) -> Option<Action> {
        self.shown
            .lock()
            .unwrap()
            .push((level, text.to_string(), actions.to_vec()));
        if actions.is_empty() {
            return None;
        }
        self.choices.lock().unwrap().pop_front().flatten()
    }

    async fn open(&self, path: &Path) -> Result<()> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        *self.reloads.lock().unwrap() += 1;
        Ok(())
    }

    async fn environment_changed(&self, env: &Environment) -> Result<()> {
        self.environments.lock().unwrap().push(env.clone());
        Ok(())
    }

    fn reload_requested(&self) -> bool {
        self.reloads() > 0
    }
}
