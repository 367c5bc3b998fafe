// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! [`Host`] implementation over line-delimited JSON.
//!
//! Outbound messages are written to stdout, one per line. Inbound editor
//! messages and watcher events share one channel. While a notification waits
//! for its response, anything else that arrives is queued and handed back to
//! the server loop afterwards, so one workflow runs to completion before the
//! next starts.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, trace, warn};

use super::protocol::{Inbound, Outbound};
use super::{Action, Host, Level};
use crate::env::Environment;
use crate::session::{RcEvent, WorkspaceFolder};

/// Everything the server loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A message from the editor.
    Editor(Inbound),
    /// A watched rc file changed.
    Rc {
        /// Folder whose rc file changed.
        folder: WorkspaceFolder,
        /// What happened.
        event: RcEvent,
    },
    /// The editor closed its end of the connection.
    Closed,
}

/// Receiving side of the inbound channel, with a backlog for messages that
/// arrive while a response is awaited.
pub struct Inbox {
    rx: Mutex<UnboundedReceiver<Incoming>>,
    backlog: Mutex<VecDeque<Incoming>>,
}

impl Inbox {
    /// Creates the inbound channel.
    #[must_use]
    pub fn channel() -> (UnboundedSender<Incoming>, Self) {
        let (tx, rx) = unbounded_channel();
        let inbox = Self {
            rx: Mutex::new(rx),
            backlog: Mutex::new(VecDeque::new()),
        };
        (tx, inbox)
    }

    /// Next message, backlog first. `None` once every sender is gone.
    pub async fn next(&self) -> Option<Incoming> {
        if let Some(message) = self.backlog.lock().await.pop_front() {
            return Some(message);
        }
        self.rx.lock().await.recv().await
    }

    /// Waits for the response to notification `id`.
    ///
    /// Returns `None` if the editor went away first.
    async fn response(&self, id: u64) -> Option<Option<Action>> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Some(Incoming::Editor(Inbound::Response { id: got, choice })) if got == id => {
                    return Some(choice);
                }
                Some(Incoming::Editor(Inbound::Response { id: got, .. })) => {
                    warn!("Ignoring response to notification {got}, waiting for {id}");
                }
                Some(Incoming::Closed) | None => {
                    self.backlog.lock().await.push_back(Incoming::Closed);
                    return None;
                }
                Some(other) => {
                    trace!("Queued while awaiting response {id}: {other:?}");
                    self.backlog.lock().await.push_back(other);
                }
            }
        }
    }
}

/// Reads editor messages from `reader` until EOF.
///
/// Malformed lines, including ones that are not UTF-8, are logged and
/// skipped. EOF or a read error is reported as [`Incoming::Closed`].
pub fn spawn_reader<R>(reader: R, tx: UnboundedSender<Incoming>) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if line.trim_ascii().is_empty() {
                        continue;
                    }
                    trace!("Received: {}", String::from_utf8_lossy(&line).trim_end());
                    match serde_json::from_slice::<Inbound>(&line) {
                        Ok(message) => {
                            if tx.send(Incoming::Editor(message)).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("Ignoring malformed message: {e}"),
                    }
                }
                Err(e) => {
                    warn!("Failed to read from editor: {e}");
                    break;
                }
            }
        }
        debug!("Editor input closed");
        let _ = tx.send(Incoming::Closed);
    })
}

/// [`Host`] speaking line-delimited JSON.
pub struct StdioHost<W> {
    writer: Mutex<W>,
    inbox: Arc<Inbox>,
    next_id: AtomicU64,
    reload_requested: AtomicBool,
}

impl<W: AsyncWrite + Unpin> StdioHost<W> {
    /// Creates a host writing to `writer` and reading responses from `inbox`.
    pub fn new(writer: W, inbox: Arc<Inbox>) -> Self {
        Self {
            writer: Mutex::new(writer),
            inbox,
            next_id: AtomicU64::new(0),
            reload_requested: AtomicBool::new(false),
        }
    }

    /// Consumes the host, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    async fn send(&self, message: &Outbound) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        trace!("Sending: {}", line);
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write to editor")?;
        writer.flush().await.context("Failed to flush editor output")
    }
}

impl<W: AsyncWrite + Unpin> Host for StdioHost<W> {
    async fn show(&self, level: Level, text: &str, actions: &[Action]) -> Option<Action> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let message = Outbound::Message {
            id,
            level,
            text: text.to_string(),
            actions: actions.to_vec(),
        };

        if let Err(e) = self.send(&message).await {
            warn!("Failed to show notification: {e}");
            return None;
        }

        if actions.is_empty() {
            return None;
        }

        match self.inbox.response(id).await.flatten() {
            Some(choice) if actions.contains(&choice) => Some(choice),
            Some(choice) => {
                warn!("Ignoring choice {:?}, not offered", choice.label());
                None
            }
            None => None,
        }
    }

    async fn open(&self, path: &Path) -> Result<()> {
        self.send(&Outbound::Open {
            path: path.to_path_buf(),
        })
        .await
    }

    async fn reload(&self) -> Result<()> {
        self.send(&Outbound::Reload).await?;
        self.reload_requested.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn environment_changed(&self, env: &Environment) -> Result<()> {
        self.send(&Outbound::Environment { vars: env.clone() })
            .await
    }

    fn reload_requested(&self) -> bool {
        self.reload_requested.load(Ordering::SeqCst)
    }
}
