// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! direnv-bridge server and CLI.
//!
//! Run by an editor plugin, the bridge speaks line-delimited JSON on
//! stdin/stdout. `status` checks a folder from the command line.

#![allow(clippy::print_stdout, reason = "CLI tool needs to output to stdout")]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use direnv_bridge::config::Config;
use direnv_bridge::direnv::{Direnv, DirenvCommand};
use direnv_bridge::env::EnvState;
use direnv_bridge::host::{Inbox, StdioHost, stdio};
use direnv_bridge::server::BridgeServer;
use direnv_bridge::session::WorkspaceFolder;
use direnv_bridge::store::FileStore;
use direnv_bridge::watch::SystemSessionFactory;
use direnv_bridge::workflow::Controller;

/// Command-line arguments for direnv-bridge.
#[derive(Parser, Debug)]
#[command(name = "direnv-bridge")]
#[command(about = "Keeps an editor's environment in sync with direnv")]
#[command(version = env!("DIRENV_BRIDGE_VERSION"))]
struct Args {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace folders. Can be specified multiple times.
    #[arg(short, long, global = true)]
    root: Vec<PathBuf>,

    /// Document focused in the editor at startup.
    #[arg(long)]
    active: Option<PathBuf>,
}

/// Subcommands supported by direnv-bridge.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bridge (default if no subcommand given).
    Serve,

    /// Print whether the first root's rc file is allowed.
    Status,
}

/// Time allowed for the stdin reader to wind down after the loop ends.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Entry point.
///
/// # Errors
///
/// Returns an error if the subcommand fails.
fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(async {
        match args.command {
            None | Some(Command::Serve) => run_server(args).await,
            Some(Command::Status) => run_status(args).await,
        }
    });

    // A pending stdin read would otherwise keep the process alive.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Canonical workspace roots, defaulting to the current directory.
fn resolve_roots(roots: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let raw_roots = if roots.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        roots
    };
    raw_roots
        .into_iter()
        .map(|r| {
            r.canonicalize()
                .with_context(|| format!("Invalid root {}", r.display()))
        })
        .collect()
}

/// Runs the bridge until the editor shuts it down or reloads.
///
/// # Errors
///
/// Returns an error if configuration, roots or state cannot be set up.
async fn run_server(args: Args) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("direnv_bridge=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(args.config.clone())?;
    let roots = resolve_roots(args.root)?;

    let workspace_display = roots
        .iter()
        .map(|r| r.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(", ");

    info!("Starting direnv-bridge {}", env!("DIRENV_BRIDGE_VERSION"));
    info!("Workspace roots: {}", workspace_display);
    info!("direnv command: {}", config.command);

    let store = FileStore::for_workspace(&config.state_dir(), &roots)?;
    info!("Workspace state: {}", store.path().display());

    let (tx, inbox) = Inbox::channel();
    let inbox = Arc::new(inbox);
    let reader = stdio::spawn_reader(tokio::io::stdin(), tx.clone());

    let host = StdioHost::new(tokio::io::stdout(), inbox.clone());
    let factory = SystemSessionFactory::new(config.clone(), tx);

    let mut controller = Controller::new(factory, host, store, EnvState::from_process(), &config);
    let folders: Vec<WorkspaceFolder> = roots.into_iter().map(WorkspaceFolder::new).collect();
    controller.update_folders(&folders, &[]);

    let active = args.active.map(|path| path.canonicalize().unwrap_or(path));
    controller.set_active_document(active);

    let mut server = BridgeServer::new(controller, inbox);
    server.run().await;

    reader.abort();
    Ok(())
}

/// Prints `allowed` or `blocked` for the first root.
///
/// # Errors
///
/// Returns an error if direnv cannot be run or fails.
async fn run_status(args: Args) -> Result<()> {
    let config = Config::load(args.config)?;
    let roots = resolve_roots(args.root)?;
    let folder = roots
        .into_iter()
        .next()
        .context("No workspace root given")?;

    let invoker = DirenvCommand::new(&config.command, folder, &config.rc_file);
    let allowed = invoker
        .is_allowed()
        .await
        .context("Failed to query direnv status")?;

    println!("{}", if allowed { "allowed" } else { "blocked" });
    Ok(())
}
