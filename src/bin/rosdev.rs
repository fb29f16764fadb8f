// src/bin/rosdev.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use rosdev::{
    cli::{Cli, dispatcher, prompt::TerminalPrompter, session::Session},
    core::{config, workspace},
    state::AppContext,
    system::{
        executor::{ProcessError, SystemRunner},
        platform,
    },
    t,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Sets up logging, runs the requested command (or the menu) and turns
/// errors into exit codes: 130 for Ctrl+C, 1 for everything else.
#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()).await {
        if let Some(ProcessError::Interrupted(_)) = e.downcast_ref::<ProcessError>() {
            std::process::exit(130);
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Where workspace detection starts: `-C <dir>` or the current directory.
fn start_dir(requested: Option<PathBuf>) -> Result<PathBuf> {
    let start = match requested {
        Some(dir) => dir,
        None => std::env::current_dir().context(t!("error.current_dir"))?,
    };
    Ok(dunce::canonicalize(&start).unwrap_or(start))
}

async fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    // 1. Detect the workspace once; it never changes during the run.
    let descriptor = workspace::detect(&start_dir(cli.workspace)?);
    log::info!(
        "Workspace: '{}' ({}).",
        descriptor.root.display(),
        descriptor.build_system
    );

    // 2. Wire the context and the session.
    let ctx = AppContext::new(descriptor, Arc::new(SystemRunner), platform::current());
    let session = Session::new(
        ctx,
        Arc::new(TerminalPrompter),
        config::config_path()?,
        cli.distro,
    )?;

    // 3. A command, or the interactive menu.
    if cli.args.is_empty() {
        dispatcher::palette(&session).await
    } else {
        dispatcher::dispatch(&session, cli.args).await.map(|_| ())
    }
}
