// src/cli/handlers/roscore.rs

// `status`, `start-core` and `stop-core`: everything that talks to the ROS master.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::time::Duration;

use super::commons::{FlowOutcome, HandlerFuture};
use crate::{
    cli::{
        args::{NoArgs, StatusArgs},
        session::Session,
    },
    core::{
        config,
        master::{MasterClient, Registration},
    },
    state::ContextError,
    system::executor::Invocation,
};

fn master(session: &Session) -> Result<MasterClient> {
    session
        .activation()
        .master()
        .cloned()
        .ok_or_else(|| ContextError::NotSourced.into())
}

/// The one-line master status used by `status` and the interactive menu.
pub fn status_line(online: bool) -> String {
    if online {
        format!("{} {}", t!("core.label.master"), t!("core.status.online").green().bold())
    } else {
        format!("{} {}", t!("core.label.master"), t!("core.status.offline").red().bold())
    }
}

fn print_registrations(title: &str, entries: &[Registration]) {
    println!("\n  {}", title.blue().bold());
    if entries.is_empty() {
        println!("    {}", t!("common.none").dimmed());
        return;
    }
    for entry in entries {
        println!("    {} {}", entry.name.cyan(), format!("[{}]", entry.nodes.join(", ")).dimmed());
    }
}

// --- status ---

/// The main handler for the `status` command.
pub fn handle_status(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(status(session, args))
}

async fn status(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    let status_args = StatusArgs::try_parse_from(&args)?;
    let master = master(session)?;

    if status_args.watch {
        let interval = status_args
            .interval
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or_else(|| config::status_interval(&session.config()));
        return watch(&master, interval).await;
    }

    let online = master.is_online().await;
    println!("{} ({})", status_line(online), master.uri().dimmed());
    if !online {
        return Ok(FlowOutcome::Completed);
    }

    let state = master
        .system_state()
        .await
        .context(t!("core.error.system_state"))?;
    print_registrations(t!("core.label.publishers"), &state.publishers);
    print_registrations(t!("core.label.subscribers"), &state.subscribers);
    print_registrations(t!("core.label.services"), &state.services);
    println!();
    Ok(FlowOutcome::Completed)
}

/// Polls the master and prints a line on every change, until Ctrl+C.
async fn watch(master: &MasterClient, interval: Duration) -> Result<FlowOutcome> {
    println!("{}", format!(t!("core.info.watching"), uri = master.uri()).dimmed());
    watch_until(master, interval, tokio::signal::ctrl_c()).await;
    log::debug!("Status watch stopped.");
    Ok(FlowOutcome::Completed)
}

/// The polling loop behind `watch`. `stop` is polled across iterations, so it
/// also cuts a status check that is still waiting on the master.
async fn watch_until<F: Future>(master: &MasterClient, interval: Duration, stop: F) {
    tokio::pin!(stop);
    let mut last: Option<bool> = None;
    let mut ticker = tokio::time::interval(interval);

    loop {
        let online = tokio::select! {
            _ = &mut stop => return,
            online = async {
                ticker.tick().await;
                master.is_online().await
            } => online,
        };
        if last != Some(online) {
            println!("{}", status_line(online));
            last = Some(online);
        }
    }
}

// --- start-core ---

/// The main handler for the `start-core` command.
pub fn handle_start(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(start(session, args))
}

async fn start(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    NoArgs::try_parse_from(&args)?;
    let ctx = session.ctx();
    let master = master(session)?;

    // 1. Only one master per URI.
    if master.is_online().await {
        println!("{}", format!(t!("core.warn.already_running"), uri = master.uri()).yellow());
        return Ok(FlowOutcome::Aborted);
    }

    // 2. Detach it so it outlives rosdev.
    let invocation = ctx.tool("roscore", &[], ctx.ros_environment()?);
    let pid = ctx.runner().detached(&invocation)?;
    println!("{}", format!(t!("core.success.started"), pid = pid).green());
    Ok(FlowOutcome::Completed)
}

// --- stop-core ---

/// The main handler for the `stop-core` command.
pub fn handle_stop(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(stop(session, args))
}

async fn stop(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    NoArgs::try_parse_from(&args)?;
    let ctx = session.ctx();
    let master = master(session)?;

    // 1. Ask the master who it is.
    let pid = master
        .get_pid()
        .await
        .map_err(|e| anyhow!(t!("core.error.not_running"), uri = master.uri(), reason = e))?;

    // 2. Terminate it the platform's way.
    let (program, kill_args) = ctx.platform().kill_command(pid);
    let invocation = Invocation::new(program, &ctx.workspace().root, ctx.ros_environment()?).args(kill_args);
    ctx.runner().output(&invocation).await?;
    println!("{}", format!(t!("core.success.stopped"), pid = pid).green());
    Ok(FlowOutcome::Completed)
}
