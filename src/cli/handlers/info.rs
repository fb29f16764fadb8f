// src/cli/handlers/info.rs

use anyhow::Result;
use clap::Parser;
use colored::*;

use super::commons::{FlowOutcome, HandlerFuture};
use crate::cli::{args::NoArgs, session::Session};

/// The main handler for the `info` command.
/// Shows the detected workspace, the configuration and what is sourced right now.
pub fn handle(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(run(session, args))
}

/// Label/value rows in display order. Missing values are `None`.
fn rows(session: &Session) -> Vec<(&'static str, Option<String>)> {
    let ctx = session.ctx();
    let workspace = ctx.workspace();
    let config = session.effective_config();
    let env = ctx.environment();

    vec![
        (t!("info.label.root"), Some(workspace.root.display().to_string())),
        (t!("info.label.build_system"), Some(workspace.build_system.to_string())),
        (t!("info.label.config_file"), Some(session.config_path().display().to_string())),
        (t!("info.label.distro"), config.distro),
        (t!("info.label.ros_distro"), env.as_ref().and_then(|e| e.distro().map(str::to_string))),
        (t!("info.label.master_uri"), env.as_ref().map(|e| e.master_uri().to_string())),
    ]
}

async fn run(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    NoArgs::try_parse_from(&args)?;

    println!("\n--- {} ---", t!("info.header").yellow());
    for (label, value) in rows(session) {
        match value {
            Some(value) => println!("  {:<15} {}", label.blue(), value),
            None => println!("  {:<15} {}", label.blue(), t!("common.none").dimmed()),
        }
    }
    println!("---------------------------------");
    Ok(FlowOutcome::Completed)
}
