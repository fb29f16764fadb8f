// src/cli/handlers/env.rs

// Read-only queries: `env`, `packages` and `include-dirs`.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use super::commons::{FlowOutcome, HandlerFuture};
use crate::{
    cli::{
        args::{EnvArgs, NoArgs},
        session::Session,
    },
    core::packages,
    models::EnvironmentMapping,
};

// --- env ---

/// The main handler for the `env` command.
pub fn handle_env(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(env(session, args))
}

/// `NAME=VALUE` lines, in the order the setup script produced them.
fn render_plain(env: &EnvironmentMapping) -> String {
    env.iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn env(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    let env_args = EnvArgs::try_parse_from(&args)?;
    let env = session.ctx().ros_environment()?;

    if env_args.json {
        let json = serde_json::to_string_pretty(env.as_ref()).context(t!("env.error.serialize"))?;
        println!("{}", json);
    } else {
        println!("{}", render_plain(&env));
    }
    Ok(FlowOutcome::Completed)
}

// --- packages ---

/// The main handler for the `packages` command.
pub fn handle_packages(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(list_packages(session, args))
}

async fn list_packages(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    NoArgs::try_parse_from(&args)?;
    let index = packages::list_packages(session.ctx()).await?;

    if index.is_empty() {
        println!("{}", t!("packages.warn.none_found").yellow());
        return Ok(FlowOutcome::Completed);
    }

    let width = index.names().iter().map(String::len).max().unwrap_or_default();
    for (name, path) in index.entries() {
        println!("  {:<width$}  {}", name.cyan(), path.display().to_string().dimmed(), width = width);
    }
    println!("\n{}", format!(t!("packages.info.count"), count = index.len()).dimmed());
    Ok(FlowOutcome::Completed)
}

// --- include-dirs ---

/// The main handler for the `include-dirs` command.
pub fn handle_include_dirs(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(include_dirs(session, args))
}

async fn include_dirs(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    NoArgs::try_parse_from(&args)?;
    for dir in packages::include_dirs(session.ctx()).await? {
        println!("{}", dir);
    }
    Ok(FlowOutcome::Completed)
}
