// src/cli/handlers/terminal.rs

use anyhow::Result;
use clap::Parser;

use super::commons::{FlowOutcome, HandlerFuture};
use crate::{
    cli::{args::NoArgs, session::Session},
    system::shell,
};

/// The main handler for the `terminal` command.
/// Opens an interactive shell carrying the sourced ROS environment.
pub fn handle(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(run(session, args))
}

async fn run(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    NoArgs::try_parse_from(&args)?;
    shell::launch_session(session.ctx()).await?;
    Ok(FlowOutcome::Completed)
}
