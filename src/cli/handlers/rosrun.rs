// src/cli/handlers/rosrun.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::collections::BTreeSet;

use super::commons::{self, FlowOutcome, HandlerFuture};
use crate::{
    cli::{args::RunArgs, session::Session},
    core::packages,
};

/// Picks a package from `rospack list`. `None` when dismissed.
pub async fn choose_package(session: &Session) -> Result<Option<String>> {
    let index = packages::list_packages(session.ctx()).await?;
    let names = index.names();
    let choice = commons::pick(session, t!("prompt.choose_package"), &names, t!("packages.warn.none_found"))?;
    Ok(choice.and_then(|i| names.get(i).cloned()))
}

/// The main handler for the `run` command: `rosrun <package> <executable> [args...]`.
pub fn handle(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(run(session, args))
}

async fn run(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    let run_args = RunArgs::try_parse_from(&args)?;
    let ctx = session.ctx();
    let fully_specified = run_args.package.is_some() && run_args.executable.is_some();

    // 1. Package.
    let package = match run_args.package {
        Some(package) => package,
        None => match choose_package(session).await? {
            Some(package) => package,
            None => return Ok(FlowOutcome::Aborted),
        },
    };

    // 2. Executable, by file name.
    let executable = match run_args.executable {
        Some(executable) => executable,
        None => {
            let names: Vec<String> = packages::executables(ctx, &package)
                .await?
                .iter()
                .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let notice = format!(t!("rosrun.warn.no_executables"), package = package);
            let Some(choice) = commons::pick(session, t!("prompt.choose_executable"), &names, &notice)? else {
                return Ok(FlowOutcome::Aborted);
            };
            names
                .get(choice)
                .cloned()
                .ok_or_else(|| anyhow!(t!("common.error.selection_out_of_range")))?
        }
    };

    // 3. Extra arguments: asked only when something was picked interactively.
    let extra = if fully_specified {
        run_args.args
    } else {
        match commons::ask_extra_args(session)? {
            Some(extra) => extra,
            None => return Ok(FlowOutcome::Aborted),
        }
    };

    // 4. Run attached to the terminal.
    let mut tool_args = vec![package, executable];
    tool_args.extend(extra);
    let invocation = ctx.tool("rosrun", &tool_args, ctx.ros_environment()?);
    println!("{} {}", "$".dimmed(), invocation.command_line());
    ctx.runner().attached(&invocation).await?;
    Ok(FlowOutcome::Completed)
}
