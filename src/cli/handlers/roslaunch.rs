// src/cli/handlers/roslaunch.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::{
    commons::{self, FlowOutcome, HandlerFuture},
    rosrun::choose_package,
};
use crate::{
    cli::{args::LaunchArgs, session::Session},
    core::packages,
};

/// Resolves a launch file given on the command line against the package's launch files.
///
/// Accepts an existing path, a file name, or a path suffix such as `launch/sim.launch`.
fn resolve_launch_file(requested: &str, candidates: &[PathBuf]) -> Result<PathBuf> {
    let direct = Path::new(requested);
    if direct.is_absolute() && direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let matches: Vec<&PathBuf> = candidates
        .iter()
        .filter(|path| path.file_name().is_some_and(|n| n == requested) || path.ends_with(requested))
        .collect();
    match matches.as_slice() {
        [single] => Ok((*single).clone()),
        [] => Err(anyhow!(t!("roslaunch.error.not_found"), file = requested)),
        _ => Err(anyhow!(t!("roslaunch.error.ambiguous"), file = requested, count = matches.len())),
    }
}

/// The main handler for the `launch` command: `roslaunch <file> [args...]`.
pub fn handle(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(run(session, args))
}

async fn run(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    let launch_args = LaunchArgs::try_parse_from(&args)?;
    let ctx = session.ctx();
    let fully_specified = launch_args.package.is_some() && launch_args.launch_file.is_some();

    // 1. Package.
    let package = match launch_args.package {
        Some(package) => package,
        None => match choose_package(session).await? {
            Some(package) => package,
            None => return Ok(FlowOutcome::Aborted),
        },
    };

    // 2. Launch file. The pick shows names, the command gets the full path.
    let candidates = packages::launch_files(ctx, &package).await?;
    let launch_file = match launch_args.launch_file {
        Some(requested) => resolve_launch_file(&requested, &candidates)?,
        None => {
            let labels = commons::file_labels(&candidates);
            let notice = format!(t!("roslaunch.warn.no_launch_files"), package = package);
            let Some(choice) = commons::pick(session, t!("prompt.choose_launch_file"), &labels, &notice)? else {
                return Ok(FlowOutcome::Aborted);
            };
            candidates
                .get(choice)
                .cloned()
                .ok_or_else(|| anyhow!(t!("common.error.selection_out_of_range")))?
        }
    };

    // 3. Extra arguments.
    let extra = if fully_specified {
        launch_args.args
    } else {
        match commons::ask_extra_args(session)? {
            Some(extra) => extra,
            None => return Ok(FlowOutcome::Aborted),
        }
    };

    // 4. Launch attached to the terminal.
    let mut tool_args = vec![launch_file.display().to_string()];
    tool_args.extend(extra);
    let invocation = ctx.tool("roslaunch", &tool_args, ctx.ros_environment()?);
    println!("{} {}", "$".dimmed(), invocation.command_line());
    ctx.runner().attached(&invocation).await?;
    Ok(FlowOutcome::Completed)
}
