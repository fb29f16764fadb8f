// src/system/shell.rs

use crate::{
    constants::WORKSPACE_ENV,
    models::EnvironmentMapping,
    state::{AppContext, ContextError},
    system::executor::{Invocation, ProcessError},
};
use colored::Colorize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("{}", nested_message(.0))]
    Nested(String),
    #[error(transparent)]
    Environment(#[from] ContextError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

fn nested_message(workspace: &str) -> String {
    format!(t!("terminal.error.nested"), workspace = workspace)
}

/// Fails when `marker` (the value of `ROSDEV_WORKSPACE` in the calling
/// process) says we are already inside a rosdev terminal.
pub fn refuse_nesting(marker: Option<String>) -> Result<(), ShellError> {
    match marker.filter(|m| !m.trim().is_empty()) {
        Some(workspace) => Err(ShellError::Nested(workspace)),
        None => Ok(()),
    }
}

/// The interactive shell invocation: the sourced environment plus
/// `ROSDEV_WORKSPACE`, started in the workspace root.
pub fn session_invocation(ctx: &AppContext, env: &EnvironmentMapping) -> Invocation {
    let root = &ctx.workspace().root;
    let mut session_env = env.clone();
    session_env.insert(WORKSPACE_ENV, root.display().to_string());

    let (program, args) = ctx.platform().terminal_command();
    Invocation::new(program, root, Arc::new(session_env)).args(args)
}

/// Opens a sourced interactive shell and waits until the user leaves it.
pub async fn launch_session(ctx: &AppContext) -> Result<(), ShellError> {
    // 1. One session at a time.
    refuse_nesting(std::env::var(WORKSPACE_ENV).ok())?;

    // 2. Needs a sourced ROS environment.
    let env = ctx.ros_environment()?;
    let invocation = session_invocation(ctx, &env);
    log::debug!("Opening terminal: {}", invocation.command_line());

    // 3. Hand the terminal over to the child.
    let root = ctx.workspace().root.display().to_string();
    println!(
        "\n--- {} ---",
        format!(t!("terminal.info.started"), root = root.yellow().bold()).green()
    );
    println!("{}", t!("terminal.info.exit_hint").dimmed());

    match ctx.runner().attached(&invocation).await {
        Ok(()) => {}
        // The last command typed in the shell decides its exit code.
        Err(ProcessError::NonZeroExit { code, .. }) => {
            log::warn!("Interactive shell exited with code: {:?}", code);
        }
        // Ctrl+C inside the shell belongs to the shell.
        Err(ProcessError::Interrupted(_)) => log::debug!("Ctrl+C was pressed inside the terminal."),
        Err(e) => return Err(e.into()),
    }

    println!("--- {} ---", t!("terminal.info.closed").green());
    Ok(())
}
