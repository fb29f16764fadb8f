// src/cli/dispatcher.rs

use anyhow::{Result, anyhow};
use colored::*;

use crate::{
    cli::{
        handlers::{
            self,
            commons::{self, FlowOutcome, HandlerFuture},
        },
        session::Session,
    },
    core::activation::Activation,
    system::executor::ProcessError,
};

// --- Command Definition and Registry ---

/// A command, its aliases, its menu label and what it needs before it can run.
#[derive(Debug)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub label: &'static str,
    /// Refused (with a notice) outside a catkin workspace.
    pub requires_workspace: bool,
    /// Needs a sourced ROS environment; hidden from the menu until there is one.
    pub requires_env: bool,
    pub handler: for<'a> fn(&'a Session, Vec<String>) -> HandlerFuture<'a>,
}

/// The single source of truth for all commands, in menu order.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "create-pkg",
        aliases: &["new"],
        label: t!("menu.create_pkg"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::create_pkg::handle,
    },
    CommandDefinition {
        name: "run",
        aliases: &["rosrun"],
        label: t!("menu.run"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::rosrun::handle,
    },
    CommandDefinition {
        name: "launch",
        aliases: &["roslaunch"],
        label: t!("menu.launch"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::roslaunch::handle,
    },
    CommandDefinition {
        name: "terminal",
        aliases: &["term", "shell"],
        label: t!("menu.terminal"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::terminal::handle,
    },
    CommandDefinition {
        name: "status",
        aliases: &[],
        label: t!("menu.status"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::roscore::handle_status,
    },
    CommandDefinition {
        name: "start-core",
        aliases: &["roscore"],
        label: t!("menu.start_core"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::roscore::handle_start,
    },
    CommandDefinition {
        name: "stop-core",
        aliases: &[],
        label: t!("menu.stop_core"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::roscore::handle_stop,
    },
    CommandDefinition {
        name: "packages",
        aliases: &["pkgs"],
        label: t!("menu.packages"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::env::handle_packages,
    },
    CommandDefinition {
        name: "include-dirs",
        aliases: &[],
        label: t!("menu.include_dirs"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::env::handle_include_dirs,
    },
    CommandDefinition {
        name: "env",
        aliases: &[],
        label: t!("menu.env"),
        requires_workspace: true,
        requires_env: true,
        handler: handlers::env::handle_env,
    },
    CommandDefinition {
        name: "distro",
        aliases: &[],
        label: t!("menu.distro"),
        requires_workspace: false,
        requires_env: false,
        handler: handlers::distro::handle,
    },
    CommandDefinition {
        name: "info",
        aliases: &[],
        label: t!("menu.info"),
        requires_workspace: false,
        requires_env: false,
        handler: handlers::info::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
pub fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// The commands the menu offers for this workspace and activation state.
pub fn available_commands(session: &Session, activation: &Activation) -> Vec<&'static CommandDefinition> {
    let in_workspace = session.ctx().workspace().is_active();
    COMMAND_REGISTRY
        .iter()
        .filter(|cmd| in_workspace || !cmd.requires_workspace)
        .filter(|cmd| activation.allows(cmd.requires_env))
        .collect()
}

/// Checks the command's requirements, then runs its handler.
async fn run_command(session: &Session, command: &CommandDefinition, args: Vec<String>) -> Result<FlowOutcome> {
    log::debug!("Running '{}' with args: {:?}", command.name, args);

    if command.requires_workspace && !session.ctx().workspace().is_active() {
        println!("{}", t!("workspace.info.not_in_workspace").dimmed());
        return Ok(FlowOutcome::Aborted);
    }

    if command.requires_env && commons::ensure_environment(session).await? == FlowOutcome::Aborted {
        return Ok(FlowOutcome::Aborted);
    }

    (command.handler)(session, args).await
}

/// Runs `rosdev <command> [args...]`.
pub async fn dispatch(session: &Session, all_args: Vec<String>) -> Result<FlowOutcome> {
    log::debug!("Dispatching args: {:?}", all_args);

    let Some((name, args)) = all_args.split_first() else {
        return Err(anyhow!(t!("error.no_command")));
    };
    let command = find_command(name).ok_or_else(|| anyhow!(t!("error.unknown_command"), command = name))?;
    run_command(session, command, args.to_vec()).await
}

// --- Interactive palette ---

/// Re-reads the config file and re-sources when it changed.
/// Returns `true` when the environment was synchronized again.
async fn refresh(session: &Session) -> bool {
    match session.reload_config() {
        Ok(true) => {
            commons::report_sourcing(&session.synchronize().await);
            true
        }
        Ok(false) => false,
        Err(e) => {
            println!("{}", e.to_string().red());
            false
        }
    }
}

/// The line above the menu: master state, or a hint when nothing is sourced.
async fn status_line(activation: &Activation) -> String {
    match activation.master() {
        Some(master) => handlers::roscore::status_line(master.is_online().await),
        None => t!("palette.status.inactive").dimmed().to_string(),
    }
}

fn report_error(error: &anyhow::Error) {
    if let Some(ProcessError::Interrupted(_)) = error.downcast_ref::<ProcessError>() {
        log::debug!("Command interrupted; back to the menu.");
        return;
    }
    eprintln!("{}: {:#}", "Error".red().bold(), error);
}

/// The menu shown when rosdev runs without a command. Loops until Esc or "Quit".
pub async fn palette(session: &Session) -> Result<()> {
    // 1. First sourcing.
    if session.ctx().workspace().is_active() {
        if let Err(e) = commons::settle_sourcing(session, session.synchronize().await).await {
            report_error(&e);
        }
    } else {
        println!("{}", t!("workspace.info.not_in_workspace").dimmed());
    }

    loop {
        // 2. Pick up config edits made while the menu was open.
        refresh(session).await;

        // 3. Render what the current activation allows.
        let activation = session.activation();
        println!("\n{}", status_line(&activation).await);
        let commands = available_commands(session, &activation);
        let mut labels: Vec<String> = commands.iter().map(|cmd| cmd.label.to_string()).collect();
        labels.push(t!("palette.quit").to_string());

        let Some(choice) = session.prompter().select(t!("palette.prompt"), &labels)? else {
            break;
        };
        let Some(command) = commands.get(choice) else {
            break;
        };

        // 4. A failing command never ends the menu.
        if let Err(e) = run_command(session, command, Vec::new()).await {
            report_error(&e);
        }
    }
    Ok(())
}
