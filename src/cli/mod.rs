// src/cli/mod.rs

use clap::Parser;
use std::path::PathBuf;

pub mod args;
pub mod dispatcher;
pub mod handlers;
pub mod prompt;
pub mod session;

/// rosdev: a terminal companion for catkin workspaces.
///
/// Without a command, an interactive menu of the commands available in the
/// current workspace is shown.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// Use this ROS distro instead of the configured one (for this run only).
    #[arg(long)]
    pub distro: Option<String>,

    /// Start workspace detection here instead of the current directory.
    #[arg(short = 'C', long = "workspace")]
    pub workspace: Option<PathBuf>,

    /// The command followed by its own arguments
    /// (create-pkg, run, launch, terminal, status, start-core, stop-core,
    /// packages, include-dirs, env, distro, info).
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
