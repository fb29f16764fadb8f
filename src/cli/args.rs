// src/cli/args.rs
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // Handlers receive the words after the command name.
pub struct CreatePkgArgs {
    /// Name of the new package. Asked interactively when omitted.
    pub name: Option<String>,

    /// Space separated catkin dependencies (e.g. "roscpp std_msgs").
    #[arg(long)]
    pub deps: Option<String>,

    /// Directory to create the package in. Defaults to `<workspace>/src`.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct RunArgs {
    /// The package holding the executable.
    pub package: Option<String>,

    /// File name of the executable inside the package.
    pub executable: Option<String>,

    /// Extra arguments for the node (everything after the executable, or after `--`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct LaunchArgs {
    /// The package holding the launch file.
    pub package: Option<String>,

    /// Launch file name (e.g. `demo.launch`) or a path relative to the package share directory.
    pub launch_file: Option<String>,

    /// Extra arguments for roslaunch (e.g. `use_sim_time:=true`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct StatusArgs {
    /// Keep polling and print a line whenever the status changes.
    #[arg(long, short)]
    pub watch: bool,

    /// Polling period in milliseconds for `--watch`.
    #[arg(long)]
    pub interval: Option<u64>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct EnvArgs {
    /// Print the environment as a JSON object.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct DistroArgs {
    /// The distro to use. Picked from the installed ones when omitted.
    pub name: Option<String>,
}

/// For commands that take no arguments; parsing still rejects stray words.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct NoArgs {}
