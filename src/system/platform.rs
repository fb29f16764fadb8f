// src/system/platform.rs

//! Everything that differs between POSIX shells and `cmd.exe` lives behind
//! [`ShellPlatform`]. Callers build argument vectors, never shell strings,
//! except for the one place a shell is unavoidable: sourcing a setup script.

use crate::constants::SETUP_SCRIPT_STEM;
use std::env;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A program and its arguments, ready to become an `Invocation`.
pub type CommandSpec = (String, Vec<String>);

pub trait ShellPlatform: Send + Sync + Debug {
    /// Short name for logs (`posix`, `windows`).
    fn name(&self) -> &'static str;

    /// Extension of setup scripts, without the dot.
    fn setup_script_extension(&self) -> &'static str;

    /// Where ROS distros are installed when the config does not say otherwise.
    fn default_install_root(&self) -> PathBuf;

    /// The install directory of one distro under `install_root`.
    fn distro_install_path(&self, install_root: &Path, distro: &str) -> PathBuf;

    /// A subshell that runs `script` and then dumps the resulting environment
    /// as `NAME=VALUE` lines.
    fn source_command(&self, script: &Path) -> CommandSpec;

    /// How to start a ROS command-line tool.
    fn tool_command(&self, program: &str, args: &[String]) -> CommandSpec;

    /// An interactive shell for a sourced terminal.
    fn terminal_command(&self) -> CommandSpec;

    /// Asks a process to terminate.
    fn kill_command(&self, pid: u32) -> CommandSpec;

    /// Whether a regular file counts as an executable.
    fn is_executable(&self, path: &Path) -> bool;

    /// `setup.<ext>` inside `dir`.
    fn setup_script_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.{}", SETUP_SCRIPT_STEM, self.setup_script_extension()))
    }
}

/// bash and friends.
#[derive(Debug, Default, Clone, Copy)]
pub struct Posix;

impl ShellPlatform for Posix {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn setup_script_extension(&self) -> &'static str {
        "bash"
    }

    fn default_install_root(&self) -> PathBuf {
        PathBuf::from("/opt/ros")
    }

    fn distro_install_path(&self, install_root: &Path, distro: &str) -> PathBuf {
        install_root.join(distro)
    }

    fn source_command(&self, script: &Path) -> CommandSpec {
        let script = script.to_string_lossy();
        let quoted = shlex::try_quote(&script)
            .map(|q| q.into_owned())
            .unwrap_or_else(|_| format!("'{}'", script.replace('\'', "'\\''")));
        (
            "bash".to_string(),
            vec!["-c".to_string(), format!("source {} && env", quoted)],
        )
    }

    fn tool_command(&self, program: &str, args: &[String]) -> CommandSpec {
        (program.to_string(), args.to_vec())
    }

    fn terminal_command(&self) -> CommandSpec {
        let shell = env::var("SHELL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "bash".to_string());
        (shell, vec!["-i".to_string()])
    }

    fn kill_command(&self, pid: u32) -> CommandSpec {
        (
            "kill".to_string(),
            vec!["-INT".to_string(), pid.to_string()],
        )
    }

    fn is_executable(&self, path: &Path) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            path.metadata()
                .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
                .unwrap_or(false)
        }
        #[cfg(not(unix))]
        {
            path.is_file()
        }
    }
}

/// `cmd.exe`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Windows;

impl ShellPlatform for Windows {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn setup_script_extension(&self) -> &'static str {
        "bat"
    }

    fn default_install_root(&self) -> PathBuf {
        PathBuf::from("C:\\opt\\ros")
    }

    fn distro_install_path(&self, install_root: &Path, distro: &str) -> PathBuf {
        install_root.join(distro).join("x64")
    }

    fn source_command(&self, script: &Path) -> CommandSpec {
        (
            "cmd".to_string(),
            vec![
                "/c".to_string(),
                script.to_string_lossy().into_owned(),
                "&&".to_string(),
                "set".to_string(),
            ],
        )
    }

    fn tool_command(&self, program: &str, args: &[String]) -> CommandSpec {
        // ROS tools on Windows are mostly .bat/.py shims that only cmd can start.
        let mut wrapped = vec!["/C".to_string(), program.to_string()];
        wrapped.extend(args.iter().cloned());
        ("cmd".to_string(), wrapped)
    }

    fn terminal_command(&self) -> CommandSpec {
        ("cmd".to_string(), vec!["/K".to_string()])
    }

    fn kill_command(&self, pid: u32) -> CommandSpec {
        (
            "taskkill".to_string(),
            vec![
                "/PID".to_string(),
                pid.to_string(),
                "/T".to_string(),
                "/F".to_string(),
            ],
        )
    }

    fn is_executable(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
    }
}

/// The strategy for the OS rosdev was built for.
pub fn current() -> Arc<dyn ShellPlatform> {
    if cfg!(target_os = "windows") {
        Arc::new(Windows)
    } else {
        Arc::new(Posix)
    }
}
