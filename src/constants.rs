// src/constants.rs

/// Marker file generated by `catkin_make` at the workspace root.
pub const CATKIN_MAKE_MARKER: &str = ".catkin_workspace";

/// Marker directory generated by `catkin init` (catkin tools) at the workspace root.
pub const CATKIN_TOOLS_MARKER: &str = ".catkin_tools";

/// Name of the rosdev directory inside the system config directory.
pub const CONFIG_DIR_NAME: &str = "rosdev";

/// Name of the configuration file (inside the rosdev config directory).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "ROSDEV_CONFIG";

/// Exported into terminals opened by rosdev. Its presence means "already inside a session".
pub const WORKSPACE_ENV: &str = "ROSDEV_WORKSPACE";

/// Set by every ROS 1 setup script; its presence marks a usable ROS environment.
pub const ROS_ROOT_VAR: &str = "ROS_ROOT";

pub const ROS_MASTER_URI_VAR: &str = "ROS_MASTER_URI";

pub const ROS_DISTRO_VAR: &str = "ROS_DISTRO";

pub const DEFAULT_MASTER_URI: &str = "http://localhost:11311/";

/// XML-RPC caller id used for master queries.
pub const MASTER_CALLER_ID: &str = "/rosdev";

/// Workspace devel spaces, in lookup order.
pub const DEVEL_SPACES: &[&str] = &["devel_isolated", "devel"];

pub const SETUP_SCRIPT_STEM: &str = "setup";

pub const LAUNCH_FILE_EXTENSION: &str = "launch";

pub const PACKAGE_MANIFEST: &str = "package.xml";

/// Default polling period for `status --watch`.
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 1000;

/// Variables copied from the parent process into the base environment used
/// when sourcing a distro setup script.
pub const BASE_ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LANG",
    "TERM",
    "SHELL",
    "TMPDIR",
    "SystemRoot",
    "TEMP",
    "TMP",
    "USERPROFILE",
    "COMSPEC",
    "PATHEXT",
];
