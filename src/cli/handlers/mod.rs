// src/cli/handlers/mod.rs

// One module per command (or per family of closely related commands).

pub mod commons;
pub mod create_pkg;
pub mod distro;
pub mod env;
pub mod info;
pub mod roscore;
pub mod roslaunch;
pub mod rosrun;
pub mod terminal;
