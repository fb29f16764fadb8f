//! # System Interaction Layer
//!
//! Everything that touches the operating system directly.
//!
//! ## Modules
//!
//! - **`executor`**: Spawns external commands with an explicit environment, either
//!   capturing their output, attached to the terminal, or detached.
//! - **`platform`**: The POSIX and Windows strategies (sourcing, tool wrapping,
//!   terminals, process termination, executable detection).
//! - **`shell`**: The sourced interactive terminal session (`rosdev terminal`).

pub mod executor;
pub mod platform;
pub mod shell;
