// src/core/mod.rs

pub mod activation;
pub mod config;
pub mod environment;
pub mod master;
pub mod packages;
pub mod signal;
pub mod workspace;
