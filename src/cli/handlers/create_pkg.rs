// src/cli/handlers/create_pkg.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;
use lazy_static::lazy_static;
use regex::Regex;

use super::commons::{self, FlowOutcome, HandlerFuture};
use crate::{
    cli::{args::CreatePkgArgs, prompt::InputRequest, session::Session},
    constants::PACKAGE_MANIFEST,
    models::BuildSystem,
};

lazy_static! {
    static ref PACKAGE_NAME_RE: Regex = Regex::new(r"^\w+$").unwrap();
    static ref DEPENDENCIES_RE: Regex = Regex::new(r"^\s*(\w+\s*)*$").unwrap();
}

fn validate_name(value: &str) -> Result<(), String> {
    if PACKAGE_NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(t!("create_pkg.error.invalid_name").to_string())
    }
}

fn validate_dependencies(value: &str) -> Result<(), String> {
    if DEPENDENCIES_RE.is_match(value) {
        Ok(())
    } else {
        Err(t!("create_pkg.error.invalid_dependencies").to_string())
    }
}

/// The creation command for the workspace's build system.
pub fn create_command(build_system: BuildSystem, name: &str, dependencies: &[String]) -> Option<(String, Vec<String>)> {
    match build_system {
        BuildSystem::CatkinMake => {
            let mut args = vec![name.to_string()];
            args.extend(dependencies.iter().cloned());
            Some(("catkin_create_pkg".to_string(), args))
        }
        BuildSystem::CatkinTools => {
            let mut args = vec!["create".to_string(), "pkg".to_string()];
            if !dependencies.is_empty() {
                args.push("--catkin-deps".to_string());
                args.extend(dependencies.iter().cloned());
            }
            args.push("--".to_string());
            args.push(name.to_string());
            Some(("catkin".to_string(), args))
        }
        BuildSystem::None => None,
    }
}

/// The main handler for the `create-pkg` command.
pub fn handle(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(run(session, args))
}

async fn run(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    // 1. Parse arguments
    let pkg_args = CreatePkgArgs::try_parse_from(&args)?;
    let ctx = session.ctx();

    // 2. Name: flag or prompt. An empty answer cancels.
    let name = match pkg_args.name {
        Some(name) => {
            validate_name(&name).map_err(|e| anyhow!("{} ('{}')", e, name))?;
            name
        }
        None => {
            let request = InputRequest::new(t!("create_pkg.prompt.name")).validate(validate_name);
            match session.prompter().input(&request)? {
                Some(name) => name,
                None => return Ok(FlowOutcome::Aborted),
            }
        }
    };

    // 3. Dependencies: flag or prompt. Empty is a valid answer.
    let dependencies = match pkg_args.deps {
        Some(deps) => {
            validate_dependencies(&deps).map_err(|e| anyhow!("{} ('{}')", e, deps))?;
            deps
        }
        None => {
            let request = InputRequest::new(t!("create_pkg.prompt.dependencies"))
                .allow_empty()
                .validate(validate_dependencies);
            match session.prompter().input(&request)? {
                Some(deps) => deps,
                None => return Ok(FlowOutcome::Aborted),
            }
        }
    };
    let dependencies: Vec<String> = dependencies.split_whitespace().map(str::to_string).collect();

    // 4. Build the command for this workspace's build system.
    let (program, tool_args) = create_command(ctx.workspace().build_system, &name, &dependencies)
        .ok_or_else(|| anyhow!(t!("workspace.error.not_detected")))?;
    let cwd = pkg_args.dir.unwrap_or_else(|| ctx.workspace().src_dir());
    let env = ctx.ros_environment()?;
    let mut invocation = ctx.tool(&program, &tool_args, env);
    invocation.cwd = cwd.clone();

    // 5. Run it.
    match ctx.runner().output(&invocation).await {
        Ok(_) => {
            let manifest = cwd.join(&name).join(PACKAGE_MANIFEST);
            println!("\n{}", t!("common.success"));
            println!("{}", format!(t!("create_pkg.success.created"), name = name.cyan()));
            println!("  {}", manifest.display());
            Ok(FlowOutcome::Completed)
        }
        Err(e) => {
            log::debug!("Package creation failed: {}", e);
            Err(anyhow!(commons::failure_message(t!("create_pkg.error.failed"), &e)))
        }
    }
}
