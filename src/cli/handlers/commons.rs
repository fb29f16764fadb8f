// src/cli/handlers/commons.rs

// Helpers shared by several handlers.

use anyhow::Result;
use colored::Colorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{
    cli::{handlers::distro, prompt::InputRequest, session::Session},
    core::environment::{OverlayStatus, SourcedEnvironment, SourcingFailure},
    system::executor::{BoxFuture, ProcessError},
};

/// How an interactive flow ended. Dismissing any prompt ends it as `Aborted`,
/// and nothing is executed after that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Completed,
    Aborted,
}

/// What every handler returns.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<FlowOutcome>>;

/// The tail of `stderr` starting at the first `error:`, if any.
pub fn error_detail(stderr: &str) -> Option<&str> {
    let start = stderr.find("error:")?;
    stderr.get(start..).map(str::trim_end)
}

/// `prefix`, plus the `error:` part of the command's stderr when there is one.
pub fn failure_message(prefix: &str, error: &ProcessError) -> String {
    match error_detail(error.stderr()) {
        Some(detail) => format!("{}: {}", prefix, detail),
        None => prefix.to_string(),
    }
}

/// File names for a pick list; a name shared by several files is shown as its full path.
pub fn file_labels(paths: &[PathBuf]) -> Vec<String> {
    let basename = |path: &Path| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for path in paths {
        *counts.entry(basename(path)).or_default() += 1;
    }

    paths
        .iter()
        .map(|path| {
            let name = basename(path);
            if counts.get(&name).copied().unwrap_or_default() > 1 {
                path.display().to_string()
            } else {
                name
            }
        })
        .collect()
}

/// Asks the user to pick one of `items`. An empty list is reported and counts as dismissed.
pub fn pick(session: &Session, prompt: &str, items: &[String], empty_notice: &str) -> Result<Option<usize>> {
    if items.is_empty() {
        println!("{}", empty_notice.yellow());
        return Ok(None);
    }
    Ok(session.prompter().select(prompt, items)?)
}

/// Free-form extra arguments, split like a shell would. `None` when dismissed.
pub fn ask_extra_args(session: &Session) -> Result<Option<Vec<String>>> {
    let request = InputRequest::new(t!("prompt.extra_args"))
        .placeholder(t!("prompt.extra_args.hint"))
        .allow_empty();
    let Some(raw) = session.prompter().input(&request)? else {
        return Ok(None);
    };
    match shlex::split(&raw) {
        Some(words) => Ok(Some(words)),
        None => Err(anyhow::anyhow!(t!("error.unbalanced_quotes"), input = raw)),
    }
}

/// Prints what the user should know about a re-source.
pub fn report_sourcing(result: &Result<SourcedEnvironment, SourcingFailure>) {
    match result {
        Ok(sourced) => match &sourced.overlay {
            OverlayStatus::Applied(script) => {
                log::info!("Workspace overlay '{}' applied.", script.display());
            }
            OverlayStatus::Missing => {
                println!("{}", t!("env.info.overlay_missing").dimmed());
            }
            OverlayStatus::Failed(message) => {
                println!(
                    "{}",
                    format!(t!("env.warn.overlay_failed"), reason = message).yellow()
                );
            }
        },
        Err(e) => println!("{}", e.to_string().red()),
    }
}

/// Reports the outcome of a re-source. When no distro is configured the user
/// is offered to pick one right away.
pub async fn settle_sourcing(
    session: &Session,
    result: Result<SourcedEnvironment, SourcingFailure>,
) -> Result<FlowOutcome> {
    match result {
        Ok(sourced) => {
            report_sourcing(&Ok(sourced));
            Ok(FlowOutcome::Completed)
        }
        Err(SourcingFailure::DistroNotConfigured) => {
            println!("{}", t!("env.error.distro_not_configured").red());
            distro::offer_configuration(session).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Makes sure a ROS environment is sourced before a command that needs one runs.
pub async fn ensure_environment(session: &Session) -> Result<FlowOutcome> {
    if session.ctx().ros_environment().is_ok() {
        return Ok(FlowOutcome::Completed);
    }
    settle_sourcing(session, session.synchronize().await).await
}
