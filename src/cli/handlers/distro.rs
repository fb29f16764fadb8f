// src/cli/handlers/distro.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use super::commons::{self, FlowOutcome, HandlerFuture};
use crate::{
    cli::{args::DistroArgs, session::Session},
    core::{config, environment},
};

/// The main handler for the `distro` command.
/// Picks (or sets) the ROS distro, saves it and re-sources the environment.
pub fn handle(session: &Session, args: Vec<String>) -> HandlerFuture<'_> {
    Box::pin(run(session, args))
}

async fn run(session: &Session, args: Vec<String>) -> Result<FlowOutcome> {
    let distro_args = DistroArgs::try_parse_from(&args)?;
    configure(session, distro_args.name).await
}

/// Asked when a command needs ROS but no distro is configured.
pub async fn offer_configuration(session: &Session) -> Result<FlowOutcome> {
    match session.prompter().confirm(t!("distro.prompt.configure_now"), true)? {
        Some(true) => configure(session, None).await,
        _ => Ok(FlowOutcome::Aborted),
    }
}

pub async fn configure(session: &Session, name: Option<String>) -> Result<FlowOutcome> {
    let platform = session.ctx().platform();
    let install_root = config::install_root(&session.config(), platform)?;

    // 1. Which distro.
    let distro = match name {
        Some(name) => name,
        None => {
            let installed = environment::list_distros(&install_root).unwrap_or_else(|e| {
                log::warn!("Could not list distros: {}", e);
                Vec::new()
            });
            let notice = format!(
                t!("distro.warn.none_installed"),
                root = install_root.display()
            );
            let Some(choice) = commons::pick(session, t!("distro.prompt.choose"), &installed, &notice)? else {
                return Ok(FlowOutcome::Aborted);
            };
            installed
                .get(choice)
                .cloned()
                .ok_or_else(|| anyhow!(t!("common.error.selection_out_of_range")))?
        }
    };

    // 2. It has to be installed.
    let distro_dir = platform.distro_install_path(&install_root, &distro);
    if !distro_dir.is_dir() {
        return Err(anyhow!(
            t!("distro.error.not_installed"),
            distro = distro,
            path = distro_dir.display()
        ));
    }

    // 3. Persist, then re-source.
    session.update_config(|config| config.distro = Some(distro.clone()))?;
    println!("{}", format!(t!("distro.success.set"), distro = distro.cyan()).green());

    let result = session.synchronize().await;
    commons::report_sourcing(&result);
    result?;
    Ok(FlowOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cli::{prompt::testing::Answer, session::testing::session},
        models::BuildSystem,
        system::executor::testing::{RecordingRunner, stdout},
    };
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    fn install(root: &Path, distros: &[&str]) {
        for distro in distros {
            let dir = root.join(distro);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("setup.bash"), "").unwrap();
        }
    }

    fn sourcing_runner() -> Arc<RecordingRunner> {
        Arc::new(RecordingRunner::new(|_| {
            stdout("ROS_ROOT=/opt/ros/noetic/share/ros\nROS_DISTRO=noetic\n")
        }))
    }

    #[tokio::test]
    async fn test_pick_saves_and_resources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ros");
        install(&root, &["melodic", "noetic"]);
        let runner = sourcing_runner();
        let (session, prompter) = session(
            dir.path(),
            BuildSystem::CatkinMake,
            Arc::clone(&runner),
            vec![Answer::Pick("noetic")],
        );
        session
            .update_config(|c| c.install_root = Some(root.display().to_string()))
            .unwrap();

        let outcome = configure(&session, None).await.unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        assert_eq!(prompter.asked(), vec![t!("distro.prompt.choose")]);
        assert_eq!(session.config().distro.as_deref(), Some("noetic"));
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.calls()[0].args[1].contains("noetic"));
    }

    #[tokio::test]
    async fn test_dismissed_pick_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ros");
        install(&root, &["noetic"]);
        let runner = sourcing_runner();
        let (session, _) = session(
            dir.path(),
            BuildSystem::CatkinMake,
            Arc::clone(&runner),
            vec![Answer::Dismiss],
        );
        session
            .update_config(|c| c.install_root = Some(root.display().to_string()))
            .unwrap();

        assert_eq!(configure(&session, None).await.unwrap(), FlowOutcome::Aborted);
        assert_eq!(session.config().distro, None);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_distro_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = sourcing_runner();
        let (session, _) = session(dir.path(), BuildSystem::CatkinMake, Arc::clone(&runner), vec![]);
        session
            .update_config(|c| c.install_root = Some(dir.path().display().to_string()))
            .unwrap();

        assert!(configure(&session, Some("bogus".to_string())).await.is_err());
        assert_eq!(session.config().distro, None);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_declining_the_offer_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let runner = sourcing_runner();
        let (session, _) = session(dir.path(), BuildSystem::CatkinMake, Arc::clone(&runner), vec![Answer::No]);

        assert_eq!(offer_configuration(&session).await.unwrap(), FlowOutcome::Aborted);
        assert!(runner.calls().is_empty());
    }
}
