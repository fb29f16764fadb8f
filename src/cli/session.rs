// src/cli/session.rs

use crate::{
    cli::prompt::Prompter,
    core::{
        activation::{Activation, ActivationHandle},
        config::{self, ConfigError},
        environment::{self, SourcedEnvironment, SourcingFailure},
    },
    models::RosDevConfig,
    state::AppContext,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// One run of rosdev: the context, the prompter and the user configuration.
///
/// `--distro` overrides the stored distro for this run only; it is never saved.
#[derive(Debug)]
pub struct Session {
    ctx: AppContext,
    activation: ActivationHandle,
    prompter: Arc<dyn Prompter>,
    config_path: PathBuf,
    config: Mutex<RosDevConfig>,
    distro_override: Option<String>,
}

impl Session {
    pub fn new(
        ctx: AppContext,
        prompter: Arc<dyn Prompter>,
        config_path: PathBuf,
        distro_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = config::load_from(&config_path)?;
        let activation = ActivationHandle::attach(&ctx);
        Ok(Self {
            ctx,
            activation,
            prompter,
            config_path,
            config: Mutex::new(config),
            distro_override,
        })
    }

    pub fn ctx(&self) -> &AppContext {
        &self.ctx
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    pub fn activation(&self) -> Activation {
        self.activation.current()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The configuration as stored on disk.
    pub fn config(&self) -> RosDevConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The configuration in effect, with `--distro` applied.
    pub fn effective_config(&self) -> RosDevConfig {
        let mut config = self.config();
        if let Some(distro) = &self.distro_override {
            config.distro = Some(distro.clone());
        }
        config
    }

    /// Applies `change`, writes the file and keeps the new value.
    pub fn update_config<F>(&self, change: F) -> Result<RosDevConfig, ConfigError>
    where
        F: FnOnce(&mut RosDevConfig),
    {
        let mut updated = self.config();
        change(&mut updated);
        config::save_to(&self.config_path, &updated)?;
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = updated.clone();
        Ok(updated)
    }

    /// Re-reads the config file. Returns `true` when anything changed.
    pub fn reload_config(&self) -> Result<bool, ConfigError> {
        let fresh = config::load_from(&self.config_path)?;
        let mut current = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == fresh {
            return Ok(false);
        }
        log::info!("Configuration changed on disk.");
        *current = fresh;
        Ok(true)
    }

    /// Re-sources the environment with the effective configuration.
    pub async fn synchronize(&self) -> Result<SourcedEnvironment, SourcingFailure> {
        environment::synchronize(&self.ctx, &self.effective_config()).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::{
        cli::prompt::testing::{Answer, ScriptedPrompter},
        models::BuildSystem,
        state::testing::{context, ros_env},
        system::executor::testing::RecordingRunner,
    };

    /// A session whose config lives in `dir`, already sourced with a ROS environment.
    pub(crate) fn session(
        dir: &Path,
        build_system: BuildSystem,
        runner: Arc<RecordingRunner>,
        answers: Vec<Answer>,
    ) -> (Session, Arc<ScriptedPrompter>) {
        let prompter = Arc::new(ScriptedPrompter::new(answers));
        let ctx = context(dir, build_system, runner);
        let session = Session::new(
            ctx,
            Arc::clone(&prompter) as Arc<dyn Prompter>,
            dir.join("config.toml"),
            None,
        )
        .unwrap();
        session.ctx().replace_environment(Some(ros_env()));
        (session, prompter)
    }
}
