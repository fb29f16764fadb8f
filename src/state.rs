// src/state.rs

use crate::{
    core::signal::{EnvironmentSignal, EnvironmentSnapshot, Subscription},
    models::{EnvironmentMapping, WorkspaceDescriptor},
    system::{
        executor::{Invocation, ProcessRunner},
        platform::ShellPlatform,
    },
};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("The ROS environment has not been sourced.")]
    NotSourced,
    #[error("The sourced environment is not a ROS environment (ROS_ROOT is not set).")]
    NotRos,
}

/// Everything a command needs, passed explicitly instead of living in globals.
///
/// The workspace is fixed at construction. The environment is swapped as a
/// whole by [`AppContext::replace_environment`]; readers take an `Arc`
/// snapshot and keep using it even if a newer one lands in the meantime.
#[derive(Debug)]
pub struct AppContext {
    workspace: WorkspaceDescriptor,
    environment: RwLock<EnvironmentSnapshot>,
    signal: EnvironmentSignal,
    runner: Arc<dyn ProcessRunner>,
    platform: Arc<dyn ShellPlatform>,
}

impl AppContext {
    pub fn new(
        workspace: WorkspaceDescriptor,
        runner: Arc<dyn ProcessRunner>,
        platform: Arc<dyn ShellPlatform>,
    ) -> Self {
        Self {
            workspace,
            environment: RwLock::new(None),
            signal: EnvironmentSignal::new(),
            runner,
            platform,
        }
    }

    pub fn workspace(&self) -> &WorkspaceDescriptor {
        &self.workspace
    }

    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    pub fn platform(&self) -> &dyn ShellPlatform {
        self.platform.as_ref()
    }

    /// The environment in effect right now.
    pub fn environment(&self) -> EnvironmentSnapshot {
        self.environment
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current environment, provided it is a sourced ROS one.
    pub fn ros_environment(&self) -> Result<Arc<EnvironmentMapping>, ContextError> {
        let env = self.environment().ok_or(ContextError::NotSourced)?;
        if env.is_ros() {
            Ok(env)
        } else {
            Err(ContextError::NotRos)
        }
    }

    /// Installs a new environment (or clears it) and notifies subscribers.
    pub fn replace_environment(&self, environment: Option<EnvironmentMapping>) {
        let snapshot = environment.map(Arc::new);
        {
            let mut current = self
                .environment
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *current = snapshot.clone();
        }
        self.signal.fire(&snapshot);
    }

    pub fn signal(&self) -> &EnvironmentSignal {
        &self.signal
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EnvironmentSnapshot) + Send + Sync + 'static,
    {
        self.signal.subscribe(listener)
    }

    /// An invocation of a ROS tool, run from the workspace root with `env`.
    pub fn tool(&self, program: &str, args: &[String], env: Arc<EnvironmentMapping>) -> Invocation {
        let (program, args) = self.platform.tool_command(program, args);
        Invocation::new(program, &self.workspace.root, env).args(args)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::{models::BuildSystem, system::executor::testing::RecordingRunner};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_snapshots_survive_replacement() {
        let ctx = context(Path::new("/ws"), BuildSystem::CatkinMake, Arc::new(RecordingRunner::silent()));
        ctx.replace_environment(Some(ros_env()));
        let before = ctx.environment().unwrap();

        ctx.replace_environment(Some(EnvironmentMapping::parse("A=1\n")));

        assert!(before.is_ros());
        assert_eq!(ctx.environment().unwrap().get("A"), Some("1"));
    }

    #[test]
    fn test_ros_environment_requires_ros_root() {
        let ctx = context(Path::new("/ws"), BuildSystem::CatkinMake, Arc::new(RecordingRunner::silent()));
        assert_eq!(ctx.ros_environment().unwrap_err(), ContextError::NotSourced);

        ctx.replace_environment(Some(EnvironmentMapping::parse("A=1\n")));
        assert_eq!(ctx.ros_environment().unwrap_err(), ContextError::NotRos);

        ctx.replace_environment(Some(ros_env()));
        assert!(ctx.ros_environment().is_ok());
    }

    #[test]
    fn test_replace_environment_fires_once() {
        let ctx = context(Path::new("/ws"), BuildSystem::CatkinMake, Arc::new(RecordingRunner::silent()));
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&fired);
        let _sub = ctx.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        ctx.replace_environment(None);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tool_runs_from_workspace_root() {
        let ctx = context(Path::new("/ws"), BuildSystem::CatkinMake, Arc::new(RecordingRunner::silent()));
        let inv = ctx.tool("rospack", &["list".to_string()], Arc::new(ros_env()));
        assert_eq!(inv.command_line(), "rospack list");
        assert_eq!(inv.cwd, Path::new("/ws"));
    }
}
