// src/core/environment.rs

//! Sourcing ROS setup scripts into an [`EnvironmentMapping`].

use crate::{
    constants::{BASE_ENV_ALLOWLIST, DEVEL_SPACES},
    core::config::{self, ConfigError},
    models::{EnvironmentMapping, RosDevConfig},
    state::AppContext,
    system::executor::{Invocation, ProcessError},
};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Setup script '{0}' does not exist.")]
    ScriptNotFound(PathBuf),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Why no ROS environment could be established.
#[derive(Error, Debug)]
pub enum SourcingFailure {
    #[error("The ROS distro is not configured.")]
    DistroNotConfigured,
    #[error("Could not source the setup file for ROS distro \"{distro}\": {source}")]
    Distro {
        distro: String,
        #[source]
        source: SourceError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What happened with the workspace's own setup script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayStatus {
    /// The workspace setup script was sourced on top of the distro.
    Applied(PathBuf),
    /// The workspace has not been built yet (no devel space setup script).
    Missing,
    /// The script exists but sourcing it failed; the distro environment is kept.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedEnvironment {
    pub mapping: EnvironmentMapping,
    pub overlay: OverlayStatus,
}

/// The environment distro setup scripts start from: a small allowlist of
/// variables from rosdev's own environment, so stale ROS variables in the
/// calling shell cannot leak into the new distro.
pub fn base_environment() -> EnvironmentMapping {
    BASE_ENV_ALLOWLIST
        .iter()
        .filter_map(|name| std::env::var(name).ok().map(|value| (name.to_string(), value)))
        .collect()
}

/// rosdev's own environment as a mapping. Names and values that are not
/// valid UTF-8 are converted lossily instead of aborting.
pub fn inherited_environment<I>(vars: I) -> EnvironmentMapping
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .map(|(name, value)| {
            (
                name.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

/// Runs `script` in a subshell on top of `base` and returns the environment it leaves behind.
pub async fn source_setup_script(
    ctx: &AppContext,
    script: &Path,
    base: &EnvironmentMapping,
) -> Result<EnvironmentMapping, SourceError> {
    if !script.is_file() {
        return Err(SourceError::ScriptNotFound(script.to_path_buf()));
    }

    let (program, args) = ctx.platform().source_command(script);
    let invocation = Invocation::new(program, &ctx.workspace().root, Arc::new(base.clone())).args(args);
    log::info!("Sourcing '{}'.", script.display());

    let output = ctx.runner().output(&invocation).await?;
    let mapping = EnvironmentMapping::parse(&output.stdout);
    log::debug!(
        "'{}' produced {} environment variables.",
        script.display(),
        mapping.len()
    );
    Ok(mapping)
}

/// The setup script of the workspace's devel space (`devel_isolated` wins over `devel`).
pub fn workspace_setup_script(ctx: &AppContext) -> PathBuf {
    let root = &ctx.workspace().root;
    let devel = DEVEL_SPACES
        .iter()
        .map(|space| root.join(space))
        .find(|dir| dir.exists())
        .unwrap_or_else(|| root.join(DEVEL_SPACES.last().copied().unwrap_or("devel")));
    ctx.platform().setup_script_in(&devel)
}

/// Works out the environment for the workspace:
/// the configured distro (or an already-sourced calling shell), then the
/// workspace overlay on top.
pub async fn resolve_environment(
    ctx: &AppContext,
    config: &RosDevConfig,
) -> Result<SourcedEnvironment, SourcingFailure> {
    // 1. Distro layer.
    let distro_env = match config.distro.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(distro) => {
            let root = config::install_root(config, ctx.platform())?;
            let script = ctx
                .platform()
                .setup_script_in(&ctx.platform().distro_install_path(&root, distro));
            source_setup_script(ctx, &script, &base_environment())
                .await
                .map_err(|source| SourcingFailure::Distro {
                    distro: distro.to_string(),
                    source,
                })?
        }
        None => {
            let inherited = inherited_environment(std::env::vars_os());
            if !inherited.is_ros() {
                return Err(SourcingFailure::DistroNotConfigured);
            }
            log::debug!("No distro configured; using the already-sourced calling environment.");
            inherited
        }
    };

    // 2. Workspace overlay.
    let script = workspace_setup_script(ctx);
    if !distro_env.is_ros() || !script.is_file() {
        log::debug!("No workspace overlay at '{}'.", script.display());
        return Ok(SourcedEnvironment {
            mapping: distro_env,
            overlay: OverlayStatus::Missing,
        });
    }

    match source_setup_script(ctx, &script, &distro_env).await {
        Ok(mapping) => Ok(SourcedEnvironment {
            mapping,
            overlay: OverlayStatus::Applied(script),
        }),
        Err(e) => {
            log::warn!("Workspace setup script failed: {}", e);
            Ok(SourcedEnvironment {
                mapping: distro_env,
                overlay: OverlayStatus::Failed(e.to_string()),
            })
        }
    }
}

/// Re-sources the environment, installs it into the context and fires the
/// change signal exactly once, whether sourcing worked or not.
pub async fn synchronize(
    ctx: &AppContext,
    config: &RosDevConfig,
) -> Result<SourcedEnvironment, SourcingFailure> {
    let result = resolve_environment(ctx, config).await;
    let mapping = result.as_ref().ok().map(|sourced| sourced.mapping.clone());
    ctx.replace_environment(mapping);
    result
}

/// Distros installed under `install_root`, sorted by name.
pub fn list_distros(install_root: &Path) -> Result<Vec<String>, ConfigError> {
    let entries = fs::read_dir(install_root).map_err(|source| ConfigError::Io {
        path: install_root.display().to_string(),
        source,
    })?;
    let mut distros: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    distros.sort();
    Ok(distros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::BuildSystem,
        state::testing::context,
        system::executor::testing::{RecordingRunner, failure, stdout},
    };

    const DISTRO_DUMP: &str = "PATH=/opt/ros/noetic/bin:/usr/bin\nROS_ROOT=/opt/ros/noetic/share/ros\nROS_DISTRO=noetic\n";
    const OVERLAY_DUMP: &str = "PATH=/ws/devel/bin:/opt/ros/noetic/bin\nROS_ROOT=/opt/ros/noetic/share/ros\nROS_PACKAGE_PATH=/ws/src\n";

    /// A fake install root with one distro setup script and a workspace.
    fn layout(with_overlay: bool) -> (tempfile::TempDir, RosDevConfig) {
        let dir = tempfile::tempdir().unwrap();
        let distro_dir = dir.path().join("ros/noetic");
        fs::create_dir_all(&distro_dir).unwrap();
        fs::write(distro_dir.join("setup.bash"), "").unwrap();
        fs::create_dir_all(dir.path().join("ws/devel")).unwrap();
        if with_overlay {
            fs::write(dir.path().join("ws/devel/setup.bash"), "").unwrap();
        }
        let config = RosDevConfig {
            distro: Some("noetic".to_string()),
            install_root: Some(dir.path().join("ros").display().to_string()),
            status_interval_ms: None,
        };
        (dir, config)
    }

    fn sourcing_runner() -> Arc<RecordingRunner> {
        Arc::new(RecordingRunner::new(|inv| {
            let script = inv.args.last().cloned().unwrap_or_default();
            if script.contains("/ws/devel/") {
                stdout(OVERLAY_DUMP)
            } else {
                stdout(DISTRO_DUMP)
            }
        }))
    }

    #[cfg(unix)]
    #[test]
    fn test_inherited_environment_survives_invalid_utf8() {
        use std::os::unix::ffi::OsStringExt;
        let vars = vec![
            (OsString::from("ROS_ROOT"), OsString::from("/opt/ros/noetic/share/ros")),
            (OsString::from("ODD"), OsString::from_vec(vec![0xff, 0xfe])),
        ];

        let env = inherited_environment(vars);

        assert!(env.is_ros());
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("ODD"), Some("\u{FFFD}\u{FFFD}"));
    }

    #[tokio::test]
    async fn test_source_setup_script_parses_env_dump() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("setup.bash");
        fs::write(&script, "").unwrap();
        let runner = Arc::new(RecordingRunner::new(|_| stdout("A=1\nB=2=3\n")));
        let ctx = context(dir.path(), BuildSystem::CatkinMake, runner.clone());

        let env = source_setup_script(&ctx, &script, &EnvironmentMapping::new())
            .await
            .unwrap();

        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), Some("2=3"));
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "bash");
        assert!(calls[0].args[1].ends_with("&& env"));
    }

    #[tokio::test]
    async fn test_missing_script_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::silent());
        let ctx = context(dir.path(), BuildSystem::CatkinMake, runner.clone());

        let err = source_setup_script(&ctx, &dir.path().join("nope.bash"), &EnvironmentMapping::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::ScriptNotFound(_)));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_sources_distro_then_overlay() {
        let (dir, config) = layout(true);
        let runner = sourcing_runner();
        let ctx = context(&dir.path().join("ws"), BuildSystem::CatkinMake, runner.clone());

        let sourced = resolve_environment(&ctx, &config).await.unwrap();

        assert_eq!(sourced.mapping.get("ROS_PACKAGE_PATH"), Some("/ws/src"));
        assert!(matches!(sourced.overlay, OverlayStatus::Applied(_)));
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        // The overlay runs on top of the distro environment.
        assert_eq!(calls[1].env.get("ROS_DISTRO"), Some("noetic"));
    }

    #[tokio::test]
    async fn test_resolve_without_overlay() {
        let (dir, config) = layout(false);
        let ctx = context(&dir.path().join("ws"), BuildSystem::CatkinMake, sourcing_runner());

        let sourced = resolve_environment(&ctx, &config).await.unwrap();

        assert_eq!(sourced.overlay, OverlayStatus::Missing);
        assert_eq!(sourced.mapping.get("ROS_DISTRO"), Some("noetic"));
    }

    #[tokio::test]
    async fn test_overlay_failure_keeps_distro_env() {
        let (dir, config) = layout(true);
        let runner = Arc::new(RecordingRunner::new(|inv| {
            if inv.args.last().is_some_and(|a| a.contains("/ws/devel/")) {
                failure(inv, "syntax error")
            } else {
                stdout(DISTRO_DUMP)
            }
        }));
        let ctx = context(&dir.path().join("ws"), BuildSystem::CatkinMake, runner);

        let sourced = resolve_environment(&ctx, &config).await.unwrap();

        assert!(matches!(sourced.overlay, OverlayStatus::Failed(_)));
        assert!(sourced.mapping.is_ros());
    }

    #[tokio::test]
    async fn test_distro_failure_is_reported() {
        let (dir, mut config) = layout(false);
        config.distro = Some("rolling".to_string());
        let ctx = context(&dir.path().join("ws"), BuildSystem::CatkinMake, sourcing_runner());

        let err = resolve_environment(&ctx, &config).await.unwrap_err();
        assert!(matches!(
            err,
            SourcingFailure::Distro { ref distro, source: SourceError::ScriptNotFound(_) } if distro == "rolling"
        ));
    }

    #[tokio::test]
    async fn test_synchronize_replaces_and_fires() {
        let (dir, config) = layout(true);
        let ctx = context(&dir.path().join("ws"), BuildSystem::CatkinMake, sourcing_runner());
        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&fired);
        let _sub = ctx.subscribe(move |_| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        synchronize(&ctx, &config).await.unwrap();
        assert!(ctx.ros_environment().is_ok());

        let broken = RosDevConfig {
            distro: Some("missing".to_string()),
            ..config
        };
        assert!(synchronize(&ctx, &broken).await.is_err());
        assert!(ctx.environment().is_none());
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_workspace_setup_prefers_devel_isolated() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("devel")).unwrap();
        fs::create_dir_all(dir.path().join("devel_isolated")).unwrap();
        let ctx = context(dir.path(), BuildSystem::CatkinMake, Arc::new(RecordingRunner::silent()));

        assert_eq!(
            workspace_setup_script(&ctx),
            dir.path().join("devel_isolated").join("setup.bash")
        );
    }

    #[test]
    fn test_list_distros_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("noetic")).unwrap();
        fs::create_dir_all(dir.path().join("melodic")).unwrap();
        fs::write(dir.path().join("README"), "").unwrap();

        assert_eq!(
            list_distros(dir.path()).unwrap(),
            vec!["melodic".to_string(), "noetic".to_string()]
        );
        assert!(list_distros(&dir.path().join("absent")).is_err());
    }
}
