// src/core/packages.rs

//! Queries against the ROS package tools (`rospack`, `catkin_find`).
//!
//! Every query runs from the workspace root with the current environment
//! snapshot and fails fast when no ROS environment is sourced.

use crate::{
    constants::LAUNCH_FILE_EXTENSION,
    models::PackageIndex,
    state::{AppContext, ContextError},
    system::executor::ProcessError,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error(transparent)]
    Environment(#[from] ContextError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

async fn tool_lines(ctx: &AppContext, program: &str, args: Vec<String>) -> Result<Vec<String>, PackageError> {
    let env = ctx.ros_environment()?;
    let invocation = ctx.tool(program, &args, env);
    let output = ctx.runner().output(&invocation).await?;
    Ok(output.lines())
}

/// All packages visible in the sourced environment (`rospack list`).
pub async fn list_packages(ctx: &AppContext) -> Result<PackageIndex, PackageError> {
    let env = ctx.ros_environment()?;
    let invocation = ctx.tool("rospack", &["list".to_string()], env);
    let output = ctx.runner().output(&invocation).await?;
    let index = PackageIndex::parse(&output.stdout);
    log::debug!("rospack reported {} package(s).", index.len());
    Ok(index)
}

/// Include directories of every package (`catkin_find --include`).
pub async fn include_dirs(ctx: &AppContext) -> Result<Vec<String>, PackageError> {
    tool_lines(ctx, "catkin_find", vec!["--include".to_string()]).await
}

/// Directories of `package` selected by `filters`, ignoring underlays.
pub async fn package_dirs(ctx: &AppContext, package: &str, filters: &[&str]) -> Result<Vec<String>, PackageError> {
    let mut args = vec!["--without-underlays".to_string()];
    args.extend(filters.iter().map(|f| f.to_string()));
    args.push(package.to_string());
    tool_lines(ctx, "catkin_find", args).await
}

/// Walks every directory `package_dirs` returns and keeps the paths matching `predicate`.
///
/// Symlinked directories are not descended into, hidden entries are
/// included, directories that do not exist are skipped. The result is
/// sorted and free of duplicates.
pub async fn find_package_files<P>(
    ctx: &AppContext,
    package: &str,
    filters: &[&str],
    predicate: P,
) -> Result<Vec<PathBuf>, PackageError>
where
    P: Fn(&Path) -> bool,
{
    let dirs = package_dirs(ctx, package, filters).await?;
    let mut found = BTreeSet::new();

    for dir in dirs {
        let dir = Path::new(&dir);
        if !dir.is_dir() {
            log::debug!("Skipping missing package directory '{}'.", dir.display());
            continue;
        }
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Could not read an entry under '{}': {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() && predicate(entry.path()) {
                found.insert(entry.into_path());
            }
        }
    }

    Ok(found.into_iter().collect())
}

/// Executables of `package` in its libexec and share directories.
pub async fn executables(ctx: &AppContext, package: &str) -> Result<Vec<PathBuf>, PackageError> {
    let platform = ctx.platform();
    find_package_files(ctx, package, &["--libexec", "--share"], |path| {
        path.is_file() && platform.is_executable(path)
    })
    .await
}

/// `.launch` files of `package` in its share directory.
pub async fn launch_files(ctx: &AppContext, package: &str) -> Result<Vec<PathBuf>, PackageError> {
    find_package_files(ctx, package, &["--share"], |path| {
        path.extension().is_some_and(|ext| ext == LAUNCH_FILE_EXTENSION)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::BuildSystem,
        state::testing::{context, ros_env},
        system::executor::testing::{RecordingRunner, failure, stdout},
    };
    use std::fs;
    use std::sync::Arc;

    fn sourced(root: &Path, runner: Arc<RecordingRunner>) -> AppContext {
        let ctx = context(root, BuildSystem::CatkinMake, runner);
        ctx.replace_environment(Some(ros_env()));
        ctx
    }

    #[tokio::test]
    async fn test_list_packages_parses_rospack() {
        let runner = Arc::new(RecordingRunner::new(|_| {
            stdout("roscpp /opt/ros/noetic/share/roscpp\nbeginner_tutorials /ws/src/beginner tutorials\n")
        }));
        let ctx = sourced(Path::new("/ws"), Arc::clone(&runner));

        let index = list_packages(&ctx).await.unwrap();

        assert_eq!(index.names(), vec!["beginner_tutorials", "roscpp"]);
        assert_eq!(
            index.path_of("beginner_tutorials"),
            Some(Path::new("/ws/src/beginner tutorials"))
        );
        assert_eq!(runner.command_lines(), vec!["rospack list"]);
        assert_eq!(runner.calls()[0].cwd, Path::new("/ws"));
    }

    #[tokio::test]
    async fn test_queries_need_a_ros_environment() {
        let runner = Arc::new(RecordingRunner::silent());
        let ctx = context(Path::new("/ws"), BuildSystem::CatkinMake, Arc::clone(&runner));

        assert!(matches!(
            list_packages(&ctx).await,
            Err(PackageError::Environment(ContextError::NotSourced))
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_output_is_an_empty_list() {
        let ctx = sourced(Path::new("/ws"), Arc::new(RecordingRunner::new(|_| stdout("\n  \n"))));
        assert!(include_dirs(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_package_dirs_passes_filters_before_package() {
        let runner = Arc::new(RecordingRunner::new(|_| stdout("/ws/devel/lib/talker\n")));
        let ctx = sourced(Path::new("/ws"), Arc::clone(&runner));

        let dirs = package_dirs(&ctx, "talker", &["--libexec", "--share"]).await.unwrap();

        assert_eq!(dirs, vec!["/ws/devel/lib/talker"]);
        assert_eq!(
            runner.command_lines(),
            vec!["catkin_find --without-underlays --libexec --share talker"]
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_process_error() {
        let ctx = sourced(
            Path::new("/ws"),
            Arc::new(RecordingRunner::new(|inv| failure(inv, "boom"))),
        );
        assert!(matches!(
            include_dirs(&ctx).await,
            Err(PackageError::Process(ProcessError::NonZeroExit { .. }))
        ));
    }

    #[tokio::test]
    async fn test_launch_files_walks_share_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let share = dir.path().join("share").join("demo");
        fs::create_dir_all(share.join("launch").join(".hidden")).unwrap();
        fs::write(share.join("launch").join("demo.launch"), "<launch/>").unwrap();
        fs::write(share.join("launch").join(".hidden").join("secret.launch"), "<launch/>").unwrap();
        fs::write(share.join("package.xml"), "<package/>").unwrap();

        let listing = format!("{}\n{}\n/does/not/exist\n", share.display(), share.display());
        let ctx = sourced(dir.path(), Arc::new(RecordingRunner::new(move |_| stdout(&listing))));

        let files = launch_files(&ctx, "demo").await.unwrap();

        assert_eq!(
            files,
            vec![
                share.join("launch").join(".hidden").join("secret.launch"),
                share.join("launch").join("demo.launch"),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_executables_require_execute_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib").join("demo");
        fs::create_dir_all(&lib).unwrap();
        let node = lib.join("talker");
        fs::write(&node, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&node, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(lib.join("notes.txt"), "").unwrap();

        let listing = format!("{}\n", lib.display());
        let ctx = sourced(dir.path(), Arc::new(RecordingRunner::new(move |_| stdout(&listing))));

        assert_eq!(executables(&ctx, "demo").await.unwrap(), vec![node]);
    }
}
