// src/models.rs

use crate::constants::{DEFAULT_MASTER_URI, ROS_DISTRO_VAR, ROS_MASTER_URI_VAR, ROS_ROOT_VAR};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// --- WORKSPACE ---

/// The catkin flavor governing a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuildSystem {
    /// No marker found; rosdev stays inactive.
    None,
    /// `catkin_make`, marked by `.catkin_workspace`.
    CatkinMake,
    /// catkin tools, marked by `.catkin_tools`.
    CatkinTools,
}

impl BuildSystem {
    pub fn is_active(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::CatkinMake => "catkin_make",
            Self::CatkinTools => "catkin tools",
        };
        f.write_str(label)
    }
}

/// Where the workspace lives and which build system it uses.
/// Detected once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDescriptor {
    pub root: PathBuf,
    pub build_system: BuildSystem,
}

impl WorkspaceDescriptor {
    /// A descriptor for a directory that is not inside any workspace.
    pub fn none(start: &Path) -> Self {
        Self {
            root: start.to_path_buf(),
            build_system: BuildSystem::None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.build_system.is_active()
    }

    /// Default parent directory for new packages.
    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }
}

// --- ENVIRONMENT ---

/// A sourced environment: variable name to value, in the order the setup
/// script dumped them. Always replaced wholesale, never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvironmentMapping {
    vars: IndexMap<String, String>,
}

impl EnvironmentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `NAME=VALUE` lines, as printed by `env` or `set`.
    ///
    /// The key is everything before the first `=`; the value is the rest of the
    /// line, further `=` included. Lines without `=` or with an empty key are
    /// skipped. A repeated key keeps its last value.
    pub fn parse(output: &str) -> Self {
        let mut vars = IndexMap::new();
        for line in output.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            vars.insert(key.to_string(), value.to_string());
        }
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    /// True when a ROS setup script has been sourced into this mapping.
    pub fn is_ros(&self) -> bool {
        self.get(ROS_ROOT_VAR).is_some_and(|v| !v.is_empty())
    }

    pub fn master_uri(&self) -> &str {
        self.get(ROS_MASTER_URI_VAR)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_MASTER_URI)
    }

    pub fn distro(&self) -> Option<&str> {
        self.get(ROS_DISTRO_VAR)
    }
}

impl FromIterator<(String, String)> for EnvironmentMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

// --- PACKAGES ---

/// Package name to package path, as reported by `rospack list`.
/// Rebuilt from scratch on every query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageIndex {
    packages: HashMap<String, PathBuf>,
}

impl PackageIndex {
    /// Parses `name path` lines. The name ends at the first whitespace run and
    /// the rest of the line is the path. Malformed lines are skipped.
    pub fn parse(output: &str) -> Self {
        let mut packages = HashMap::new();
        for line in output.lines() {
            let line = line.trim();
            let Some((name, path)) = line.split_once(char::is_whitespace) else {
                if !line.is_empty() {
                    log::debug!("Skipping malformed package line: '{}'", line);
                }
                continue;
            };
            let path = path.trim();
            if path.is_empty() {
                continue;
            }
            packages.insert(name.to_string(), PathBuf::from(path));
        }
        Self { packages }
    }

    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.packages.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Package names, sorted for display.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.packages.keys().cloned().collect();
        names.sort();
        names
    }

    /// `(name, path)` pairs, sorted by name.
    pub fn entries(&self) -> Vec<(&str, &Path)> {
        let mut entries: Vec<(&str, &Path)> = self
            .packages
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

// --- CONFIGURATION (config.toml) ---

/// User configuration, stored in `<config_dir>/rosdev/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosDevConfig {
    /// ROS distro to source, e.g. `noetic`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro: Option<String>,
    /// Where distros are installed. Defaults to `/opt/ros` (`C:\opt\ros` on Windows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_root: Option<String>,
    /// Polling period for `status --watch`, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_interval_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment_splits_on_first_equals() {
        let env = EnvironmentMapping::parse("A=1\nB=2=3\n");
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), Some("2=3"));
    }

    #[test]
    fn test_parse_environment_skips_noise_and_keeps_order() {
        let env = EnvironmentMapping::parse("Z=last\r\nnot a pair\n=orphan\nEMPTY=\nA=first\n");
        let keys: Vec<&String> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Z", "EMPTY", "A"]);
        assert_eq!(env.get("Z"), Some("last"));
        assert_eq!(env.get("EMPTY"), Some(""));
    }

    #[test]
    fn test_ros_detection_and_master_uri_default() {
        let mut env = EnvironmentMapping::parse("PATH=/usr/bin\n");
        assert!(!env.is_ros());
        assert_eq!(env.master_uri(), DEFAULT_MASTER_URI);

        env.insert(ROS_ROOT_VAR, "/opt/ros/noetic/share/ros");
        env.insert(ROS_MASTER_URI_VAR, "http://robot:11311");
        assert!(env.is_ros());
        assert_eq!(env.master_uri(), "http://robot:11311");
    }

    #[test]
    fn test_parse_package_index() {
        let index = PackageIndex::parse("foo /opt/ws/foo\nbar /opt/ws/bar\n");
        assert_eq!(index.len(), 2);
        assert_eq!(index.path_of("foo"), Some(Path::new("/opt/ws/foo")));
        assert_eq!(index.path_of("bar"), Some(Path::new("/opt/ws/bar")));
        assert_eq!(index.names(), vec!["bar".to_string(), "foo".to_string()]);
    }

    #[test]
    fn test_parse_package_index_tolerates_odd_lines() {
        let index = PackageIndex::parse("\nlonely\nspaced /home/me/my ws/pkg\n");
        assert_eq!(index.len(), 1);
        assert_eq!(index.path_of("spaced"), Some(Path::new("/home/me/my ws/pkg")));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = RosDevConfig {
            distro: Some("noetic".to_string()),
            install_root: None,
            status_interval_ms: Some(500),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(!text.contains("install_root"));
        let parsed: RosDevConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
