//! Configuration type definitions

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::application::ReconcileOptions;
use crate::domain::services::DEFAULT_LARGE_FILE_THRESHOLD;
use crate::domain::value_objects::{ConfigWarning, HostKeyChecking, RemoteLayout, RemoteTarget};
use crate::error::ConfigError;

use super::loader;

/// `humantime` strings such as `10s` or `5m`.
mod duration_str {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

mod host_key_checking {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &HostKeyChecking,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_ssh_option())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HostKeyChecking, D::Error> {
        let text = String::deserialize(deserializer)?;
        HostKeyChecking::parse(&text).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected \"no\", \"accept-new\" or \"yes\", found \"{}\"",
                text
            ))
        })
    }
}

/// `[ssh]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub user: String,
    /// Sent through askpass. The controller image ships with an empty one.
    pub password: String,
    pub port: u16,
    #[serde(with = "duration_str")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_str")]
    pub command_timeout: Duration,
    #[serde(with = "host_key_checking")]
    pub host_key_checking: HostKeyChecking,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "lvuser".to_string(),
            password: String::new(),
            port: 22,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(300),
            host_key_checking: HostKeyChecking::No,
        }
    }
}

/// `[remote]`, paths and tools on the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub deploy_dir: String,
    pub code_subdir: String,
    pub staging_subdir: String,
    pub python: String,
    pub kill_script: String,
    pub owner: String,
    pub profile_scripts: Vec<String>,
    pub library_path: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let layout = RemoteLayout::default();
        Self {
            deploy_dir: layout.deploy_dir,
            code_subdir: layout.code_subdir,
            staging_subdir: layout.staging_subdir,
            python: layout.python,
            kill_script: layout.kill_script,
            owner: layout.owner,
            profile_scripts: layout.profile_scripts,
            library_path: layout.library_path,
        }
    }
}

/// `[deploy]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub main_file: String,
    /// Bytes
    pub large_file_threshold: u64,
    /// Refused as project roots, in addition to `/` and the home directory
    pub forbidden_roots: Vec<PathBuf>,
    /// `{main}` is replaced with `main_file`
    pub test_command: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            main_file: "robot.py".to_string(),
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            forbidden_roots: Vec::new(),
            test_command: ["python3", "-m", "robotpy", "--main", "{main}", "test"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// `[packages]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Never uninstalled, in addition to pip itself
    pub keep: Vec<String>,
    pub pip_install_args: Vec<String>,
    /// SSH user for package changes; the deploy user cannot write
    /// site-packages
    pub user: String,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            keep: ReconcileOptions::default().keep.into_iter().collect(),
            pip_install_args: Vec::new(),
            user: ReconcileOptions::default().user,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub packages: PackagesConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (config, _warnings) = loader::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        loader::load_with_warnings(path)
    }

    /// User config overlaid with the project config, then environment overrides.
    pub fn load_layered(project_root: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        loader::load_layered(project_root)
    }

    /// Apply environment variable overrides (ROBODEPLOY_* prefix)
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        loader::with_env_overrides(self)
    }

    /// Connection parameters for `host`.
    pub fn target(&self, host: &str) -> RemoteTarget {
        RemoteTarget::new(host, self.ssh.user.clone())
            .with_password(self.ssh.password.clone())
            .with_port(self.ssh.port)
            .with_connect_timeout(self.ssh.connect_timeout)
            .with_command_timeout(self.ssh.command_timeout)
            .with_host_key_checking(self.ssh.host_key_checking)
    }

    pub fn layout(&self) -> RemoteLayout {
        let remote = self.remote.clone();
        RemoteLayout {
            deploy_dir: remote.deploy_dir,
            code_subdir: remote.code_subdir,
            staging_subdir: remote.staging_subdir,
            python: remote.python,
            kill_script: remote.kill_script,
            owner: remote.owner,
            profile_scripts: remote.profile_scripts,
            library_path: remote.library_path,
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions::default()
            .with_keep(self.packages.keep.iter().cloned())
            .with_pip_install_args(self.packages.pip_install_args.clone())
            .with_user(self.packages.user.clone())
    }
}
