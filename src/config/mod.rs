//! Configuration module for robodeploy
//!
//! Configuration hierarchy, highest priority first:
//! 1. CLI flags
//! 2. Environment variables (ROBODEPLOY_*)
//! 3. Project config (<project>/.robodeploy/config.toml)
//! 4. User config (~/.config/robodeploy/config.toml)
//! 5. Built-in defaults

mod loader;
mod types;

pub use crate::domain::value_objects::ConfigWarning;

pub use loader::{
    apply_overrides, load_files, user_config_path, ENV_DEPLOY_DIR, ENV_LARGE_FILE_THRESHOLD,
    ENV_SSH_PASSWORD, ENV_SSH_USER, PROJECT_CONFIG_PATH,
};
pub use types::{Config, DeployConfig, PackagesConfig, RemoteConfig, SshConfig};
