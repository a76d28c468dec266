//! Configuration loading and layering

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::value_objects::ConfigWarning;
use crate::error::ConfigError;
use crate::infrastructure::fs::ROBODEPLOY_TEST_HOME_VAR;

use super::types::Config;

/// Project config, relative to the project root.
pub const PROJECT_CONFIG_PATH: &str = ".robodeploy/config.toml";

pub const ENV_SSH_USER: &str = "ROBODEPLOY_SSH_USER";
pub const ENV_SSH_PASSWORD: &str = "ROBODEPLOY_SSH_PASSWORD";
pub const ENV_LARGE_FILE_THRESHOLD: &str = "ROBODEPLOY_LARGE_FILE_THRESHOLD";
pub const ENV_DEPLOY_DIR: &str = "ROBODEPLOY_DEPLOY_DIR";

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn check(path: &Path, content: &str) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| parse_error(path, e))?;

    let warnings = unknown_paths
        .into_iter()
        .map(|key| {
            let leaf = key.split('.').next_back().unwrap_or(key.as_str()).to_string();
            ConfigWarning {
                line: find_line_number(content, &leaf),
                suggestion: suggest_key(&leaf),
                file: path.to_path_buf(),
                key,
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Load one file and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let content = read(path)?;
    check(path, &content)
}

/// `<config_dir>/robodeploy/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(home) = std::env::var(ROBODEPLOY_TEST_HOME_VAR) {
        return Some(PathBuf::from(home).join(".config/robodeploy/config.toml"));
    }
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("robodeploy/config.toml"))
}

/// Recursively overlay `upper` onto `lower`. Tables merge; anything else replaces.
fn merge(lower: &mut toml::Table, upper: toml::Table) {
    for (key, value) in upper {
        match (lower.get_mut(&key), value) {
            (Some(toml::Value::Table(below)), toml::Value::Table(above)) => merge(below, above),
            (_, value) => {
                lower.insert(key, value);
            }
        }
    }
}

/// Merge the given files in order, later files winning key by key.
pub fn load_files(paths: &[PathBuf]) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let mut merged = toml::Table::new();
    let mut warnings = Vec::new();

    for path in paths {
        let content = read(path)?;
        let (_, file_warnings) = check(path, &content)?;
        warnings.extend(file_warnings);
        let table: toml::Table = content.parse().map_err(|e| parse_error(path, e))?;
        tracing::debug!(event = "config.loaded", path = %path.display());
        merge(&mut merged, table);
    }

    let config = toml::Value::Table(merged)
        .try_into::<Config>()
        .map_err(|e| ConfigError::Parse {
            path: paths.last().cloned().unwrap_or_default(),
            message: e.to_string(),
        })?;
    Ok((config, warnings))
}

/// Defaults, then user config, then project config, then `ROBODEPLOY_*`.
pub fn load_layered(project_root: &Path) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let mut paths = Vec::new();
    if let Some(user) = user_config_path().filter(|p| p.is_file()) {
        paths.push(user);
    }
    let project = project_root.join(PROJECT_CONFIG_PATH);
    if project.is_file() {
        paths.push(project);
    }

    let (config, warnings) = load_files(&paths)?;
    Ok((with_env_overrides(config)?, warnings))
}

/// Apply environment variable overrides (ROBODEPLOY_* prefix)
pub fn with_env_overrides(config: Config) -> Result<Config, ConfigError> {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Apply overrides from `lookup`, which maps a variable name to its value.
pub fn apply_overrides(
    mut config: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    if let Some(user) = lookup(ENV_SSH_USER).filter(|v| !v.is_empty()) {
        config.ssh.user = user;
    }

    // An empty password is meaningful: it is the controller default.
    if let Some(password) = lookup(ENV_SSH_PASSWORD) {
        config.ssh.password = password;
    }

    if let Some(raw) = lookup(ENV_LARGE_FILE_THRESHOLD) {
        config.deploy.large_file_threshold =
            raw.trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                    key: ENV_LARGE_FILE_THRESHOLD.to_string(),
                    message: format!("'{}': {}", raw, e),
                })?;
    }

    if let Some(dir) = lookup(ENV_DEPLOY_DIR).filter(|v| !v.is_empty()) {
        config.remote.deploy_dir = dir;
    }

    Ok(config)
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "ssh",
        "user",
        "password",
        "port",
        "connect_timeout",
        "command_timeout",
        "host_key_checking",
        "remote",
        "deploy_dir",
        "code_subdir",
        "staging_subdir",
        "python",
        "kill_script",
        "owner",
        "profile_scripts",
        "library_path",
        "deploy",
        "main_file",
        "large_file_threshold",
        "forbidden_roots",
        "test_command",
        "packages",
        "keep",
        "pip_install_args",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
