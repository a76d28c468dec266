//! Home directory resolution with test isolation support.
//!
//! `dirs::home_dir()` ignores `HOME` on Windows, so tests set
//! `ROBODEPLOY_TEST_HOME` instead. Only functional paths (the user config
//! file) go through `robodeploy_home_dir()`; the unsafe-root check in the
//! deploy pipeline always uses the real home directory.

use std::path::PathBuf;

/// Overrides the home directory for robodeploy's own files.
pub const ROBODEPLOY_TEST_HOME_VAR: &str = "ROBODEPLOY_TEST_HOME";

/// Home directory for robodeploy-owned paths, e.g. `~/.robodeploy/config.toml`.
pub fn robodeploy_home_dir() -> Option<PathBuf> {
    std::env::var(ROBODEPLOY_TEST_HOME_VAR)
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}
