//! Git-backed build environment

use std::env;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::domain::entities::VcsInfo;
use crate::domain::ports::BuildEnvironment;
use crate::infrastructure::process::run_with_timeout;

const GIT_TIMEOUT: Duration = Duration::from_secs(10);
const UNKNOWN: &str = "unknown";

/// Run `git <args>` in `root`; `None` on any failure.
fn git(program: &str, root: &Path, args: &[&str]) -> Option<String> {
    let mut cmd = Command::new(program);
    cmd.arg("-C").arg(root).args(args);
    let label = format!("git {}", args.join(" "));
    let output = match run_with_timeout(&mut cmd, GIT_TIMEOUT, &label, None) {
        Ok(output) => output,
        Err(err) => {
            tracing::debug!(event = "vcs.git_failed", command = %label, error = %err);
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Describe the git working copy containing `root`.
pub fn probe_git(program: &str, root: &Path) -> Option<VcsInfo> {
    if git(program, root, &["rev-parse", "--is-inside-work-tree"])? != "true" {
        return None;
    }
    // A fresh repository has no HEAD yet.
    let revision = git(program, root, &["rev-parse", "HEAD"])?;
    let description = git(program, root, &["describe", "--dirty=-dirty", "--always"])
        .unwrap_or_else(|| revision.clone());
    let branch = git(program, root, &["rev-parse", "--abbrev-ref", "HEAD"])
        .unwrap_or_else(|| UNKNOWN.to_string());
    let dirty = git(program, root, &["status", "--porcelain"])
        .map(|s| !s.is_empty())
        .unwrap_or(false);

    Some(VcsInfo {
        revision,
        description,
        branch,
        dirty,
    })
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// The operator's machine: environment, clock and git.
#[derive(Debug, Clone)]
pub struct LocalBuildEnvironment {
    git_program: String,
}

impl Default for LocalBuildEnvironment {
    fn default() -> Self {
        Self {
            git_program: "git".to_string(),
        }
    }
}

impl LocalBuildEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }
}

impl BuildEnvironment for LocalBuildEnvironment {
    fn hostname(&self) -> String {
        let name = gethostname::gethostname().to_string_lossy().trim().to_string();
        if name.is_empty() {
            UNKNOWN.to_string()
        } else {
            name
        }
    }

    fn username(&self) -> String {
        non_empty_var("USER")
            .or_else(|| non_empty_var("USERNAME"))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn vcs_info(&self, root: &Path) -> Option<VcsInfo> {
        probe_git(&self.git_program, root)
    }
}
