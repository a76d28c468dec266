//! Build manifest entity
//!
//! Recorded into the snapshot as `deploy.json` so the controller can answer
//! "which source state is running" without remote-side logs.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Name of the manifest inside the deployed code directory.
pub const MANIFEST_FILE_NAME: &str = "deploy.json";

/// Version-control state of the deployed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsInfo {
    /// Full revision id
    pub revision: String,
    /// Human description, e.g. `v1.2-3-gabc123-dirty`
    pub description: String,
    pub branch: String,
    pub dirty: bool,
}

/// Who deployed what, from where, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildManifest {
    pub deploy_host: String,
    pub deploy_user: String,
    /// Local time, second precision
    pub deploy_date: NaiveDateTime,
    pub code_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,
}

impl BuildManifest {
    pub fn new(
        deploy_host: impl Into<String>,
        deploy_user: impl Into<String>,
        deploy_date: NaiveDateTime,
        code_path: impl Into<String>,
    ) -> Self {
        Self {
            deploy_host: deploy_host.into(),
            deploy_user: deploy_user.into(),
            deploy_date: deploy_date.with_nanosecond(0).unwrap_or(deploy_date),
            code_path: code_path.into(),
            snapshot_hash: None,
            git_hash: None,
            git_desc: None,
            git_branch: None,
            git_dirty: None,
        }
    }

    pub fn with_snapshot_hash(mut self, hash: impl Into<String>) -> Self {
        self.snapshot_hash = Some(hash.into());
        self
    }

    pub fn with_vcs(mut self, vcs: VcsInfo) -> Self {
        self.git_hash = Some(vcs.revision);
        self.git_desc = Some(vcs.description);
        self.git_branch = Some(vcs.branch);
        self.git_dirty = Some(vcs.dirty);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
