//! Build metadata
//!
//! Captures who deployed which source state and embeds it in the snapshot
//! as `deploy.json`.

use std::fs;
use std::path::PathBuf;

use crate::domain::entities::{BuildManifest, ProjectSnapshot, StagedFile, MANIFEST_FILE_NAME};
use crate::domain::ports::BuildEnvironment;
use crate::error::StagingError;

pub struct BuildMetadataWriter<'a> {
    environment: &'a dyn BuildEnvironment,
}

impl<'a> BuildMetadataWriter<'a> {
    pub fn new(environment: &'a dyn BuildEnvironment) -> Self {
        Self { environment }
    }

    /// Gather provenance for `snapshot`. Missing VCS context is omitted, not an error.
    pub fn capture(&self, snapshot: &ProjectSnapshot) -> BuildManifest {
        let root = snapshot.source_root();
        let manifest = BuildManifest::new(
            self.environment.hostname(),
            self.environment.username(),
            self.environment.now(),
            root.display().to_string(),
        )
        .with_snapshot_hash(snapshot.content_hash().as_str());

        match self.environment.vcs_info(root) {
            Some(vcs) => {
                tracing::debug!(
                    event = "build.vcs",
                    revision = %vcs.revision,
                    dirty = vcs.dirty
                );
                manifest.with_vcs(vcs)
            }
            None => {
                tracing::debug!(event = "build.no_vcs", root = %root.display());
                manifest
            }
        }
    }

    /// Write the manifest into the snapshot's scratch space and attach it.
    pub fn embed(&self, snapshot: ProjectSnapshot) -> Result<ProjectSnapshot, StagingError> {
        let manifest = self.capture(&snapshot);
        let json = manifest
            .to_json()
            .map_err(|e| StagingError::Manifest(e.to_string()))?;

        let staged_path = snapshot.scratch_root().join(MANIFEST_FILE_NAME);
        fs::write(&staged_path, &json).map_err(|e| StagingError::Manifest(e.to_string()))?;

        let file = StagedFile::new(
            PathBuf::from(MANIFEST_FILE_NAME),
            staged_path,
            json.len() as u64,
            0o644,
        );
        Ok(snapshot.with_manifest(manifest, file))
    }
}
