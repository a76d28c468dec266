//! Project stager
//!
//! Walks the project tree, drops excluded entries, and copies everything else
//! into a private scratch directory. The deploy then reads only the copy, so
//! edits made to the project while a deploy runs cannot leak into it.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::{DirEntry, WalkDir};

use crate::domain::entities::{ProjectSnapshot, StagedFile};
use crate::domain::ports::ProjectStager;
use crate::domain::value_objects::{ExclusionRuleSet, IgnorePatterns, TreeHasher};
use crate::error::StagingError;

/// Stages a project directory from the local disk.
#[derive(Debug, Clone)]
pub struct FileStager {
    rules: ExclusionRuleSet,
    use_ignore_file: bool,
}

impl Default for FileStager {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStager {
    pub fn new() -> Self {
        Self {
            rules: ExclusionRuleSet::new(),
            use_ignore_file: true,
        }
    }

    /// Disable `.deployignore` processing.
    pub fn without_ignore_file(mut self) -> Self {
        self.use_ignore_file = false;
        self
    }

    fn admits(&self, entry: &DirEntry, root: &Path, ignore: &IgnorePatterns) -> bool {
        // The root itself is never filtered by name.
        if entry.depth() == 0 {
            return true;
        }
        let is_dir = entry.file_type().is_dir();
        if let Some(rule) = self.rules.segment_rule(entry.file_name(), is_dir) {
            tracing::trace!(path = %entry.path().display(), %rule, "excluded");
            return false;
        }
        match entry.path().strip_prefix(root) {
            Ok(rel) => !ignore.is_ignored(rel, is_dir),
            Err(_) => false,
        }
    }
}

impl ProjectStager for FileStager {
    fn stage(&self, project_root: &Path) -> Result<ProjectSnapshot, StagingError> {
        if !project_root.is_dir() {
            return Err(StagingError::NotADirectory(project_root.to_path_buf()));
        }
        let root = project_root
            .canonicalize()
            .map_err(|_| StagingError::NotADirectory(project_root.to_path_buf()))?;

        let ignore = if self.use_ignore_file {
            IgnorePatterns::load(&root).map_err(|e| StagingError::IgnoreFile(e.to_string()))?
        } else {
            IgnorePatterns::empty()
        };

        let scratch = TempDir::new().map_err(StagingError::Scratch)?;
        let mut files = Vec::new();
        let mut hasher = TreeHasher::new();

        // Symlinks are followed; walkdir reports a loop instead of descending into it.
        let walker = WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.admits(e, &root, &ignore));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.loop_ancestor().is_some() => {
                    tracing::warn!(
                        event = "stage.symlink_loop",
                        path = ?err.path(),
                        "skipping symlink loop"
                    );
                    continue;
                }
                Err(err) => {
                    return Err(StagingError::Walk {
                        path: err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                        source: err,
                    })
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = match entry.path().strip_prefix(&root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            let copy_err = |source: std::io::Error| StagingError::Copy {
                path: rel.clone(),
                source,
            };

            let content = fs::read(entry.path()).map_err(copy_err)?;
            let staged_path = scratch.path().join(&rel);
            if let Some(parent) = staged_path.parent() {
                fs::create_dir_all(parent).map_err(copy_err)?;
            }
            fs::write(&staged_path, &content).map_err(copy_err)?;
            let mode = entry.metadata().map(|m| file_mode(&m)).unwrap_or(0o644);

            hasher.update(&rel, &content);
            files.push(StagedFile::new(rel, staged_path, content.len() as u64, mode));
        }

        tracing::debug!(
            event = "stage.done",
            root = %root.display(),
            files = files.len(),
            ignore_patterns = ignore.pattern_count()
        );

        let scratch_root: PathBuf = scratch.path().to_path_buf();
        Ok(ProjectSnapshot::new(root, scratch_root, files, hasher.finish()).owning_scratch(scratch))
    }
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
