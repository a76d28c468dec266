//! Project snapshot entity
//!
//! The filtered copy of a project tree that is handed to the transport. Files
//! live in a scratch directory owned by the snapshot, so edits to the project
//! during a deploy cannot change what is uploaded.

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use super::BuildManifest;
use crate::domain::value_objects::ContentHash;

/// One file of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    relative_path: PathBuf,
    staged_path: PathBuf,
    size: u64,
    mode: u32,
}

impl StagedFile {
    pub fn new(relative_path: PathBuf, staged_path: PathBuf, size: u64, mode: u32) -> Self {
        Self {
            relative_path,
            staged_path,
            size,
            mode,
        }
    }

    /// Path relative to the project root
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Location of the frozen copy in scratch space
    pub fn staged_path(&self) -> &Path {
        &self.staged_path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Unix permission bits
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Relative path with `/` separators, for the remote side.
    pub fn remote_relative(&self) -> String {
        self.relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.staged_path)
    }
}

/// Filtered, frozen project tree plus its build manifest.
#[derive(Debug)]
pub struct ProjectSnapshot {
    source_root: PathBuf,
    scratch_root: PathBuf,
    files: Vec<StagedFile>,
    content_hash: ContentHash,
    manifest: Option<BuildManifest>,
    _scratch: Option<TempDir>,
}

impl ProjectSnapshot {
    /// Files are sorted by relative path.
    pub fn new(
        source_root: PathBuf,
        scratch_root: PathBuf,
        mut files: Vec<StagedFile>,
        content_hash: ContentHash,
    ) -> Self {
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Self {
            source_root,
            scratch_root,
            files,
            content_hash,
            manifest: None,
            _scratch: None,
        }
    }

    /// Tie the scratch directory's lifetime to this snapshot.
    pub fn owning_scratch(mut self, scratch: TempDir) -> Self {
        self._scratch = Some(scratch);
        self
    }

    /// Attach the manifest and the staged file it was written to.
    pub fn with_manifest(mut self, manifest: BuildManifest, file: StagedFile) -> Self {
        self.files
            .retain(|f| f.relative_path != file.relative_path);
        let at = self
            .files
            .partition_point(|f| f.relative_path < file.relative_path);
        self.files.insert(at, file);
        self.manifest = Some(manifest);
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn find(&self, relative_path: &Path) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.relative_path == relative_path)
    }

    /// Total size of every staged file, known before transport begins.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(StagedFile::size).sum()
    }

    /// Digest of the project files, excluding the manifest.
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    pub fn manifest(&self) -> Option<&BuildManifest> {
        self.manifest.as_ref()
    }

    /// Remote directories that must exist before the files are uploaded,
    /// parents before children.
    pub fn remote_directories(&self) -> Vec<String> {
        let mut dirs: Vec<String> = Vec::new();
        for file in &self.files {
            let rel = file.remote_relative();
            let mut prefix = String::new();
            let segments: Vec<&str> = rel.split('/').collect();
            for segment in &segments[..segments.len().saturating_sub(1)] {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(segment);
                if !dirs.contains(&prefix) {
                    dirs.push(prefix.clone());
                }
            }
        }
        dirs.sort();
        dirs
    }
}
