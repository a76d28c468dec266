//! `.deployignore` patterns
//!
//! Optional gitignore-syntax patterns at the project root, layered on top of
//! the built-in exclusion rules.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name looked up at the project root.
pub const DEPLOY_IGNORE_FILE: &str = ".deployignore";

/// Maximum accepted size of `.deployignore` (64KB)
const MAX_FILE_SIZE: u64 = 65536;

/// Patterns loaded from a project's `.deployignore`.
#[derive(Debug)]
pub struct IgnorePatterns {
    matcher: Option<Gitignore>,
    pattern_count: usize,
}

impl Default for IgnorePatterns {
    fn default() -> Self {
        Self::empty()
    }
}

impl IgnorePatterns {
    /// A pattern set that matches nothing.
    pub fn empty() -> Self {
        Self {
            matcher: None,
            pattern_count: 0,
        }
    }

    /// Load `.deployignore` from `project_root`; absent file means no patterns.
    pub fn load(project_root: &Path) -> Result<Self, IgnoreError> {
        let ignore_path = project_root.join(DEPLOY_IGNORE_FILE);
        if !ignore_path.is_file() {
            return Ok(Self::empty());
        }

        let metadata = fs::metadata(&ignore_path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(IgnoreError::FileTooLarge {
                path: ignore_path,
                size: metadata.len(),
            });
        }

        let content = fs::read_to_string(&ignore_path)?;
        Self::from_content(project_root, &ignore_path, &content)
    }

    pub fn from_content(
        root: &Path,
        source_path: &Path,
        content: &str,
    ) -> Result<Self, IgnoreError> {
        let mut builder = GitignoreBuilder::new(root);
        let mut pattern_count = 0;

        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            pattern_count += 1;
            builder
                .add_line(Some(source_path.to_path_buf()), line)
                .map_err(|e| IgnoreError::InvalidPattern {
                    line: index + 1,
                    pattern: line.to_string(),
                    message: e.to_string(),
                })?;
        }

        if pattern_count == 0 {
            return Ok(Self::empty());
        }

        let matcher = builder
            .build()
            .map_err(|e| IgnoreError::BuildFailed(e.to_string()))?;
        Ok(Self {
            matcher: Some(matcher),
            pattern_count,
        })
    }

    /// Whether `rel_path` (relative to the project root) is ignored.
    pub fn is_ignored(&self, rel_path: &Path, is_dir: bool) -> bool {
        match &self.matcher {
            Some(matcher) => matcher
                .matched_path_or_any_parents(rel_path, is_dir)
                .is_ignore(),
            None => false,
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

/// Problems with a `.deployignore` file.
#[derive(Error, Debug)]
pub enum IgnoreError {
    #[error("{} exceeds the {}KB limit ({size} bytes)", path.display(), MAX_FILE_SIZE / 1024)]
    FileTooLarge { path: PathBuf, size: u64 },

    #[error("invalid pattern on line {line}: '{pattern}' - {message}")]
    InvalidPattern {
        line: usize,
        pattern: String,
        message: String,
    },

    #[error("failed to build ignore matcher: {0}")]
    BuildFailed(String),

    #[error("failed to read .deployignore: {0}")]
    Io(#[from] std::io::Error),
}
