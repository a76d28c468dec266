//! Built-in exclusion rules for the deploy snapshot
//!
//! Evaluated per path segment while walking the project tree. A directory
//! that matches is pruned, so nothing below it is ever visited.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path};

/// Version-control metadata directories.
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn", ".bzr", "CVS", "_darcs"];

/// Compiled-bytecode cache directories.
const BYTECODE_DIRS: &[&str] = &["__pycache__"];

/// Virtual-environment directory conventions.
const VENV_DIRS: &[&str] = &["venv", ".venv"];

/// Simulator output that never belongs on the controller.
const SIM_DIRS: &[&str] = &["ctre_sim"];

/// Build-artifact extensions: bytecode, wheels, packages, archives and log captures.
const ARTIFACT_EXTENSIONS: &[&str] = &[
    "pyc", "pyo", "whl", "ipk", "zip", "gz", "tgz", "tar", "bz2", "xz", "7z", "wpilog",
];

/// Why a path segment was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Segment starts with `.`
    Hidden,
    /// Version-control metadata directory
    VersionControl,
    /// Compiled-bytecode cache directory
    BytecodeCache,
    /// Virtual-environment directory
    VirtualEnv,
    /// Simulator output directory
    SimulationArtifacts,
    /// File with a build-artifact extension
    ArtifactExtension,
    /// Matched a `.deployignore` pattern
    IgnoreFile,
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Hidden => "hidden entry",
            Self::VersionControl => "version-control metadata",
            Self::BytecodeCache => "bytecode cache",
            Self::VirtualEnv => "virtual environment",
            Self::SimulationArtifacts => "simulation artifacts",
            Self::ArtifactExtension => "build artifact",
            Self::IgnoreFile => ".deployignore",
        };
        f.write_str(label)
    }
}

/// The static rule set applied during one deploy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusionRuleSet;

impl ExclusionRuleSet {
    pub fn new() -> Self {
        Self
    }

    /// First rule matching a single path segment, in evaluation order.
    ///
    /// Directory-only rules (VCS, caches, venvs) apply when `is_dir` is true;
    /// extension rules apply to files only.
    pub fn segment_rule(&self, name: &OsStr, is_dir: bool) -> Option<ExclusionRule> {
        let name = name.to_string_lossy();

        if name.starts_with('.') {
            return Some(ExclusionRule::Hidden);
        }
        if is_dir {
            if VCS_DIRS.contains(&name.as_ref()) {
                return Some(ExclusionRule::VersionControl);
            }
            if BYTECODE_DIRS.contains(&name.as_ref()) {
                return Some(ExclusionRule::BytecodeCache);
            }
            if VENV_DIRS.contains(&name.as_ref()) {
                return Some(ExclusionRule::VirtualEnv);
            }
            if SIM_DIRS.contains(&name.as_ref()) {
                return Some(ExclusionRule::SimulationArtifacts);
            }
            return None;
        }

        let extension = Path::new(name.as_ref())
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match extension {
            Some(ext) if ARTIFACT_EXTENSIONS.contains(&ext.as_str()) => {
                Some(ExclusionRule::ArtifactExtension)
            }
            _ => None,
        }
    }

    /// First rule matching any segment of a relative file path.
    ///
    /// Every segment but the last is treated as a directory.
    pub fn excludes_path(&self, rel_path: &Path) -> Option<ExclusionRule> {
        let segments: Vec<&OsStr> = rel_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s),
                _ => None,
            })
            .collect();
        let last = segments.len().saturating_sub(1);

        segments
            .iter()
            .enumerate()
            .find_map(|(i, segment)| self.segment_rule(segment, i < last))
    }
}
