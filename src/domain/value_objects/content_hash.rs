//! Content hash value object
//!
//! Identifies the exact bytes of a staged snapshot so that `deploy.json` on
//! the controller can be matched back to a local tree.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 digest rendered as `sha256:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub const PREFIX: &'static str = "sha256:";

    pub fn from_bytes(content: &[u8]) -> Self {
        Self(format!("{}{:x}", Self::PREFIX, Sha256::digest(content)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hex(&self) -> &str {
        self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental digest over `(relative path, content)` pairs.
///
/// Feed entries in sorted path order; the path and a length prefix are mixed
/// in so that moving bytes between files changes the digest.
#[derive(Default)]
pub struct TreeHasher {
    hasher: Sha256,
}

impl TreeHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, rel_path: &Path, content: &[u8]) {
        let path = rel_path.to_string_lossy();
        self.hasher.update((path.len() as u64).to_le_bytes());
        self.hasher.update(path.as_bytes());
        self.hasher.update((content.len() as u64).to_le_bytes());
        self.hasher.update(content);
    }

    pub fn finish(self) -> ContentHash {
        ContentHash(format!("{}{:x}", ContentHash::PREFIX, self.hasher.finalize()))
    }
}
