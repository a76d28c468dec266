//! Large file guard
//!
//! The controller has little storage and a slow link, so oversized files need
//! an explicit operator decision before they are shipped.

use std::path::PathBuf;

use crate::domain::entities::ProjectSnapshot;

/// 250 KiB
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 256_000;

/// A staged file above the size threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Result of partitioning a snapshot by size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LargeFileReport {
    pub normal_count: usize,
    pub oversized: Vec<LargeFile>,
}

impl LargeFileReport {
    pub fn is_clean(&self) -> bool {
        self.oversized.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeFileGuard {
    threshold: u64,
}

impl Default for LargeFileGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LARGE_FILE_THRESHOLD)
    }
}

impl LargeFileGuard {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// A file is oversized when strictly larger than the threshold.
    pub fn inspect(&self, snapshot: &ProjectSnapshot) -> LargeFileReport {
        let mut report = LargeFileReport::default();
        for file in snapshot.files() {
            if file.size() > self.threshold {
                report.oversized.push(LargeFile {
                    path: file.relative_path().to_path_buf(),
                    size: file.size(),
                });
            } else {
                report.normal_count += 1;
            }
        }
        report
    }
}
