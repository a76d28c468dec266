//! Deploy Event Port
//!
//! Observable progress of a deploy: console output, NDJSON streams for
//! scripts, and assertions in tests all hang off this trait.

use std::path::PathBuf;

use crate::domain::services::LargeFile;
use crate::domain::value_objects::{AbortReason, DeployState};

/// Event emitted during a deploy
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// The pipeline moved to a new state
    StateChanged { from: DeployState, to: DeployState },

    /// Snapshot produced
    Staged { file_count: usize, total_bytes: u64 },

    /// Files above the threshold were found
    LargeFilesFound {
        files: Vec<LargeFile>,
        threshold: u64,
    },

    /// Local test suite started
    TestsStarted,

    /// Local test suite finished
    TestsFinished { status: i32 },

    /// Session to the controller is open
    Connected { host: String },

    /// Package changes planned for the controller
    PackagePlan { install: usize, uninstall: usize },

    /// Package reconciliation was skipped
    PackagesSkipped { reason: String },

    PackageUninstalled { name: String },

    PackageInstalled { name: String, version: String },

    /// One snapshot file reached the controller
    FileUploaded {
        index: usize,
        total: usize,
        path: PathBuf,
    },

    /// Stop/start sequence issued
    Restarting { debug: bool },

    /// Deploy finished successfully
    Completed {
        host: String,
        file_count: usize,
        total_bytes: u64,
    },

    /// Deploy stopped
    Aborted {
        from: DeployState,
        reason: AbortReason,
        error: String,
    },
}

/// Trait for receiving deploy events
///
/// Implementations:
/// - `ConsoleEventSink`: human progress through `tracing`
/// - `JsonEventSink`: NDJSON on stdout
/// - `NoopEventSink`: silent
pub trait DeployEventSink: Send + Sync {
    fn on_event(&self, event: DeployEvent);

    /// Whether this sink wants per-file and per-package events.
    fn wants_detailed_events(&self) -> bool {
        true
    }
}

pub struct NoopEventSink;

impl DeployEventSink for NoopEventSink {
    fn on_event(&self, _event: DeployEvent) {}

    fn wants_detailed_events(&self) -> bool {
        false
    }
}
