//! JSON Event Sink
//!
//! Outputs deploy events as NDJSON for scripts and CI.

use crate::domain::ports::{DeployEvent, DeployEventSink};
use std::io::{self, Write};
use std::sync::Mutex;

/// Event sink that outputs NDJSON events to stdout
pub struct JsonEventSink {
    /// Mutex to ensure thread-safe writes
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventSink {
    /// Create a new JSON event sink writing to stdout
    pub fn stdout() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Create a JSON event sink writing to a custom writer
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn write_event(&self, event: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", event);
            let _ = writer.flush();
        }
    }
}

/// The NDJSON form of one event.
pub fn event_to_json(event: &DeployEvent) -> serde_json::Value {
    match event {
        DeployEvent::StateChanged { from, to } => serde_json::json!({
            "event": "state",
            "from": from.to_string(),
            "to": to.to_string(),
        }),

        DeployEvent::Staged {
            file_count,
            total_bytes,
        } => serde_json::json!({
            "event": "staged",
            "files": file_count,
            "bytes": total_bytes,
        }),

        DeployEvent::LargeFilesFound { files, threshold } => serde_json::json!({
            "event": "large_files",
            "threshold": threshold,
            "files": files
                .iter()
                .map(|f| serde_json::json!({
                    "path": f.path.display().to_string(),
                    "size": f.size,
                }))
                .collect::<Vec<_>>(),
        }),

        DeployEvent::TestsStarted => serde_json::json!({ "event": "tests_start" }),

        DeployEvent::TestsFinished { status } => serde_json::json!({
            "event": "tests_finished",
            "status": status,
        }),

        DeployEvent::Connected { host } => serde_json::json!({
            "event": "connected",
            "host": host,
        }),

        DeployEvent::PackagePlan { install, uninstall } => serde_json::json!({
            "event": "package_plan",
            "install": install,
            "uninstall": uninstall,
        }),

        DeployEvent::PackagesSkipped { reason } => serde_json::json!({
            "event": "packages_skipped",
            "reason": reason,
        }),

        DeployEvent::PackageUninstalled { name } => serde_json::json!({
            "event": "package_uninstalled",
            "name": name,
        }),

        DeployEvent::PackageInstalled { name, version } => serde_json::json!({
            "event": "package_installed",
            "name": name,
            "version": version,
        }),

        DeployEvent::FileUploaded { index, total, path } => serde_json::json!({
            "event": "item_uploaded",
            "index": index,
            "total": total,
            "path": path.display().to_string(),
        }),

        DeployEvent::Restarting { debug } => serde_json::json!({
            "event": "restarting",
            "debug": debug,
        }),

        DeployEvent::Completed {
            host,
            file_count,
            total_bytes,
        } => serde_json::json!({
            "event": "complete",
            "status": "success",
            "host": host,
            "files": file_count,
            "bytes": total_bytes,
        }),

        DeployEvent::Aborted {
            from,
            reason,
            error,
        } => serde_json::json!({
            "event": "complete",
            "status": "aborted",
            "state": from.to_string(),
            "reason": reason.as_str(),
            "error": error,
        }),
    }
}

impl DeployEventSink for JsonEventSink {
    fn on_event(&self, event: DeployEvent) {
        self.write_event(event_to_json(&event));
    }

    fn wants_detailed_events(&self) -> bool {
        true // JSON mode wants all events
    }
}
