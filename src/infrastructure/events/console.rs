//! Console Event Sink
//!
//! Human progress through `tracing`; the subscriber installed by the binary
//! decides where it goes.

use crate::domain::ports::{DeployEvent, DeployEventSink};

pub struct ConsoleEventSink {
    verbose: bool,
}

impl ConsoleEventSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl DeployEventSink for ConsoleEventSink {
    fn on_event(&self, event: DeployEvent) {
        match event {
            DeployEvent::StateChanged { from, to } => {
                tracing::debug!(%from, %to, "state changed");
            }
            DeployEvent::Staged {
                file_count,
                total_bytes,
            } => {
                tracing::info!("staged {} file(s), {} bytes", file_count, total_bytes);
            }
            DeployEvent::LargeFilesFound { files, threshold } => {
                tracing::warn!(
                    "{} file(s) larger than {} bytes:",
                    files.len(),
                    threshold
                );
                for file in files {
                    tracing::warn!("  {} ({} bytes)", file.path.display(), file.size);
                }
            }
            DeployEvent::TestsStarted => tracing::info!("running local tests"),
            DeployEvent::TestsFinished { status } => {
                tracing::info!("local tests finished with status {}", status);
            }
            DeployEvent::Connected { host } => tracing::info!("connected to {}", host),
            DeployEvent::PackagePlan { install, uninstall } => {
                if install + uninstall == 0 {
                    tracing::info!("packages up to date");
                } else {
                    tracing::info!(
                        "package changes: {} to install, {} to remove",
                        install,
                        uninstall
                    );
                }
            }
            DeployEvent::PackagesSkipped { reason } => {
                tracing::info!("skipping package installation ({})", reason);
            }
            DeployEvent::PackageUninstalled { name } => tracing::info!("removed {}", name),
            DeployEvent::PackageInstalled { name, version } => {
                tracing::info!("installed {} {}", name, version);
            }
            DeployEvent::FileUploaded { index, total, path } => {
                tracing::debug!("[{}/{}] {}", index + 1, total, path.display());
            }
            DeployEvent::Restarting { debug } => {
                if debug {
                    tracing::info!("restarting robot code (debug)");
                } else {
                    tracing::info!("restarting robot code");
                }
            }
            DeployEvent::Completed {
                host,
                file_count,
                total_bytes,
            } => {
                tracing::info!(
                    "deployed {} file(s) ({} bytes) to {}",
                    file_count,
                    total_bytes,
                    host
                );
            }
            DeployEvent::Aborted {
                from,
                reason,
                error,
            } => {
                tracing::error!("deploy aborted at {} ({}): {}", from, reason, error);
            }
        }
    }

    fn wants_detailed_events(&self) -> bool {
        self.verbose
    }
}
