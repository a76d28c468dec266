//! Remote Session Port
//!
//! Abstracts the transport to the controller: one authenticated session that
//! can run commands and upload files. The deploy pipeline only talks to the
//! controller through this trait.

use std::path::Path;

use crate::domain::value_objects::RemoteTarget;
use crate::error::TransportError;

/// Exit status and captured stdout/stderr of a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub output: String,
}

impl CommandOutput {
    pub fn new(status: i32, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// An open session to one host.
///
/// Implementations:
/// - `SshSession`: system `ssh`/`sftp` over a multiplexed master
/// - test doubles with an in-memory remote filesystem
pub trait RemoteSession {
    fn host(&self) -> &str;

    /// Run a shell command. A non-zero exit is returned, not raised; only
    /// failures of the transport itself are errors.
    fn exec(&self, command: &str) -> Result<CommandOutput, TransportError>;

    /// Upload one local file to an absolute remote path, applying `mode`.
    fn upload_file(&self, local: &Path, remote: &str, mode: u32) -> Result<(), TransportError>;

    /// Release the session. Further calls fail with `SessionClosed`.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens sessions; the seam between the pipeline and the transport.
pub trait SessionConnector {
    fn connect(&self, target: &RemoteTarget) -> Result<Box<dyn RemoteSession>, TransportError>;
}

impl<C: SessionConnector + ?Sized> SessionConnector for &C {
    fn connect(&self, target: &RemoteTarget) -> Result<Box<dyn RemoteSession>, TransportError> {
        (**self).connect(target)
    }
}
