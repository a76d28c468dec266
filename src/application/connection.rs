//! Connection management
//!
//! `ConnectionManager::open` produces a `ConnectionHandle` per session a
//! deploy uses. The handle owns the session and closes it when dropped, so
//! every exit path of a deploy releases the connection.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::wrap_ssh_error;
use crate::domain::entities::{ProjectSnapshot, StagedFile};
use crate::domain::ports::{CommandOutput, RemoteSession, SessionConnector};
use crate::domain::value_objects::{RemoteLayout, RemoteTarget};
use crate::error::{DeployError, SshError, TransportError};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Opens sessions to one target.
pub struct ConnectionManager<C> {
    connector: C,
    target: RemoteTarget,
}

impl<C: SessionConnector> ConnectionManager<C> {
    pub fn new(connector: C, target: RemoteTarget) -> Self {
        Self { connector, target }
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    /// Establish one authenticated session.
    ///
    /// Never retried: auth failures, timeouts and unreachable hosts are
    /// reported as `DeployError::Connection`.
    pub fn open(&self) -> Result<ConnectionHandle, DeployError> {
        let host = self.target.host.clone();
        tracing::info!(
            event = "ssh.connect",
            host = %host,
            user = %self.target.user,
            port = self.target.port,
            "connecting"
        );

        let session = wrap_ssh_error(format!("connecting to {}", host), || {
            self.connector.connect(&self.target)
        })
        .map_err(|source| DeployError::Connection {
            host: host.clone(),
            source,
        })?;

        Ok(ConnectionHandle::new(session))
    }
}

/// An open session, exclusively owned by one deploy.
pub struct ConnectionHandle {
    id: u64,
    host: String,
    session: Option<Box<dyn RemoteSession>>,
}

impl ConnectionHandle {
    pub fn new(session: Box<dyn RemoteSession>) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            host: session.host().to_string(),
            session: Some(session),
        }
    }

    /// Unique per handle; caches keyed on it never outlive the session.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Result<&dyn RemoteSession, TransportError> {
        self.session
            .as_deref()
            .ok_or_else(|| TransportError::SessionClosed {
                host: self.host.clone(),
            })
    }

    /// Run `command`, described as `operation` in errors.
    ///
    /// A non-zero exit is an error unless `tolerate_failure` is set.
    pub fn execute(
        &self,
        operation: &str,
        command: &str,
        tolerate_failure: bool,
    ) -> Result<CommandOutput, SshError> {
        wrap_ssh_error(operation, || {
            tracing::debug!(event = "ssh.exec", host = %self.host, command = %command);
            let output = self.session()?.exec(command)?;
            if !output.success() && !tolerate_failure {
                return Err(TransportError::NonZeroExit {
                    command: command.to_string(),
                    status: output.status,
                    output: output.output,
                });
            }
            Ok(output)
        })
    }

    /// Run `command`; non-zero exit is an error.
    pub fn run_remote_command(&self, command: &str) -> Result<CommandOutput, SshError> {
        self.execute(&format!("running '{}'", command), command, false)
    }

    /// Run `command`; the caller inspects the exit status.
    pub fn run_remote_command_tolerant(&self, command: &str) -> Result<CommandOutput, SshError> {
        self.execute(&format!("running '{}'", command), command, true)
    }

    /// Upload every snapshot file below `destination`, keeping relative
    /// structure and file mode.
    ///
    /// Stops at the first failing file; nothing is retried. `on_file` is
    /// called after each successful upload with its zero-based index.
    pub fn upload<F>(
        &self,
        snapshot: &ProjectSnapshot,
        destination: &str,
        mut on_file: F,
    ) -> Result<usize, DeployError>
    where
        F: FnMut(usize, &StagedFile),
    {
        let destination = destination.trim_end_matches('/');
        let mut dirs = vec![destination.to_string()];
        dirs.extend(
            snapshot
                .remote_directories()
                .into_iter()
                .map(|d| format!("{}/{}", destination, d)),
        );
        let mkdir = RemoteLayout::mkdir_command(dirs.iter().map(String::as_str));
        self.execute("creating remote directories", &mkdir, false)
            .map_err(|source| DeployError::Transfer {
                path: destination.into(),
                source,
            })?;

        for (index, file) in snapshot.files().iter().enumerate() {
            let remote = format!("{}/{}", destination, file.remote_relative());
            wrap_ssh_error(
                format!("uploading {}", file.relative_path().display()),
                || {
                    self.session()?
                        .upload_file(file.staged_path(), &remote, file.mode())
                },
            )
            .map_err(|source| DeployError::Transfer {
                path: file.relative_path().to_path_buf(),
                source,
            })?;
            on_file(index, file);
        }

        Ok(snapshot.len())
    }

    /// The last deployed `deploy.json`, or an empty object when none exists.
    pub fn read_deployed_manifest(
        &self,
        layout: &RemoteLayout,
    ) -> Result<serde_json::Value, SshError> {
        let command = layout.read_manifest_command();
        let output = self.execute("reading deploy manifest", &command, false)?;
        wrap_ssh_error("reading deploy manifest", || {
            serde_json::from_str(output.output.trim()).map_err(|e| {
                TransportError::MalformedOutput {
                    command: command.clone(),
                    message: e.to_string(),
                }
            })
        })
    }

    /// Close the session. Idempotent.
    pub fn close(&mut self) -> Result<(), SshError> {
        match self.session.take() {
            Some(mut session) => {
                tracing::debug!(event = "ssh.close", host = %self.host);
                wrap_ssh_error(format!("closing session to {}", self.host), || {
                    session.close()
                })
            }
            None => Ok(()),
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(event = "ssh.close_failed", error = %e, "failed to close session");
        }
    }
}
