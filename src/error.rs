//! Error types for robodeploy
//!
//! Uses `thiserror` for library errors. The binary wraps them in `anyhow`
//! at its boundary only; the deploy pipeline never returns `anyhow`.
//!
//! Errors are layered:
//! - `TransportError` - what a spawned `ssh`/`sftp` process reported
//! - `SshError` - a `TransportError` annotated with the operation in progress
//! - `DeployError` - the domain taxonomy the deploy pipeline reports
//! - `ConfigError` - unusable configuration files or overrides

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::services::LargeFile;

/// Low-level failure of the remote transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport program could not be started
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport program did not finish in time and was killed
    #[error("`{label}` timed out after {}s", timeout.as_secs())]
    Timeout { label: String, timeout: Duration },

    /// A remote command exited with a non-zero status
    #[error("command '{command}' returned non-zero exit status {status}{}", format_output(output))]
    NonZeroExit {
        command: String,
        status: i32,
        output: String,
    },

    /// Output of a remote command could not be understood
    #[error("malformed output from '{command}': {message}")]
    MalformedOutput { command: String, message: String },

    /// The SSH master could not authenticate or reach the host
    #[error("could not establish ssh session to {host}: {detail}")]
    Unreachable { host: String, detail: String },

    /// The session was used after it was closed
    #[error("ssh session to {host} is closed")]
    SessionClosed { host: String },

    /// Local I/O error while talking to the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Exit status of the remote command, if the failure carries one.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn format_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// A transport failure annotated with the operation that was in progress.
///
/// Produced by `application::wrap_ssh_error`. The original error is kept
/// as the `source` so it is chained, never replaced.
#[derive(Error, Debug)]
#[error("{operation}: {source}")]
pub struct SshError {
    /// Human-readable description, e.g. "uploading robot.py"
    pub operation: String,
    #[source]
    pub source: TransportError,
}

impl SshError {
    pub fn new(operation: impl Into<String>, source: TransportError) -> Self {
        Self {
            operation: operation.into(),
            source,
        }
    }

    /// Exit status of the underlying remote command, if any.
    pub fn exit_status(&self) -> Option<i32> {
        self.source.exit_status()
    }
}

/// Failures while producing the local snapshot.
#[derive(Error, Debug)]
pub enum StagingError {
    /// The project root does not exist or is not a directory
    #[error("project root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Walking the project tree failed
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Copying a file into the scratch workspace failed
    #[error("failed to copy {} into scratch space: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scratch workspace could not be created
    #[error("failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    /// The project `.deployignore` file is invalid
    #[error("invalid .deployignore: {0}")]
    IgnoreFile(String),

    /// The build manifest could not be written into the snapshot
    #[error("failed to write build manifest: {0}")]
    Manifest(String),
}

/// Failures reading the project's declared requirements.
#[derive(Error, Debug)]
pub enum RequirementsError {
    #[error(
        "{} not found (use --no-install to deploy without package reconciliation)",
        .0.display()
    )]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid TOML: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{} must have a [tool.robotpy] section", .0.display())]
    MissingSection(PathBuf),

    #[error("{} is missing required tool.robotpy.robotpy_version", .0.display())]
    MissingVersion(PathBuf),

    #[error("unsupported requirement '{line}': {reason}")]
    Unsupported { line: String, reason: String },
}

/// Local validation gates that stop a deploy before anything remote happens.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Oversized files were found and the operator did not confirm them
    #[error("{}", describe_large_files(files, *threshold))]
    LargeFiles { files: Vec<LargeFile>, threshold: u64 },

    /// The entry point is not part of the snapshot
    #[error(
        "{main_file} not found in {} (is this the robot project directory?)",
        project_root.display()
    )]
    MainFileMissing {
        main_file: String,
        project_root: PathBuf,
    },

    /// The project's local test suite failed
    #[error("local tests failed with exit status {status} (use --skip-tests to deploy anyway)")]
    TestsFailed { status: i32 },

    /// The local test suite could not be started
    #[error("could not run local tests: {0}")]
    TestRunner(#[source] std::io::Error),

    /// Declared requirements could not be read
    #[error(transparent)]
    Requirements(#[from] RequirementsError),
}

fn describe_large_files(files: &[LargeFile], threshold: u64) -> String {
    let mut message = format!(
        "large files found (larger than {} bytes) and not confirmed:",
        threshold
    );
    for file in files {
        message.push_str(&format!("\n- {} ({} bytes)", file.path.display(), file.size));
    }
    message
}

/// Failures while bringing remote packages in line with the project.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The remote interpreter is not installed
    #[error("{python} was not found on the controller; install the runtime before deploying")]
    InterpreterMissing { python: String },

    /// Querying the controller failed or returned garbage
    #[error("could not query remote packages: {0}")]
    Query(#[source] SshError),

    /// Installing one package failed; the remaining delta was not applied
    #[error("installing {package}: {source}")]
    Install {
        package: String,
        #[source]
        source: SshError,
    },

    /// Removing one package failed; the remaining delta was not applied
    #[error("uninstalling {package}: {source}")]
    Uninstall {
        package: String,
        #[source]
        source: SshError,
    },
}

impl ReconcileError {
    /// The package that caused the failure, if a specific one did.
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::Install { package, .. } | Self::Uninstall { package, .. } => Some(package),
            _ => None,
        }
    }
}

/// Error taxonomy of the deploy pipeline.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Deploy source path is disallowed
    #[error("refusing to deploy from {}: {reason}", path.display())]
    UnsafeRoot { path: PathBuf, reason: String },

    /// The local snapshot could not be produced
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Large files unconfirmed, tests failed, or requirements unreadable
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Authentication, timeout, or unreachable host
    #[error("connection to {host} failed: {source}")]
    Connection {
        host: String,
        #[source]
        source: SshError,
    },

    /// A remote command exited non-zero
    #[error("remote command failed: {0}")]
    RemoteExecution(#[source] SshError),

    /// Uploading a snapshot file failed
    #[error("transfer of {} failed: {source}", path.display())]
    Transfer {
        path: PathBuf,
        #[source]
        source: SshError,
    },

    /// Applying the package delta failed
    #[error("package reconciliation failed: {0}")]
    Reconciliation(#[from] ReconcileError),

    /// Remote process control failed
    #[error("restart failed: {0}")]
    Restart(#[source] SshError),
}

impl DeployError {
    /// True for errors raised before anything on the controller was touched.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UnsafeRoot { .. } | Self::Staging(_) | Self::Validation(_)
        )
    }
}

/// A configuration file could not be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
