//! Operation context for transport failures
//!
//! Every remote call runs inside `wrap_ssh_error`, which turns a bare
//! `TransportError` into an `SshError` naming the operation in progress.

use std::fmt::Display;

use crate::error::{SshError, TransportError};

/// Run `f`, attaching `operation` to any transport failure.
///
/// The original error is kept as the source of the returned `SshError`.
pub fn wrap_ssh_error<T, D, F>(operation: D, f: F) -> Result<T, SshError>
where
    D: Display,
    F: FnOnce() -> Result<T, TransportError>,
{
    f().map_err(|source| {
        tracing::debug!(
            event = "ssh.error",
            operation = %operation,
            error = %source,
            "remote operation failed"
        );
        SshError::new(operation.to_string(), source)
    })
}
