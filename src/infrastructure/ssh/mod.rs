//! SSH transport
//!
//! `SshConnector` implements the `SessionConnector` port with the system
//! OpenSSH client.

mod session;

pub use session::{upload_batch, SshConnector, SshSession};
