//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `fs/` - Project staging and home directory lookup
//! - `ssh/` - OpenSSH ControlMaster sessions
//! - `requirements/` - `pyproject.toml` parsing
//! - `vcs/` - Build provenance (git, hostname, clock)
//! - `testing/` - Local test suite runner
//! - `confirm/` - Terminal prompts
//! - `events/` - Deploy event sinks (console, NDJSON)

pub mod confirm;
pub mod events;
pub mod fs;
pub mod process;
pub mod requirements;
pub mod ssh;
pub mod testing;
pub mod vcs;

pub use confirm::DialoguerConfirmer;
pub use events::{ConsoleEventSink, JsonEventSink};
pub use fs::FileStager;
pub use requirements::PyprojectRequirements;
pub use ssh::SshConnector;
pub use testing::CommandTestRunner;
pub use vcs::LocalBuildEnvironment;
