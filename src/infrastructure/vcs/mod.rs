//! Build provenance from the local machine

mod git;

pub use git::{probe_git, LocalBuildEnvironment};
