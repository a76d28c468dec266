//! robodeploy - deploy a robot project to an embedded controller
//!
//! The deploy pipeline stages the local project, validates it, connects to
//! the controller over SSH, reconciles its Python packages, swaps in the new
//! code and restarts the robot program. Each step is a state transition;
//! a failure reports the exact transition it interrupted.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-exports for convenience
pub use application::{DeployExecutor, DeployOptions, DeployOutcome, DeployReport};
pub use config::Config;
pub use domain::value_objects::{AbortReason, DeployState, RemoteLayout, RemoteTarget};
pub use error::{DeployError, SshError, TransportError};
