//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod build_environment;
pub mod confirmer;
pub mod deploy_events;
pub mod project_stager;
pub mod remote_session;
pub mod requirements_source;
pub mod test_runner;

pub use build_environment::BuildEnvironment;
pub use confirmer::{AlwaysConfirm, ConfirmPrompt, Confirmer, NeverConfirm};
pub use deploy_events::{DeployEvent, DeployEventSink, NoopEventSink};
pub use project_stager::ProjectStager;
pub use remote_session::{CommandOutput, RemoteSession, SessionConnector};
pub use requirements_source::RequirementsSource;
pub use test_runner::LocalTestRunner;
