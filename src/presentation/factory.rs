//! Use Case Factory
//!
//! Creates the deploy executor with infrastructure dependencies wired up.
//! This is the dependency injection point for the application.

use crate::application::DeployExecutor;
use crate::config::Config;
use crate::infrastructure::{
    CommandTestRunner, FileStager, LocalBuildEnvironment, PyprojectRequirements, SshConnector,
};

/// Type alias for the concrete DeployExecutor with all dependencies
pub type ConcreteDeployExecutor = DeployExecutor<FileStager, SshConnector>;

/// Create a deploy executor for `config`, running tests against `main_file`.
pub fn create_deploy_executor(config: &Config, main_file: &str) -> ConcreteDeployExecutor {
    let test_runner =
        CommandTestRunner::new(main_file).with_argv(config.deploy.test_command.clone());

    DeployExecutor::new(
        FileStager::new(),
        SshConnector::new(),
        Box::new(PyprojectRequirements::new()),
        Box::new(test_runner),
        Box::new(LocalBuildEnvironment::new()),
    )
    .with_layout(config.layout())
}
