//! Presentation Layer
//!
//! This layer handles:
//! - CLI argument parsing (via clap)
//! - Logging setup
//! - Creating the deploy executor with infrastructure dependencies
//! - Mapping the outcome to output and an exit code
//!
//! ## Structure
//!
//! - `cli` - Flags and arguments
//! - `deploy` - The deploy command
//! - `factory` - Dependency injection
//! - `logging` - `tracing-subscriber` bootstrap

pub mod cli;
pub mod deploy;
pub mod factory;
pub mod logging;

pub use cli::Cli;
pub use deploy::cmd_deploy;
pub use factory::create_deploy_executor;
pub use logging::init_logging;
