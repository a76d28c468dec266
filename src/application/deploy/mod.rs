//! Deploy Module
//!
//! Orchestrates one deploy to a controller.
//!
//! ## Structure
//!
//! - `options` - Inputs (`DeployOptions`)
//! - `result` - Terminal outcome (`DeployOutcome`, `DeployReport`, `DeployAbort`)
//! - `use_case` - The state machine (`DeployExecutor`)
//!
//! ## Usage
//!
//! ```ignore
//! use robodeploy::application::deploy::{DeployExecutor, DeployOptions};
//!
//! let executor = DeployExecutor::new(stager, connector, requirements, tests, environment);
//! let outcome = executor.execute(&DeployOptions::new(root, target));
//! std::process::exit(outcome.exit_code());
//! ```

mod options;
mod result;
mod use_case;

pub use options::DeployOptions;
pub use result::{DeployAbort, DeployOutcome, DeployReport, EXIT_FAILED, EXIT_SKIPPED, EXIT_SUCCESS};
pub use use_case::DeployExecutor;
