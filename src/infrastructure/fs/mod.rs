//! File System Implementations
//!
//! Staging the project tree and locating robodeploy's own files.

mod home;
mod stager;

pub use home::{robodeploy_home_dir, ROBODEPLOY_TEST_HOME_VAR};
pub use stager::FileStager;
