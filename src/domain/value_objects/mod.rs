//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod config_warning;
mod content_hash;
mod deploy_state;
mod exclusion_rules;
mod ignore_patterns;
mod remote_layout;
mod remote_target;

pub use config_warning::ConfigWarning;
pub use content_hash::{ContentHash, TreeHasher};
pub use deploy_state::{AbortReason, DeployState, Transition};
pub use exclusion_rules::{ExclusionRule, ExclusionRuleSet};
pub use ignore_patterns::{IgnoreError, IgnorePatterns, DEPLOY_IGNORE_FILE};
pub use remote_layout::{RemoteLayout, DEBUG_MARKER};
pub use remote_target::{HostKeyChecking, RemoteTarget};
