//! Application Layer
//!
//! Orchestration on top of the domain ports:
//! - Depends on the Domain layer (entities, services, ports)
//! - Holds no transport or filesystem code (that is Infrastructure)
//!
//! ## Components
//!
//! - `wrap_ssh_error` - attaches operation context to transport failures
//! - `ConnectionManager` / `ConnectionHandle` - the one session a deploy owns
//! - `RemotePackageReconciler` - brings controller packages in line with the project
//! - `BuildMetadataWriter` - embeds `deploy.json` into the snapshot
//! - `DeployExecutor` - the deploy state machine

pub mod build_info;
pub mod connection;
pub mod deploy;
pub mod reconcile;
mod ssh_context;

pub use build_info::BuildMetadataWriter;
pub use connection::{ConnectionHandle, ConnectionManager};
pub use deploy::{DeployAbort, DeployExecutor, DeployOptions, DeployOutcome, DeployReport};
pub use reconcile::{
    parse_pip_list, parse_requires_listing, ReconcileOptions, ReconcileSummary,
    RemotePackageReconciler,
};
pub use ssh_context::wrap_ssh_error;
