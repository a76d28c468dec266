//! Domain Entities
//!
//! - `ProjectSnapshot` - the filtered, frozen project tree
//! - `BuildManifest` - deploy provenance written as `deploy.json`
//! - `PackageManifest` / `PackageDelta` - installed or declared packages
//! - `DependencyGraph` - what each installed package requires

mod build_manifest;
mod dependency_graph;
mod package_manifest;
mod snapshot;

pub use build_manifest::{BuildManifest, VcsInfo, MANIFEST_FILE_NAME};
pub use dependency_graph::{parse_requires_dist, Dependency, DependencyGraph};
pub use package_manifest::{
    canonicalize_name, DeclaredRequirements, PackageDelta, PackageManifest, ANY_VERSION,
    BOOTSTRAP_PACKAGE,
};
pub use snapshot::{ProjectSnapshot, StagedFile};
