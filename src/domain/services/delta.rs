//! Package delta computation
//!
//! Exact version-string comparison only. Ranges are resolved before packages
//! reach this point; the only special version is the `*` wildcard.

use crate::domain::entities::{
    canonicalize_name, PackageDelta, PackageManifest, ANY_VERSION, BOOTSTRAP_PACKAGE,
};

/// Installs and uninstalls that turn `remote` into `local`.
///
/// - a local package missing remotely, or at a different version, is installed
/// - a remote package the project does not declare is uninstalled
/// - the bootstrap package is never uninstalled
pub fn compute_delta(local: &PackageManifest, remote: &PackageManifest) -> PackageDelta {
    let mut delta = PackageDelta::default();

    for (name, version) in local.iter() {
        let satisfied = match remote.get(name) {
            Some(installed) => version == ANY_VERSION || version == installed,
            None => false,
        };
        if !satisfied {
            delta
                .to_install
                .insert(name.to_string(), version.to_string());
        }
    }

    for (name, _) in remote.iter() {
        if !local.contains(name) && !is_bootstrap(name) {
            delta.to_uninstall.insert(name.to_string());
        }
    }

    delta
}

pub fn is_bootstrap(name: &str) -> bool {
    canonicalize_name(name) == BOOTSTRAP_PACKAGE
}
