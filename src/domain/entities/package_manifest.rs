//! Package manifests and deltas
//!
//! A manifest maps canonical package names to versions. Local manifests come
//! from the project's declared requirements, remote manifests from the
//! controller's package manager.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Version recorded for a requirement without a pin; matches any installed version.
pub const ANY_VERSION: &str = "*";

/// The package manager itself. Never uninstalled.
pub const BOOTSTRAP_PACKAGE: &str = "pip";

/// Normalise a package name: lowercase, runs of `-`, `_`, `.` become one `-`.
pub fn canonicalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Mapping from canonical package name to version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest(BTreeMap<String, String>);

impl PackageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, canonicalising the name. Returns the previous version.
    pub fn insert(&mut self, name: &str, version: impl Into<String>) -> Option<String> {
        self.0.insert(canonicalize_name(name), version.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&canonicalize_name(name)).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&canonicalize_name(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&canonicalize_name(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The manifest after `delta` has been applied: uninstalls removed,
    /// installs set to their target version.
    pub fn apply(&self, delta: &PackageDelta) -> PackageManifest {
        let mut next = self.clone();
        for name in &delta.to_uninstall {
            next.remove(name);
        }
        for (name, version) in &delta.to_install {
            next.insert(name, version.clone());
        }
        next
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for PackageManifest {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut manifest = PackageManifest::new();
        for (name, version) in iter {
            manifest.insert(name.as_ref(), version);
        }
        manifest
    }
}

/// Installs and uninstalls that reconcile a remote manifest with a local one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDelta {
    pub to_install: BTreeMap<String, String>,
    pub to_uninstall: BTreeSet<String>,
}

impl PackageDelta {
    pub fn is_empty(&self) -> bool {
        self.to_install.is_empty() && self.to_uninstall.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_install.len() + self.to_uninstall.len()
    }
}

impl fmt::Display for PackageDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.to_uninstall {
            writeln!(f, "- {}", name)?;
        }
        for (name, version) in &self.to_install {
            if version == ANY_VERSION {
                writeln!(f, "+ {}", name)?;
            } else {
                writeln!(f, "+ {}=={}", name, version)?;
            }
        }
        Ok(())
    }
}

/// What the project declares it needs on the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredRequirements {
    pub manifest: PackageManifest,
    /// Extras requested for specific packages, e.g. `robotpy[commands2]`
    pub extras: BTreeMap<String, Vec<String>>,
}

impl DeclaredRequirements {
    pub fn new(manifest: PackageManifest) -> Self {
        Self {
            manifest,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_extras(mut self, package: &str, extras: Vec<String>) -> Self {
        if !extras.is_empty() {
            self.extras.insert(canonicalize_name(package), extras);
        }
        self
    }

    /// Requirement string handed to the package manager.
    pub fn install_spec(&self, name: &str, version: &str) -> String {
        let mut spec = canonicalize_name(name);
        if let Some(extras) = self.extras.get(&spec) {
            spec = format!("{}[{}]", spec, extras.join(","));
        }
        if version != ANY_VERSION {
            spec.push_str("==");
            spec.push_str(version);
        }
        spec
    }
}
