//! Installed-package dependency graph
//!
//! Built from the `Requires-Dist` metadata of every distribution on the
//! controller. Only names and extras matter here; version constraints stay
//! the package manager's business.

use std::collections::{BTreeMap, BTreeSet};

use super::package_manifest::canonicalize_name;

/// One `Requires-Dist` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// Extras requested on the dependency itself, e.g. `wpilib[sim]`
    pub extras: Vec<String>,
    /// Extras of the dependent that pull this in; empty means always
    pub only_for_extras: Vec<String>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Every value compared against `extra` in an environment marker.
fn marker_extras(marker: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = marker;
    while let Some(at) = rest.find("extra") {
        let standalone = rest[..at]
            .chars()
            .last()
            .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_');
        let after = &rest[at + "extra".len()..];
        if standalone {
            if let Some(value) = after.trim_start().strip_prefix("==") {
                let value = value.trim_start();
                if let Some(quote) = value.chars().next().filter(|c| matches!(c, '\'' | '"')) {
                    let body = &value[1..];
                    if let Some(end) = body.find(quote) {
                        found.push(canonicalize_name(&body[..end]));
                    }
                }
            }
        }
        rest = after;
    }
    found
}

/// Parse a `Requires-Dist` line such as
/// `robotpy-commands-v2==2025.1.1; extra == "commands2"`.
pub fn parse_requires_dist(line: &str) -> Option<Dependency> {
    let (requirement, marker) = match line.split_once(';') {
        Some((requirement, marker)) => (requirement.trim(), marker),
        None => (line.trim(), ""),
    };
    let name_end = requirement
        .find(|c: char| !is_name_char(c))
        .unwrap_or(requirement.len());
    let name = &requirement[..name_end];
    if name.is_empty() {
        return None;
    }

    let rest = requirement[name_end..].trim_start();
    let extras = rest
        .strip_prefix('[')
        .and_then(|after| after.split_once(']'))
        .map(|(inner, _)| {
            inner
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(canonicalize_name)
                .collect()
        })
        .unwrap_or_default();

    Some(Dependency {
        name: canonicalize_name(name),
        extras,
        only_for_extras: marker_extras(marker),
    })
}

/// Which installed distribution requires which.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph(BTreeMap<String, Vec<Dependency>>);

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `package` with its raw `Requires-Dist` lines. Unparseable
    /// lines are dropped.
    pub fn insert<'a>(&mut self, package: &str, requires: impl IntoIterator<Item = &'a str>) {
        let deps = requires.into_iter().filter_map(parse_requires_dist).collect();
        self.0.insert(canonicalize_name(package), deps);
    }

    pub fn requires(&self, package: &str) -> &[Dependency] {
        self.0
            .get(&canonicalize_name(package))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every package reachable from `roots`, roots included.
    ///
    /// A root is a name plus the extras it was installed with. Extra-only
    /// requirements are followed only when the dependent was installed
    /// with that extra.
    pub fn closure<'a, I>(&self, roots: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut seen: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut pending: Vec<(String, BTreeSet<String>)> = roots
            .into_iter()
            .map(|(name, extras)| {
                let extras = extras.iter().map(|e| canonicalize_name(e)).collect();
                (canonicalize_name(name), extras)
            })
            .collect();

        while let Some((name, extras)) = pending.pop() {
            let active = match seen.get_mut(&name) {
                Some(known) if extras.is_subset(known) => continue,
                Some(known) => {
                    known.extend(extras);
                    known.clone()
                }
                None => {
                    seen.insert(name.clone(), extras.clone());
                    extras
                }
            };

            for dep in self.requires(&name) {
                let wanted = dep.only_for_extras.is_empty()
                    || dep.only_for_extras.iter().any(|e| active.contains(e));
                if wanted {
                    pending.push((dep.name.clone(), dep.extras.iter().cloned().collect()));
                }
            }
        }

        seen.into_keys().collect()
    }
}
