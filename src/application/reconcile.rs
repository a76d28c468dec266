//! Remote package reconciliation
//!
//! Brings the controller's installed packages in line with the project's
//! declared requirements. The remote manifest is cached per connection
//! handle and must be invalidated explicitly after any change.
//!
//! Packages the project does not declare are only removed when nothing it
//! does declare depends on them; the dependency closure is read from the
//! controller's installed metadata.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::application::connection::ConnectionHandle;
use crate::domain::entities::{
    canonicalize_name, DeclaredRequirements, DependencyGraph, PackageDelta, PackageManifest,
    BOOTSTRAP_PACKAGE,
};
use crate::domain::ports::{ConfirmPrompt, Confirmer, DeployEvent, DeployEventSink};
use crate::domain::services;
use crate::domain::value_objects::RemoteLayout;
use crate::error::{ReconcileError, SshError, TransportError};

/// Policy knobs for reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Reinstall every declared package regardless of remote state
    pub force_install: bool,
    /// Only install; never remove packages
    pub no_uninstall: bool,
    /// Names never uninstalled, in addition to the bootstrap package
    pub keep: BTreeSet<String>,
    /// Extra arguments for every install command
    pub pip_install_args: Vec<String>,
    /// Account that owns the controller's site-packages
    pub user: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            force_install: false,
            no_uninstall: false,
            keep: ["setuptools", "wheel"]
                .into_iter()
                .map(String::from)
                .collect(),
            pip_install_args: Vec::new(),
            user: "admin".to_string(),
        }
    }
}

impl ReconcileOptions {
    pub fn with_force_install(mut self, force: bool) -> Self {
        self.force_install = force;
        self
    }

    pub fn with_no_uninstall(mut self, no_uninstall: bool) -> Self {
        self.no_uninstall = no_uninstall;
        self
    }

    pub fn with_keep(mut self, keep: impl IntoIterator<Item = String>) -> Self {
        self.keep = keep.into_iter().map(|n| canonicalize_name(&n)).collect();
        self
    }

    pub fn with_pip_install_args(mut self, args: Vec<String>) -> Self {
        self.pip_install_args = args;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

/// What a reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub installed: Vec<String>,
    pub uninstalled: Vec<String>,
    /// A non-empty delta was declined by the operator
    pub declined: bool,
}

impl ReconcileSummary {
    pub fn changed(&self) -> bool {
        !self.installed.is_empty() || !self.uninstalled.is_empty()
    }
}

#[derive(Deserialize)]
struct PipListEntry {
    name: String,
    version: String,
}

/// Parse `pip list --format=json` output.
///
/// Lines before the JSON array (pip notices) are ignored. Anything that is
/// not an array of `{name, version}` objects is an error.
pub fn parse_pip_list(output: &str) -> Result<PackageManifest, String> {
    let start = output
        .lines()
        .position(|line| line.trim_start().starts_with('['))
        .ok_or_else(|| "no JSON array in output".to_string())?;
    let json: String = output.lines().skip(start).collect::<Vec<_>>().join("\n");

    let entries: Vec<PipListEntry> = serde_json::from_str(&json).map_err(|e| e.to_string())?;
    Ok(entries
        .into_iter()
        .filter(|e| !e.name.is_empty() && !e.version.is_empty())
        .map(|e| (e.name, e.version))
        .collect())
}

/// Parse the `{name: [Requires-Dist, ...]}` listing.
pub fn parse_requires_listing(output: &str) -> Result<DependencyGraph, String> {
    let start = output
        .lines()
        .position(|line| line.trim_start().starts_with('{'))
        .ok_or_else(|| "no JSON object in output".to_string())?;
    let json: String = output.lines().skip(start).collect::<Vec<_>>().join("\n");

    let listing: BTreeMap<String, Vec<String>> =
        serde_json::from_str(&json).map_err(|e| e.to_string())?;
    let mut graph = DependencyGraph::new();
    for (name, requires) in &listing {
        graph.insert(name, requires.iter().map(String::as_str));
    }
    Ok(graph)
}

/// Reconciles remote packages for one deploy run.
pub struct RemotePackageReconciler {
    layout: RemoteLayout,
    options: ReconcileOptions,
    cache: Option<(u64, PackageManifest)>,
    dependencies: Option<(u64, DependencyGraph)>,
}

impl RemotePackageReconciler {
    pub fn new(layout: RemoteLayout, options: ReconcileOptions) -> Self {
        Self {
            layout,
            options,
            cache: None,
            dependencies: None,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Fail early when the controller has no interpreter to install into.
    pub fn ensure_interpreter(&self, handle: &ConnectionHandle) -> Result<(), ReconcileError> {
        let output = handle
            .execute(
                "checking for remote interpreter",
                &self.layout.interpreter_check_command(),
                true,
            )
            .map_err(ReconcileError::Query)?;
        if output.success() {
            Ok(())
        } else {
            Err(ReconcileError::InterpreterMissing {
                python: self.layout.python.clone(),
            })
        }
    }

    /// Installed packages on the controller, queried once per handle.
    pub fn get_remote_packages(
        &mut self,
        handle: &ConnectionHandle,
    ) -> Result<PackageManifest, ReconcileError> {
        if let Some((id, manifest)) = &self.cache {
            if *id == handle.id() {
                tracing::debug!(event = "packages.cache_hit", host = %handle.host());
                return Ok(manifest.clone());
            }
        }

        let command = self.layout.pip_list_command();
        let output = handle
            .execute("listing remote packages", &command, false)
            .map_err(ReconcileError::Query)?;
        let manifest = parse_pip_list(&output.output).map_err(|message| {
            ReconcileError::Query(SshError::new(
                "listing remote packages",
                TransportError::MalformedOutput { command, message },
            ))
        })?;

        tracing::debug!(
            event = "packages.listed",
            host = %handle.host(),
            count = manifest.len()
        );
        self.cache = Some((handle.id(), manifest.clone()));
        Ok(manifest)
    }

    /// What each installed package requires, queried once per handle.
    pub fn get_remote_dependencies(
        &mut self,
        handle: &ConnectionHandle,
    ) -> Result<DependencyGraph, ReconcileError> {
        if let Some((id, graph)) = &self.dependencies {
            if *id == handle.id() {
                return Ok(graph.clone());
            }
        }

        let command = self.layout.pip_requires_command();
        let output = handle
            .execute("reading remote package metadata", &command, false)
            .map_err(ReconcileError::Query)?;
        let graph = parse_requires_listing(&output.output).map_err(|message| {
            ReconcileError::Query(SshError::new(
                "reading remote package metadata",
                TransportError::MalformedOutput { command, message },
            ))
        })?;

        tracing::debug!(
            event = "packages.dependencies",
            host = %handle.host(),
            count = graph.len()
        );
        self.dependencies = Some((handle.id(), graph.clone()));
        Ok(graph)
    }

    /// Force the next queries to go to the controller.
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.dependencies = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Everything the declared packages, the keep-list and the bootstrap
    /// package need, following `graph`.
    fn protected(
        &self,
        requirements: &DeclaredRequirements,
        graph: &DependencyGraph,
    ) -> BTreeSet<String> {
        let mut roots: Vec<(&str, &[String])> = requirements
            .manifest
            .iter()
            .map(|(name, _)| {
                let extras = requirements.extras.get(name).map(Vec::as_slice);
                (name, extras.unwrap_or(&[]))
            })
            .collect();
        roots.extend(self.options.keep.iter().map(|n| (n.as_str(), &[][..])));
        roots.push((BOOTSTRAP_PACKAGE, &[][..]));
        graph.closure(roots)
    }

    /// Delta under this run's policy: dependencies of declared packages,
    /// the keep-list and bootstrap protected, `no_uninstall` and
    /// `force_install` applied.
    pub fn compute_delta(
        &self,
        requirements: &DeclaredRequirements,
        remote: &PackageManifest,
        graph: &DependencyGraph,
    ) -> PackageDelta {
        let local = &requirements.manifest;
        let mut delta = services::compute_delta(local, remote);

        let protected = self.protected(requirements, graph);
        delta
            .to_uninstall
            .retain(|name| !services::is_bootstrap(name) && !protected.contains(name));
        if self.options.no_uninstall {
            delta.to_uninstall.clear();
        }
        if self.options.force_install {
            delta.to_install = local
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect();
        }
        delta
    }

    /// Apply `delta`: stop the robot program, then all uninstalls, then
    /// all installs, one package per command. The first failure stops the
    /// rest.
    pub fn apply_delta(
        &mut self,
        handle: &ConnectionHandle,
        requirements: &DeclaredRequirements,
        delta: &PackageDelta,
        events: &dyn DeployEventSink,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let result = self.apply_delta_inner(handle, requirements, delta, events);
        // Whatever happened, the cached listing may now be stale.
        self.invalidate();
        result
    }

    fn apply_delta_inner(
        &self,
        handle: &ConnectionHandle,
        requirements: &DeclaredRequirements,
        delta: &PackageDelta,
        events: &dyn DeployEventSink,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let mut summary = ReconcileSummary::default();
        if delta.is_empty() {
            return Ok(summary);
        }

        // Frees memory and keeps modules from vanishing under a live interpreter.
        handle
            .execute("stopping robot program", &self.layout.stop_command(), true)
            .map_err(ReconcileError::Query)?;

        for name in &delta.to_uninstall {
            if canonicalize_name(name) == BOOTSTRAP_PACKAGE {
                tracing::warn!(event = "packages.bootstrap_protected", package = %name);
                continue;
            }
            tracing::info!(event = "packages.uninstall", package = %name);
            handle
                .execute(
                    &format!("uninstalling {}", name),
                    &self.layout.pip_uninstall_command(name),
                    false,
                )
                .map_err(|source| ReconcileError::Uninstall {
                    package: name.clone(),
                    source,
                })?;
            events.on_event(DeployEvent::PackageUninstalled { name: name.clone() });
            summary.uninstalled.push(name.clone());
        }

        for (name, version) in &delta.to_install {
            let spec = requirements.install_spec(name, version);
            tracing::info!(event = "packages.install", package = %spec);
            let command = self.layout.pip_install_command(
                &spec,
                self.options.force_install,
                &self.options.pip_install_args,
            );
            handle
                .execute(&format!("installing {}", spec), &command, false)
                .map_err(|source| ReconcileError::Install {
                    package: name.clone(),
                    source,
                })?;
            events.on_event(DeployEvent::PackageInstalled {
                name: name.clone(),
                version: version.clone(),
            });
            summary.installed.push(name.clone());
        }

        Ok(summary)
    }

    /// Full reconciliation: interpreter check, listing, delta, operator
    /// confirmation, application.
    ///
    /// A declined confirmation leaves remote packages untouched and is not
    /// an error.
    pub fn reconcile(
        &mut self,
        handle: &ConnectionHandle,
        requirements: &DeclaredRequirements,
        confirmer: &dyn Confirmer,
        events: &dyn DeployEventSink,
    ) -> Result<ReconcileSummary, ReconcileError> {
        self.ensure_interpreter(handle)?;
        let remote = self.get_remote_packages(handle)?;
        let unprotected = self.compute_delta(requirements, &remote, &DependencyGraph::new());
        let graph = if unprotected.to_uninstall.is_empty() {
            DependencyGraph::new()
        } else {
            self.get_remote_dependencies(handle)?
        };
        let delta = self.compute_delta(requirements, &remote, &graph);

        events.on_event(DeployEvent::PackagePlan {
            install: delta.to_install.len(),
            uninstall: delta.to_uninstall.len(),
        });
        if delta.is_empty() {
            tracing::info!(event = "packages.up_to_date", host = %handle.host());
            return Ok(ReconcileSummary::default());
        }

        let prompt = ConfirmPrompt::ReplacePackages {
            host: handle.host(),
            delta: &delta,
        };
        if !confirmer.confirm(&prompt) {
            tracing::warn!(
                event = "packages.declined",
                host = %handle.host(),
                "package changes declined; deploying with existing packages"
            );
            events.on_event(DeployEvent::PackagesSkipped {
                reason: "declined by operator".to_string(),
            });
            return Ok(ReconcileSummary {
                declined: true,
                ..ReconcileSummary::default()
            });
        }

        self.apply_delta(handle, requirements, &delta, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        AlwaysConfirm, CommandOutput, NeverConfirm, NoopEventSink, RemoteSession,
    };
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    /// Session whose pip understands list/install/uninstall against a shared manifest.
    struct PipSession {
        installed: Rc<RefCell<Vec<(String, String)>>>,
        requires: Vec<(&'static str, &'static str)>,
        commands: Rc<RefCell<Vec<String>>>,
        fail_on: Option<&'static str>,
        has_python: bool,
    }

    impl RemoteSession for PipSession {
        fn host(&self) -> &str {
            "rio"
        }

        fn exec(&self, command: &str) -> Result<CommandOutput, TransportError> {
            self.commands.borrow_mut().push(command.to_string());
            if let Some(needle) = self.fail_on {
                if command.contains(needle) {
                    return Ok(CommandOutput::new(1, "ERROR: No matching distribution"));
                }
            }
            if command.starts_with("test -x") {
                return Ok(CommandOutput::new(if self.has_python { 0 } else { 1 }, ""));
            }
            let mut installed = self.installed.borrow_mut();
            if command.ends_with("list --format=json") {
                let entries: Vec<String> = installed
                    .iter()
                    .map(|(n, v)| format!("{{\"name\":\"{}\",\"version\":\"{}\"}}", n, v))
                    .collect();
                return Ok(CommandOutput::new(0, format!("[{}]", entries.join(","))));
            }
            if command.contains("importlib.metadata") {
                let entries: Vec<String> = installed
                    .iter()
                    .map(|(name, _)| {
                        let requires: Vec<String> = self
                            .requires
                            .iter()
                            .filter(|(dependent, _)| dependent == name)
                            .map(|(_, dep)| format!("{:?}", dep))
                            .collect();
                        format!("{:?}: [{}]", name, requires.join(","))
                    })
                    .collect();
                return Ok(CommandOutput::new(0, format!("{{{}}}", entries.join(","))));
            }
            let last = command
                .rsplit(' ')
                .next()
                .unwrap_or_default()
                .trim_matches('\'')
                .to_string();
            if command.contains(" uninstall ") {
                installed.retain(|(n, _)| *n != last);
            } else if command.contains(" install ") {
                let (name, version) = last.split_once("==").unwrap_or((last.as_str(), "0"));
                installed.retain(|(n, _)| n != name);
                installed.push((name.to_string(), version.to_string()));
            }
            Ok(CommandOutput::new(0, ""))
        }

        fn upload_file(&self, _: &Path, _: &str, _: u32) -> Result<(), TransportError> {
            Ok(())
        }

        fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct Fixture {
        handle: ConnectionHandle,
        installed: Rc<RefCell<Vec<(String, String)>>>,
        commands: Rc<RefCell<Vec<String>>>,
    }

    fn fixture(installed: &[(&str, &str)], fail_on: Option<&'static str>) -> Fixture {
        let installed = Rc::new(RefCell::new(
            installed
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        ));
        let commands = Rc::new(RefCell::new(Vec::new()));
        let session = PipSession {
            installed: installed.clone(),
            requires: Vec::new(),
            commands: commands.clone(),
            fail_on,
            has_python: true,
        };
        Fixture {
            handle: ConnectionHandle::new(Box::new(session)),
            installed,
            commands,
        }
    }

    fn requirements(entries: &[(&str, &str)]) -> DeclaredRequirements {
        DeclaredRequirements::new(entries.iter().copied().collect())
    }

    fn reconciler() -> RemotePackageReconciler {
        RemotePackageReconciler::new(RemoteLayout::default(), ReconcileOptions::default())
    }

    fn with_requires(
        installed: &[(&str, &str)],
        requires: Vec<(&'static str, &'static str)>,
    ) -> Fixture {
        let f = fixture(installed, None);
        let session = PipSession {
            installed: f.installed.clone(),
            requires,
            commands: f.commands.clone(),
            fail_on: None,
            has_python: true,
        };
        Fixture {
            handle: ConnectionHandle::new(Box::new(session)),
            ..f
        }
    }

    fn list_calls(commands: &[String]) -> usize {
        commands.iter().filter(|c| c.ends_with("list --format=json")).count()
    }

    #[test]
    fn parse_pip_list_skips_notices() {
        let output = "WARNING: something\n[{\"name\": \"numpy\", \"version\": \"1.26.4\"}]\n";
        let manifest = parse_pip_list(output).unwrap();
        assert_eq!(manifest.get("numpy"), Some("1.26.4"));
    }

    #[test]
    fn parse_pip_list_rejects_garbage() {
        assert!(parse_pip_list("Traceback (most recent call last)").is_err());
        assert!(parse_pip_list("[{\"name\": 3}]").is_err());
    }

    #[test]
    fn remote_packages_are_cached_until_invalidated() {
        let f = fixture(&[("numpy", "1.1")], None);
        let mut r = reconciler();

        r.get_remote_packages(&f.handle).unwrap();
        r.get_remote_packages(&f.handle).unwrap();
        assert_eq!(list_calls(&f.commands.borrow()), 1);

        r.invalidate();
        r.get_remote_packages(&f.handle).unwrap();
        assert_eq!(list_calls(&f.commands.borrow()), 2);
    }

    #[test]
    fn cache_does_not_cross_handles() {
        let a = fixture(&[("numpy", "1.1")], None);
        let b = fixture(&[("scipy", "2.0")], None);
        let mut r = reconciler();

        r.get_remote_packages(&a.handle).unwrap();
        let from_b = r.get_remote_packages(&b.handle).unwrap();
        assert!(from_b.contains("scipy"));
    }

    #[test]
    fn malformed_listing_is_query_error() {
        struct Garbage;
        impl RemoteSession for Garbage {
            fn host(&self) -> &str {
                "rio"
            }
            fn exec(&self, _: &str) -> Result<CommandOutput, TransportError> {
                Ok(CommandOutput::new(0, "Segmentation fault"))
            }
            fn upload_file(&self, _: &Path, _: &str, _: u32) -> Result<(), TransportError> {
                Ok(())
            }
            fn close(&mut self) -> Result<(), TransportError> {
                Ok(())
            }
        }

        let handle = ConnectionHandle::new(Box::new(Garbage));
        let err = reconciler().get_remote_packages(&handle).unwrap_err();
        match err {
            ReconcileError::Query(e) => {
                assert!(matches!(e.source, TransportError::MalformedOutput { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_requires_listing_reads_metadata() {
        let output = "notice: cache dir\n{\"robotpy\": [\"wpilib==2025.1.1\"], \"wpilib\": []}\n";
        let graph = parse_requires_listing(output).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.requires("RobotPy")[0].name, "wpilib");

        assert!(parse_requires_listing("ModuleNotFoundError").is_err());
        assert!(parse_requires_listing("{\"robotpy\": 3}").is_err());
    }

    #[test]
    fn policy_protects_keep_list_and_bootstrap() {
        let r = reconciler();
        let reqs = requirements(&[("numpy", "1.2")]);
        let remote: PackageManifest = [("pip", "24"), ("setuptools", "70"), ("scipy", "2.0")]
            .into_iter()
            .collect();
        let delta = r.compute_delta(&reqs, &remote, &DependencyGraph::new());
        assert_eq!(delta.to_uninstall.iter().collect::<Vec<_>>(), vec!["scipy"]);
    }

    #[test]
    fn policy_protects_dependencies_of_declared_packages() {
        let r = reconciler();
        let mut reqs = requirements(&[("robotpy", "2025.1.1")]);
        reqs.extras
            .insert("robotpy".to_string(), vec!["commands2".to_string()]);
        let remote: PackageManifest = [
            ("robotpy", "2025.1.1"),
            ("wpilib", "2025.1.1"),
            ("pyntcore", "2025.1.1"),
            ("robotpy-commands-v2", "2025.1.1"),
            ("robotpy-cscore", "2025.1.1"),
        ]
        .into_iter()
        .collect();
        let mut graph = DependencyGraph::new();
        graph.insert(
            "robotpy",
            [
                "wpilib==2025.1.1",
                "robotpy-commands-v2==2025.1.1; extra == \"commands2\"",
                "robotpy-cscore==2025.1.1; extra == \"cscore\"",
            ],
        );
        graph.insert("wpilib", ["pyntcore==2025.1.1"]);

        let delta = r.compute_delta(&reqs, &remote, &graph);
        assert_eq!(
            delta.to_uninstall.iter().collect::<Vec<_>>(),
            vec!["robotpy-cscore"]
        );
    }

    #[test]
    fn reconcile_keeps_installed_dependencies() {
        let f = with_requires(
            &[
                ("pip", "24"),
                ("robotpy", "2025.1.1"),
                ("wpilib", "2025.1.1"),
                ("pyntcore", "2025.1.1"),
                ("scipy", "2.0"),
            ],
            vec![
                ("robotpy", "wpilib==2025.1.1"),
                ("wpilib", "pyntcore==2025.1.1"),
            ],
        );
        let mut r = reconciler();
        let reqs = requirements(&[("robotpy", "2025.1.1")]);

        let summary = r
            .reconcile(&f.handle, &reqs, &AlwaysConfirm, &NoopEventSink)
            .unwrap();

        assert_eq!(summary.uninstalled, vec!["scipy"]);
        assert!(summary.installed.is_empty());
        let names: Vec<String> = f.installed.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert!(names.contains(&"wpilib".to_string()));
        assert!(names.contains(&"pyntcore".to_string()));
    }

    #[test]
    fn metadata_is_only_read_when_something_would_be_removed() {
        let f = fixture(&[("pip", "24"), ("numpy", "1.1")], None);
        let mut r = reconciler();
        r.reconcile(
            &f.handle,
            &requirements(&[("numpy", "1.2")]),
            &AlwaysConfirm,
            &NoopEventSink,
        )
        .unwrap();
        assert!(!f.commands.borrow().iter().any(|c| c.contains("importlib.metadata")));
    }

    #[test]
    fn unreadable_metadata_aborts_before_changes() {
        let f = fixture(&[("scipy", "2.0")], Some("importlib.metadata"));
        let mut r = reconciler();
        let err = r
            .reconcile(
                &f.handle,
                &requirements(&[("numpy", "1.2")]),
                &AlwaysConfirm,
                &NoopEventSink,
            )
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Query(_)));
        assert!(!f.commands.borrow().iter().any(|c| c.contains("install ")));
    }

    #[test]
    fn no_uninstall_and_force_install() {
        let r = RemotePackageReconciler::new(
            RemoteLayout::default(),
            ReconcileOptions::default()
                .with_no_uninstall(true)
                .with_force_install(true),
        );
        let reqs = requirements(&[("numpy", "1.2")]);
        let remote: PackageManifest = [("numpy", "1.2"), ("scipy", "2.0")].into_iter().collect();
        let delta = r.compute_delta(&reqs, &remote, &DependencyGraph::new());
        assert!(delta.to_uninstall.is_empty());
        assert_eq!(delta.to_install.get("numpy").map(String::as_str), Some("1.2"));
    }

    #[test]
    fn uninstalls_run_before_installs_and_cache_is_invalidated() {
        let f = fixture(&[("numpy", "1.1"), ("scipy", "2.0"), ("pip", "24")], None);
        let mut r = reconciler();
        let reqs = requirements(&[("numpy", "1.2")]);

        let summary = r
            .reconcile(&f.handle, &reqs, &AlwaysConfirm, &NoopEventSink)
            .unwrap();

        assert_eq!(summary.uninstalled, vec!["scipy"]);
        assert_eq!(summary.installed, vec!["numpy"]);
        assert!(!r.is_cached());

        let commands = f.commands.borrow();
        let stop_at = commands.iter().position(|c| c.ends_with("frcKillRobot.sh -t")).unwrap();
        let uninstall_at = commands.iter().position(|c| c.contains(" uninstall ")).unwrap();
        let install_at = commands.iter().position(|c| c.contains(" install ")).unwrap();
        assert!(stop_at < uninstall_at);
        assert!(uninstall_at < install_at);

        let mut installed = f.installed.borrow().clone();
        installed.sort();
        assert_eq!(
            installed,
            vec![
                ("numpy".to_string(), "1.2".to_string()),
                ("pip".to_string(), "24".to_string())
            ]
        );
    }

    #[test]
    fn first_failure_stops_remaining_changes() {
        let f = fixture(&[], Some("numpy==1.2"));
        let mut r = reconciler();
        let reqs = requirements(&[("numpy", "1.2"), ("pyyaml", "6.0")]);

        let err = r
            .reconcile(&f.handle, &reqs, &AlwaysConfirm, &NoopEventSink)
            .unwrap_err();

        assert_eq!(err.package(), Some("numpy"));
        assert!(err.to_string().contains("No matching distribution"));
        assert!(!f.commands.borrow().iter().any(|c| c.contains("pyyaml")));
        assert!(!r.is_cached());
    }

    #[test]
    fn declined_confirmation_changes_nothing() {
        let f = fixture(&[("scipy", "2.0")], None);
        let mut r = reconciler();
        let reqs = requirements(&[("numpy", "1.2")]);

        let summary = r
            .reconcile(&f.handle, &reqs, &NeverConfirm, &NoopEventSink)
            .unwrap();

        assert!(summary.declined);
        assert!(!summary.changed());
        assert_eq!(f.installed.borrow().len(), 1);
    }

    #[test]
    fn missing_interpreter_is_reported() {
        let installed = Rc::new(RefCell::new(Vec::new()));
        let session = PipSession {
            installed,
            requires: Vec::new(),
            commands: Rc::new(RefCell::new(Vec::new())),
            fail_on: None,
            has_python: false,
        };
        let handle = ConnectionHandle::new(Box::new(session));
        let err = reconciler()
            .reconcile(&handle, &requirements(&[]), &AlwaysConfirm, &NoopEventSink)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InterpreterMissing { .. }));
    }
}
