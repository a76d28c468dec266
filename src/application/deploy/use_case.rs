//! Deploy Use Case
//!
//! Drives one deploy through its states:
//! 1. Stage the project tree (after the unsafe-root guard)
//! 2. Validate: main file, large files, local tests, declared requirements
//! 3. Open the session to the controller
//! 4. Remove other toolchains' programs, reconcile remote packages
//! 5. Upload into the staging directory and swap it in
//! 6. Restart the robot program
//!
//! Every step returns a tagged result; the executor matches on it to pick
//! the next state or the abort reason. Nothing is retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::build_info::BuildMetadataWriter;
use crate::application::connection::{ConnectionHandle, ConnectionManager};
use crate::application::reconcile::{ReconcileSummary, RemotePackageReconciler};
use crate::domain::entities::{DeclaredRequirements, ProjectSnapshot};
use crate::domain::ports::{
    BuildEnvironment, ConfirmPrompt, Confirmer, DeployEvent, DeployEventSink, LocalTestRunner,
    NeverConfirm, NoopEventSink, ProjectStager, RequirementsSource, SessionConnector,
};
use crate::domain::services::LargeFileGuard;
use crate::domain::value_objects::{AbortReason, DeployState, RemoteLayout, Transition};
use crate::error::{DeployError, ReconcileError, ValidationError};

use super::options::DeployOptions;
use super::result::{DeployAbort, DeployOutcome, DeployReport};

/// Deploy executor - owns the state machine for one controller
///
/// Parameterized by the stager and the session connector so tests can run
/// the whole pipeline against in-memory doubles.
pub struct DeployExecutor<S, C>
where
    S: ProjectStager,
    C: SessionConnector,
{
    stager: S,
    connector: C,
    requirements: Box<dyn RequirementsSource>,
    test_runner: Box<dyn LocalTestRunner>,
    environment: Box<dyn BuildEnvironment>,
    layout: RemoteLayout,
}

impl<S, C> DeployExecutor<S, C>
where
    S: ProjectStager,
    C: SessionConnector,
{
    pub fn new(
        stager: S,
        connector: C,
        requirements: Box<dyn RequirementsSource>,
        test_runner: Box<dyn LocalTestRunner>,
        environment: Box<dyn BuildEnvironment>,
    ) -> Self {
        Self {
            stager,
            connector,
            requirements,
            test_runner,
            environment,
            layout: RemoteLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: RemoteLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &RemoteLayout {
        &self.layout
    }

    /// Run a non-interactive deploy: every confirmation is declined.
    pub fn execute(&self, options: &DeployOptions) -> DeployOutcome {
        self.execute_full(options, Arc::new(NoopEventSink), &NeverConfirm)
    }

    /// Run a non-interactive deploy, reporting progress to `event_sink`.
    pub fn execute_with_events(
        &self,
        options: &DeployOptions,
        event_sink: Arc<dyn DeployEventSink>,
    ) -> DeployOutcome {
        self.execute_full(options, event_sink, &NeverConfirm)
    }

    /// Run a deploy with progress reporting and operator decisions.
    pub fn execute_full(
        &self,
        options: &DeployOptions,
        event_sink: Arc<dyn DeployEventSink>,
        confirmer: &dyn Confirmer,
    ) -> DeployOutcome {
        let events = event_sink.as_ref();
        let mut run = Run::new(events);

        tracing::info!(
            event = "deploy.start",
            root = %options.project_root.display(),
            host = %options.target.host,
            "starting deploy"
        );

        // INIT → STAGED
        if let Err(error) = check_project_root(&options.project_root, &options.forbidden_roots) {
            return run.abort(AbortReason::UnsafeRoot, error);
        }
        let snapshot = match self.stage(&options.project_root) {
            Ok(snapshot) => snapshot,
            Err(error) => return run.abort(AbortReason::StagingFailed, error),
        };
        events.on_event(DeployEvent::Staged {
            file_count: snapshot.len(),
            total_bytes: snapshot.total_bytes(),
        });
        run.advance();

        // STAGED → VALIDATED
        let requirements = match self.validate(&snapshot, options, confirmer, events) {
            Ok(requirements) => requirements,
            Err((reason, error)) => return run.abort(reason, error.into()),
        };
        run.advance();

        // VALIDATED → CONNECTED
        let manager = ConnectionManager::new(&self.connector, options.target.clone());
        let mut handle = match manager.open() {
            Ok(handle) => handle,
            Err(error) => return run.abort(AbortReason::ConnectionFailed, error),
        };
        events.on_event(DeployEvent::Connected {
            host: handle.host().to_string(),
        });
        run.advance();

        let outcome = self.run_remote(run, &handle, &snapshot, requirements, options, confirmer);

        if let Err(e) = handle.close() {
            tracing::warn!(event = "ssh.close_failed", error = %e, "failed to close session");
        }
        outcome
    }

    fn stage(&self, project_root: &Path) -> Result<ProjectSnapshot, DeployError> {
        let snapshot = self.stager.stage(project_root)?;
        tracing::info!(
            event = "deploy.staged",
            files = snapshot.len(),
            bytes = snapshot.total_bytes(),
            hash = %snapshot.content_hash()
        );
        let snapshot = BuildMetadataWriter::new(self.environment.as_ref()).embed(snapshot)?;
        Ok(snapshot)
    }

    /// Local gates, in order: main file, large files, tests, requirements.
    ///
    /// Returns the declared requirements, or `None` when installs are off.
    fn validate(
        &self,
        snapshot: &ProjectSnapshot,
        options: &DeployOptions,
        confirmer: &dyn Confirmer,
        events: &dyn DeployEventSink,
    ) -> Result<Option<DeclaredRequirements>, (AbortReason, ValidationError)> {
        if snapshot.find(Path::new(&options.main_file)).is_none() {
            return Err((
                AbortReason::MainFileMissing,
                ValidationError::MainFileMissing {
                    main_file: options.main_file.clone(),
                    project_root: snapshot.source_root().to_path_buf(),
                },
            ));
        }

        let guard = LargeFileGuard::new(options.large_file_threshold);
        let report = guard.inspect(snapshot);
        if !report.is_clean() {
            events.on_event(DeployEvent::LargeFilesFound {
                files: report.oversized.clone(),
                threshold: guard.threshold(),
            });
            let approved = options.confirm_large_files
                || confirmer.confirm(&ConfirmPrompt::LargeFiles {
                    files: &report.oversized,
                    threshold: guard.threshold(),
                });
            if !approved {
                return Err((
                    AbortReason::BlockedByLargeFiles,
                    ValidationError::LargeFiles {
                        files: report.oversized,
                        threshold: guard.threshold(),
                    },
                ));
            }
            tracing::warn!(
                event = "deploy.large_files_confirmed",
                count = report.oversized.len()
            );
        }

        if options.skip_tests {
            tracing::warn!(event = "deploy.tests_skipped", "skipping local tests");
        } else {
            events.on_event(DeployEvent::TestsStarted);
            let status = self
                .test_runner
                .run(snapshot.source_root())
                .map_err(|e| (AbortReason::TestsFailed, ValidationError::TestRunner(e)))?;
            events.on_event(DeployEvent::TestsFinished { status });
            if status != 0 {
                return Err((AbortReason::TestsFailed, ValidationError::TestsFailed { status }));
            }
        }

        if options.no_install {
            return Ok(None);
        }
        self.requirements
            .load(snapshot.source_root())
            .map(Some)
            .map_err(|e| (AbortReason::RequirementsInvalid, e.into()))
    }

    /// The remote half: CONNECTED → RECONCILED → TRANSFERRED → RESTARTED.
    fn run_remote(
        &self,
        mut run: Run<'_>,
        handle: &ConnectionHandle,
        snapshot: &ProjectSnapshot,
        requirements: Option<DeclaredRequirements>,
        options: &DeployOptions,
        confirmer: &dyn Confirmer,
    ) -> DeployOutcome {
        let events = run.events;

        // CONNECTED → RECONCILED
        let cleanup = handle.execute(
            "removing other robot programs",
            &self.layout.remove_foreign_programs_command(),
            true,
        );
        if let Err(error) = cleanup {
            return run.abort(
                AbortReason::ReconciliationFailed,
                DeployError::RemoteExecution(error),
            );
        }

        let (packages, packages_skipped) = match requirements {
            None => {
                tracing::info!(event = "packages.skipped", "package installation disabled");
                events.on_event(DeployEvent::PackagesSkipped {
                    reason: "installs disabled".to_string(),
                });
                (ReconcileSummary::default(), true)
            }
            Some(requirements) => {
                match self.reconcile(handle, &requirements, options, confirmer, events) {
                    Ok(summary) => (summary, false),
                    Err((reason, error)) => return run.abort(reason, error),
                }
            }
        };
        run.advance();

        // RECONCILED → TRANSFERRED
        let files_uploaded = match self.transfer(handle, snapshot, events) {
            Ok(count) => count,
            Err(error) => return run.abort(AbortReason::TransferFailed, error),
        };
        run.advance();

        // TRANSFERRED → RESTARTED
        events.on_event(DeployEvent::Restarting {
            debug: options.debug,
        });
        if let Err(error) = self.restart(handle, &options.main_file, options.debug) {
            return run.abort(AbortReason::RestartFailed, error);
        }
        run.advance();

        events.on_event(DeployEvent::Completed {
            host: handle.host().to_string(),
            file_count: files_uploaded,
            total_bytes: snapshot.total_bytes(),
        });
        tracing::info!(
            event = "deploy.completed",
            host = %handle.host(),
            files = files_uploaded,
            "deploy complete"
        );

        DeployOutcome::Succeeded(DeployReport {
            host: handle.host().to_string(),
            files_uploaded,
            total_bytes: snapshot.total_bytes(),
            packages,
            packages_skipped,
            manifest: snapshot.manifest().cloned(),
            history: run.history,
        })
    }

    /// Package changes run as the packages user. When that differs from the
    /// deploy user a second session is opened and closed again here.
    fn reconcile(
        &self,
        handle: &ConnectionHandle,
        requirements: &DeclaredRequirements,
        options: &DeployOptions,
        confirmer: &dyn Confirmer,
        events: &dyn DeployEventSink,
    ) -> Result<ReconcileSummary, (AbortReason, DeployError)> {
        let mut reconciler =
            RemotePackageReconciler::new(self.layout.clone(), options.packages.clone());
        let failed = |error: ReconcileError| {
            (AbortReason::ReconciliationFailed, DeployError::Reconciliation(error))
        };

        if options.packages.user == options.target.user {
            return reconciler
                .reconcile(handle, requirements, confirmer, events)
                .map_err(failed);
        }

        let mut target = options.target.clone();
        target.user = options.packages.user.clone();
        let mut packages_handle = ConnectionManager::new(&self.connector, target)
            .open()
            .map_err(|error| (AbortReason::ConnectionFailed, error))?;

        let result = reconciler.reconcile(&packages_handle, requirements, confirmer, events);
        if let Err(e) = packages_handle.close() {
            tracing::warn!(event = "ssh.close_failed", error = %e, "failed to close session");
        }
        result.map_err(failed)
    }

    /// Upload into the staging directory, then swap it in as the live code.
    ///
    /// The live directory is only touched once every file is on the
    /// controller.
    fn transfer(
        &self,
        handle: &ConnectionHandle,
        snapshot: &ProjectSnapshot,
        events: &dyn DeployEventSink,
    ) -> Result<usize, DeployError> {
        let staging = self.layout.staging_dir();
        handle
            .execute(
                "preparing staging directory",
                &self.layout.prepare_staging_command(),
                false,
            )
            .map_err(|source| DeployError::Transfer {
                path: PathBuf::from(&staging),
                source,
            })?;

        let total = snapshot.len();
        let detailed = events.wants_detailed_events();
        let uploaded = handle.upload(snapshot, &staging, |index, file| {
            if detailed {
                events.on_event(DeployEvent::FileUploaded {
                    index,
                    total,
                    path: file.relative_path().to_path_buf(),
                });
            }
        })?;

        handle
            .execute("replacing deployed code", &self.layout.swap_command(), false)
            .map_err(|source| DeployError::Transfer {
                path: PathBuf::from(self.layout.code_dir()),
                source,
            })?;

        Ok(uploaded)
    }

    /// Stop-then-start sequence for the robot program.
    fn restart(
        &self,
        handle: &ConnectionHandle,
        main_file: &str,
        debug: bool,
    ) -> Result<(), DeployError> {
        let layout = &self.layout;
        let mut steps: Vec<(&str, String, bool)> = vec![(
            "writing start command",
            layout.write_robot_command(main_file, debug),
            false,
        )];
        if debug {
            steps.push(("enabling debug mode", layout.debug_marker_command(), false));
        }
        steps.extend([
            ("compiling deployed code", layout.compile_command(debug), false),
            ("setting ownership", layout.chown_command(), false),
            ("syncing filesystem", "sync".to_string(), false),
            // Nothing may be running.
            ("stopping robot program", layout.stop_command(), true),
            ("starting robot program", layout.start_command(), false),
        ]);

        for (operation, command, tolerate) in steps {
            handle
                .execute(operation, &command, tolerate)
                .map_err(DeployError::Restart)?;
        }
        Ok(())
    }
}

/// Refuse the home directory, the filesystem root, and configured roots.
fn check_project_root(root: &Path, extra: &[PathBuf]) -> Result<(), DeployError> {
    let candidate = normalize(root);

    if candidate.parent().is_none() {
        return Err(DeployError::UnsafeRoot {
            path: root.to_path_buf(),
            reason: "it is the filesystem root".to_string(),
        });
    }
    if let Some(home) = dirs::home_dir() {
        if candidate == normalize(&home) {
            return Err(DeployError::UnsafeRoot {
                path: root.to_path_buf(),
                reason: "it is your home directory".to_string(),
            });
        }
    }
    if extra.iter().any(|forbidden| candidate == normalize(forbidden)) {
        return Err(DeployError::UnsafeRoot {
            path: root.to_path_buf(),
            reason: "it is listed in forbidden_roots".to_string(),
        });
    }
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Current state plus the path taken to reach it.
struct Run<'a> {
    state: DeployState,
    history: Vec<DeployState>,
    events: &'a dyn DeployEventSink,
}

impl<'a> Run<'a> {
    fn new(events: &'a dyn DeployEventSink) -> Self {
        Self {
            state: DeployState::Init,
            history: vec![DeployState::Init],
            events,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            self.enter(next);
        }
    }

    fn enter(&mut self, to: DeployState) {
        let from = self.state;
        tracing::debug!(event = "deploy.state", from = %from, to = %to);
        self.events.on_event(DeployEvent::StateChanged { from, to });
        self.state = to;
        self.history.push(to);
    }

    fn abort(mut self, reason: AbortReason, error: DeployError) -> DeployOutcome {
        let from = self.state;
        let during = Transition::new(from, from.next().unwrap_or(from));
        tracing::error!(
            event = "deploy.aborted",
            during = %during,
            reason = %reason,
            error = %error
        );
        self.events.on_event(DeployEvent::Aborted {
            from,
            reason,
            error: error.to_string(),
        });
        self.enter(DeployState::Aborted(reason));
        DeployOutcome::aborted(DeployAbort {
            during,
            reason,
            error,
            history: self.history,
        })
    }
}
