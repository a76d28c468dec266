//! Deploy Options

use std::path::PathBuf;

use crate::application::reconcile::ReconcileOptions;
use crate::domain::services::DEFAULT_LARGE_FILE_THRESHOLD;
use crate::domain::value_objects::RemoteTarget;

/// Inputs for one deploy invocation
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Local project directory
    pub project_root: PathBuf,
    /// Controller to deploy to
    pub target: RemoteTarget,
    /// Entry point, relative to the project root
    pub main_file: String,
    /// Skip the local test suite
    pub skip_tests: bool,
    /// Per-file size above which operator confirmation is required
    pub large_file_threshold: u64,
    /// Ship large files without asking
    pub confirm_large_files: bool,
    /// Start the program in debug mode
    pub debug: bool,
    /// Skip package reconciliation entirely
    pub no_install: bool,
    /// Package reconciliation policy
    pub packages: ReconcileOptions,
    /// Extra directories that may never be deployed from. The operator's
    /// home directory and `/` are always refused.
    pub forbidden_roots: Vec<PathBuf>,
}

impl DeployOptions {
    pub fn new(project_root: impl Into<PathBuf>, target: RemoteTarget) -> Self {
        Self {
            project_root: project_root.into(),
            target,
            main_file: "robot.py".to_string(),
            skip_tests: false,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            confirm_large_files: false,
            debug: false,
            no_install: false,
            packages: ReconcileOptions::default(),
            forbidden_roots: Vec::new(),
        }
    }

    pub fn with_main_file(mut self, main_file: impl Into<String>) -> Self {
        self.main_file = main_file.into();
        self
    }

    pub fn with_skip_tests(mut self, skip: bool) -> Self {
        self.skip_tests = skip;
        self
    }

    pub fn with_large_file_threshold(mut self, threshold: u64) -> Self {
        self.large_file_threshold = threshold;
        self
    }

    pub fn with_confirm_large_files(mut self, confirm: bool) -> Self {
        self.confirm_large_files = confirm;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_no_install(mut self, no_install: bool) -> Self {
        self.no_install = no_install;
        self
    }

    pub fn with_packages(mut self, packages: ReconcileOptions) -> Self {
        self.packages = packages;
        self
    }

    pub fn with_forbidden_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.forbidden_roots.push(root.into());
        self
    }
}
