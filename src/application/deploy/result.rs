//! Deploy Outcome
//!
//! Reported once per invocation. Either the controller runs the new code, or
//! the pipeline stopped at a named transition.

use std::fmt;

use crate::application::reconcile::ReconcileSummary;
use crate::domain::entities::BuildManifest;
use crate::domain::value_objects::{AbortReason, DeployState, Transition};
use crate::error::DeployError;

/// Exit code for a completed deploy
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a deploy that failed after reaching the controller
pub const EXIT_FAILED: i32 = 1;
/// Exit code for a deploy stopped before anything remote happened
pub const EXIT_SKIPPED: i32 = 2;

/// Details of a successful deploy
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub host: String,
    pub files_uploaded: usize,
    pub total_bytes: u64,
    pub packages: ReconcileSummary,
    /// Reconciliation was not attempted
    pub packages_skipped: bool,
    pub manifest: Option<BuildManifest>,
    pub history: Vec<DeployState>,
}

/// Details of a stopped deploy
#[derive(Debug)]
pub struct DeployAbort {
    /// The step that did not complete
    pub during: Transition,
    pub reason: AbortReason,
    pub error: DeployError,
    pub history: Vec<DeployState>,
}

/// Terminal result of a deploy
#[derive(Debug)]
pub enum DeployOutcome {
    Succeeded(DeployReport),
    /// Stopped before the controller was touched
    Skipped(DeployAbort),
    /// Stopped after contacting the controller
    Failed(DeployAbort),
}

impl DeployOutcome {
    pub fn aborted(abort: DeployAbort) -> Self {
        if abort.reason.is_pre_remote() {
            Self::Skipped(abort)
        } else {
            Self::Failed(abort)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded(_) => EXIT_SUCCESS,
            Self::Skipped(_) => EXIT_SKIPPED,
            Self::Failed(_) => EXIT_FAILED,
        }
    }

    pub fn abort(&self) -> Option<&DeployAbort> {
        match self {
            Self::Succeeded(_) => None,
            Self::Skipped(abort) | Self::Failed(abort) => Some(abort),
        }
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.abort().map(|a| a.reason)
    }

    pub fn error(&self) -> Option<&DeployError> {
        self.abort().map(|a| &a.error)
    }

    /// The terminal state reached
    pub fn final_state(&self) -> DeployState {
        match self {
            Self::Succeeded(_) => DeployState::Restarted,
            Self::Skipped(abort) | Self::Failed(abort) => DeployState::Aborted(abort.reason),
        }
    }

    pub fn history(&self) -> &[DeployState] {
        match self {
            Self::Succeeded(report) => &report.history,
            Self::Skipped(abort) | Self::Failed(abort) => &abort.history,
        }
    }
}

impl fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded(report) => write!(
                f,
                "deployed {} file(s) ({} bytes) to {}",
                report.files_uploaded, report.total_bytes, report.host
            ),
            Self::Skipped(abort) | Self::Failed(abort) => write!(
                f,
                "{} during {}: {}",
                abort.reason, abort.during, abort.error
            ),
        }
    }
}
