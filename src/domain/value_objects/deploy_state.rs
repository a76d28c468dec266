//! Deploy pipeline states
//!
//! `INIT → STAGED → VALIDATED → CONNECTED → RECONCILED → TRANSFERRED → RESTARTED`,
//! with `ABORTED(reason)` reachable from every non-terminal state.

use std::fmt;

/// One state of the deploy pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    Init,
    Staged,
    Validated,
    Connected,
    Reconciled,
    Transferred,
    /// Terminal success
    Restarted,
    /// Terminal failure
    Aborted(AbortReason),
}

impl DeployState {
    /// The state a successful step moves to, or `None` when terminal.
    pub fn next(self) -> Option<DeployState> {
        match self {
            Self::Init => Some(Self::Staged),
            Self::Staged => Some(Self::Validated),
            Self::Validated => Some(Self::Connected),
            Self::Connected => Some(Self::Reconciled),
            Self::Reconciled => Some(Self::Transferred),
            Self::Transferred => Some(Self::Restarted),
            Self::Restarted | Self::Aborted(_) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Restarted | Self::Aborted(_))
    }

    /// Upper-case label used in operator-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Staged => "STAGED",
            Self::Validated => "VALIDATED",
            Self::Connected => "CONNECTED",
            Self::Reconciled => "RECONCILED",
            Self::Transferred => "TRANSFERRED",
            Self::Restarted => "RESTARTED",
            Self::Aborted(_) => "ABORTED",
        }
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted(reason) => write!(f, "ABORTED({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Why a deploy was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    UnsafeRoot,
    StagingFailed,
    MainFileMissing,
    BlockedByLargeFiles,
    TestsFailed,
    RequirementsInvalid,
    ConnectionFailed,
    ReconciliationFailed,
    TransferFailed,
    RestartFailed,
}

impl AbortReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsafeRoot => "unsafe root",
            Self::StagingFailed => "staging failed",
            Self::MainFileMissing => "main file missing",
            Self::BlockedByLargeFiles => "blocked by large files",
            Self::TestsFailed => "tests failed",
            Self::RequirementsInvalid => "invalid requirements",
            Self::ConnectionFailed => "connection failed",
            Self::ReconciliationFailed => "package reconciliation failed",
            Self::TransferFailed => "transfer failed",
            Self::RestartFailed => "restart failed",
        }
    }

    /// True when nothing on the controller was touched before the abort.
    pub fn is_pre_remote(self) -> bool {
        matches!(
            self,
            Self::UnsafeRoot
                | Self::StagingFailed
                | Self::MainFileMissing
                | Self::BlockedByLargeFiles
                | Self::TestsFailed
                | Self::RequirementsInvalid
        )
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step of the pipeline, reported as e.g. `RECONCILED→TRANSFERRED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DeployState,
    pub to: DeployState,
}

impl Transition {
    pub fn new(from: DeployState, to: DeployState) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.from.label(), self.to.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_visits_every_state_once() {
        let mut state = DeployState::Init;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            visited.push(next);
            state = next;
        }
        assert_eq!(
            visited,
            vec![
                DeployState::Init,
                DeployState::Staged,
                DeployState::Validated,
                DeployState::Connected,
                DeployState::Reconciled,
                DeployState::Transferred,
                DeployState::Restarted,
            ]
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn aborted_is_terminal() {
        let state = DeployState::Aborted(AbortReason::TransferFailed);
        assert!(state.is_terminal());
        assert_eq!(state.next(), None);
        assert_eq!(state.to_string(), "ABORTED(transfer failed)");
    }

    #[test]
    fn transition_display_names_both_states() {
        let t = Transition::new(DeployState::Reconciled, DeployState::Transferred);
        assert_eq!(t.to_string(), "RECONCILED→TRANSFERRED");
    }

    #[test]
    fn pre_remote_reasons() {
        assert!(AbortReason::UnsafeRoot.is_pre_remote());
        assert!(AbortReason::BlockedByLargeFiles.is_pre_remote());
        assert!(!AbortReason::ConnectionFailed.is_pre_remote());
        assert!(!AbortReason::RestartFailed.is_pre_remote());
    }
}
