//! Confirmer Port
//!
//! Operator decisions in the middle of a deploy are an injected function, so
//! the pipeline runs the same with a terminal, a script, or a test.

use crate::domain::entities::PackageDelta;
use crate::domain::services::LargeFile;

/// What the operator is being asked to approve.
#[derive(Debug, Clone, Copy)]
pub enum ConfirmPrompt<'a> {
    /// Ship files above the size threshold
    LargeFiles {
        files: &'a [LargeFile],
        threshold: u64,
    },
    /// Change installed packages on the controller
    ReplacePackages {
        host: &'a str,
        delta: &'a PackageDelta,
    },
}

impl ConfirmPrompt<'_> {
    /// One-line question for interactive prompts.
    pub fn question(&self) -> String {
        match self {
            Self::LargeFiles { files, .. } => {
                format!("Deploy {} large file(s) anyway?", files.len())
            }
            Self::ReplacePackages { host, delta } => format!(
                "Apply {} package change(s) on {}?",
                delta.len(),
                host
            ),
        }
    }
}

/// Decides whether a deploy may proceed past a gate.
///
/// Implementations:
/// - `DialoguerConfirmer`: asks on the terminal
/// - `AlwaysConfirm`: `--yes`
/// - `NeverConfirm`: non-interactive runs
/// - any `Fn(&ConfirmPrompt) -> bool`
pub trait Confirmer {
    fn confirm(&self, prompt: &ConfirmPrompt<'_>) -> bool;
}

/// Approves every prompt.
pub struct AlwaysConfirm;

impl Confirmer for AlwaysConfirm {
    fn confirm(&self, _prompt: &ConfirmPrompt<'_>) -> bool {
        true
    }
}

/// Declines every prompt.
pub struct NeverConfirm;

impl Confirmer for NeverConfirm {
    fn confirm(&self, _prompt: &ConfirmPrompt<'_>) -> bool {
        false
    }
}

impl<F> Confirmer for F
where
    F: Fn(&ConfirmPrompt<'_>) -> bool,
{
    fn confirm(&self, prompt: &ConfirmPrompt<'_>) -> bool {
        self(prompt)
    }
}
