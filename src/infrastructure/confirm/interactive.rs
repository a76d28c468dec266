//! Interactive Confirmer
//!
//! Shows what is about to happen on stderr, then asks a yes/no question
//! that defaults to "no".

use std::fmt::Write as _;

use dialoguer::Confirm;

use crate::domain::ports::{ConfirmPrompt, Confirmer};

/// Details shown above the question.
pub fn render_prompt_details(prompt: &ConfirmPrompt<'_>) -> String {
    let mut out = String::new();
    match prompt {
        ConfirmPrompt::LargeFiles { files, threshold } => {
            let _ = writeln!(out, "Files larger than {} bytes:", threshold);
            for file in files.iter() {
                let _ = writeln!(out, "  {} ({} bytes)", file.path.display(), file.size);
            }
        }
        ConfirmPrompt::ReplacePackages { host, delta } => {
            let _ = writeln!(out, "Package changes on {}:", host);
            for line in delta.to_string().lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
    }
    out
}

/// Asks on the terminal. Any prompt failure (no tty, ctrl-c) counts as "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerConfirmer;

impl DialoguerConfirmer {
    pub fn new() -> Self {
        Self
    }
}

impl Confirmer for DialoguerConfirmer {
    fn confirm(&self, prompt: &ConfirmPrompt<'_>) -> bool {
        eprintln!();
        eprint!("{}", render_prompt_details(prompt));

        match Confirm::new()
            .with_prompt(prompt.question())
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(event = "confirm.failed", error = %err, "treating as no");
                false
            }
        }
    }
}
