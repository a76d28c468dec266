//! Runs the project's tests as a child process.

use std::io;
use std::path::Path;
use std::process::Command;

use crate::domain::ports::LocalTestRunner;

/// `{main}` is replaced with the robot's main file.
pub const DEFAULT_TEST_COMMAND: &str = "python3 -m robotpy --main {main} test";

const MAIN_PLACEHOLDER: &str = "{main}";

/// Runs a command line in the project root and reports its exit status.
///
/// Output goes straight to the operator's terminal.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    argv: Vec<String>,
    main_file: String,
}

impl CommandTestRunner {
    pub fn new(main_file: impl Into<String>) -> Self {
        Self {
            argv: DEFAULT_TEST_COMMAND
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            main_file: main_file.into(),
        }
    }

    /// Use an explicit argument vector instead of the default.
    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        if !argv.is_empty() {
            self.argv = argv;
        }
        self
    }

    /// Use a shell-style command line instead of the default.
    pub fn with_command_line(mut self, line: &str) -> io::Result<Self> {
        let argv = shell_words::split(line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        if argv.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty test command",
            ));
        }
        self.argv = argv;
        Ok(self)
    }

    /// The argument vector with `{main}` substituted.
    pub fn argv(&self) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.replace(MAIN_PLACEHOLDER, &self.main_file))
            .collect()
    }
}

impl LocalTestRunner for CommandTestRunner {
    fn run(&self, project_root: &Path) -> io::Result<i32> {
        let argv = self.argv();
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty test command"))?;

        tracing::info!(event = "tests.run", command = %shell_words::join(&argv));
        let status = Command::new(program)
            .args(args)
            .current_dir(project_root)
            .status()?;
        Ok(status.code().unwrap_or(-1))
    }
}
