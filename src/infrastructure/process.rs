//! Bounded child processes
//!
//! Every external tool (`ssh`, `sftp`, `git`) runs through `run_with_timeout`;
//! a hung child is killed once its deadline passes.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::TransportError;

/// Environment variable the askpass helper reads the password from.
pub const PASSWORD_ENV: &str = "ROBODEPLOY_SSH_PASS";

const ASKPASS_SCRIPT: &str = "#!/bin/sh\nprintf '%s\\n' \"$ROBODEPLOY_SSH_PASS\"\n";

/// Captured result of a finished child.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Exit code, or -1 when the child was killed by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Stdout followed by stderr, lossily decoded.
    pub fn combined(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stdout).into_owned();
        out.push_str(&String::from_utf8_lossy(&self.stderr));
        out
    }
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run `cmd` to completion, killing it once `timeout` has elapsed.
///
/// `input` is written to the child's stdin, which is closed afterwards.
pub fn run_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
    label: &str,
    input: Option<&[u8]>,
) -> Result<ProcessOutput, TransportError> {
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| TransportError::Spawn {
        program: program_name(cmd),
        source,
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    if let (Some(data), Some(mut stdin)) = (input, child.stdin.take()) {
        if let Err(e) = stdin.write_all(data) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }
    }

    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(event = "process.timeout", label = %label, secs = timeout.as_secs());
            return Err(TransportError::Timeout {
                label: label.to_string(),
                timeout,
            });
        }
    };

    Ok(ProcessOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Write the askpass helper into `dir` and return its path.
pub fn write_askpass_script(dir: &Path) -> Result<PathBuf, TransportError> {
    let path = dir.join("askpass.sh");
    std::fs::write(&path, ASKPASS_SCRIPT)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(path)
}

/// Make `cmd` answer password prompts through the askpass helper.
pub fn apply_askpass_env(cmd: &mut Command, script: &Path, password: &str) {
    cmd.env(PASSWORD_ENV, password)
        .env("SSH_ASKPASS", script)
        .env("SSH_ASKPASS_REQUIRE", "force")
        .env("DISPLAY", "1");
}
