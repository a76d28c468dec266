//! System `ssh`/`sftp` session
//!
//! One ControlMaster connection per deploy. Commands and uploads multiplex
//! over its control socket, so authentication happens exactly once and every
//! later call is a cheap child process with its own timeout.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::domain::ports::{CommandOutput, RemoteSession, SessionConnector};
use crate::domain::value_objects::{HostKeyChecking, RemoteTarget};
use crate::error::TransportError;
use crate::infrastructure::process::{apply_askpass_env, run_with_timeout, write_askpass_script};

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL: Duration = Duration::from_millis(100);
const SERVER_ALIVE_INTERVAL: u64 = 5;
const SERVER_ALIVE_COUNT: u64 = 3;

/// Connects with the system OpenSSH client.
#[derive(Debug, Clone)]
pub struct SshConnector {
    ssh_program: String,
    sftp_program: String,
}

impl Default for SshConnector {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            sftp_program: "sftp".to_string(),
        }
    }
}

impl SshConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use different client binaries, e.g. a wrapper script.
    pub fn with_programs(ssh: impl Into<String>, sftp: impl Into<String>) -> Self {
        Self {
            ssh_program: ssh.into(),
            sftp_program: sftp.into(),
        }
    }
}

impl SessionConnector for SshConnector {
    fn connect(&self, target: &RemoteTarget) -> Result<Box<dyn RemoteSession>, TransportError> {
        let session = SshSession::open(target.clone(), self.clone())?;
        Ok(Box::new(session))
    }
}

/// An authenticated ControlMaster connection to one controller.
pub struct SshSession {
    target: RemoteTarget,
    programs: SshConnector,
    control_dir: TempDir,
    control_path: PathBuf,
    askpass: Option<PathBuf>,
    master: Option<Child>,
}

impl SshSession {
    fn open(target: RemoteTarget, programs: SshConnector) -> Result<Self, TransportError> {
        // Socket paths are length-limited; keep the directory name short.
        let control_dir = tempfile::Builder::new().prefix("rd").tempdir()?;
        let control_path = control_dir.path().join("ctl");
        let askpass = match &target.password {
            Some(_) => Some(write_askpass_script(control_dir.path())?),
            None => None,
        };

        let mut session = Self {
            target,
            programs,
            control_dir,
            control_path,
            askpass,
            master: None,
        };
        session.spawn_master()?;
        session.wait_until_ready()?;
        tracing::debug!(event = "ssh.master_ready", host = %session.target.host);
        Ok(session)
    }

    fn common_options(&self) -> Vec<String> {
        let mut opts = vec![
            format!("ControlPath={}", self.control_path.display()),
            format!(
                "StrictHostKeyChecking={}",
                self.target.host_key_checking.as_ssh_option()
            ),
            "LogLevel=ERROR".to_string(),
        ];
        if self.target.host_key_checking == HostKeyChecking::No {
            opts.push("UserKnownHostsFile=/dev/null".to_string());
        }
        opts
    }

    fn ssh_command(&self) -> Command {
        let mut cmd = Command::new(&self.programs.ssh_program);
        for opt in self.common_options() {
            cmd.arg("-o").arg(opt);
        }
        cmd.arg("-p")
            .arg(self.target.port.to_string())
            .arg("-l")
            .arg(&self.target.user);
        cmd
    }

    fn master_log(&self) -> PathBuf {
        self.control_dir.path().join("master.log")
    }

    fn spawn_master(&mut self) -> Result<(), TransportError> {
        let mut cmd = self.ssh_command();
        cmd.arg("-N")
            .arg("-T")
            .arg("-o")
            .arg("ControlMaster=yes")
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                self.target.connect_timeout.as_secs().max(1)
            ))
            .arg("-o")
            .arg(format!("ServerAliveInterval={}", SERVER_ALIVE_INTERVAL))
            .arg("-o")
            .arg(format!("ServerAliveCountMax={}", SERVER_ALIVE_COUNT));

        match (&self.target.password, &self.askpass) {
            (Some(password), Some(script)) => {
                cmd.arg("-o")
                    .arg("PreferredAuthentications=password,keyboard-interactive,publickey")
                    .arg("-o")
                    .arg("NumberOfPasswordPrompts=1");
                apply_askpass_env(&mut cmd, script, password);
            }
            _ => {
                cmd.arg("-o").arg("BatchMode=yes");
            }
        }
        cmd.arg(&self.target.host);

        let log = File::create(self.master_log())?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log));

        tracing::debug!(event = "ssh.master_spawn", host = %self.target.host);
        let child = cmd.spawn().map_err(|source| TransportError::Spawn {
            program: self.programs.ssh_program.clone(),
            source,
        })?;
        self.master = Some(child);
        Ok(())
    }

    fn master_detail(&self, fallback: String) -> String {
        let detail = fs::read_to_string(self.master_log()).unwrap_or_default();
        let detail = detail.trim();
        if detail.is_empty() {
            fallback
        } else {
            detail.to_string()
        }
    }

    fn check_master(&self) -> Result<bool, TransportError> {
        let mut cmd = self.ssh_command();
        cmd.arg("-O").arg("check").arg(&self.target.host);
        let output = run_with_timeout(&mut cmd, CHECK_TIMEOUT, "ssh -O check", None)?;
        Ok(output.status.success())
    }

    /// Poll the control socket until the master has authenticated.
    fn wait_until_ready(&mut self) -> Result<(), TransportError> {
        let budget = self.target.connect_timeout + CHECK_TIMEOUT;
        let deadline = Instant::now() + budget;
        loop {
            let exited = match self.master.as_mut() {
                Some(master) => master.try_wait()?,
                None => {
                    return Err(TransportError::SessionClosed {
                        host: self.target.host.clone(),
                    })
                }
            };
            if let Some(status) = exited {
                self.master = None;
                return Err(TransportError::Unreachable {
                    host: self.target.host.clone(),
                    detail: self.master_detail(format!("ssh exited with {}", status)),
                });
            }
            if self.control_path.exists() && self.check_master()? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                self.kill_master();
                return Err(TransportError::Timeout {
                    label: format!("ssh connect to {}", self.target.host),
                    timeout: budget,
                });
            }
            thread::sleep(READY_POLL);
        }
    }

    fn kill_master(&mut self) {
        if let Some(mut master) = self.master.take() {
            let _ = master.kill();
            let _ = master.wait();
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.master.is_none() {
            return Err(TransportError::SessionClosed {
                host: self.target.host.clone(),
            });
        }
        Ok(())
    }
}

/// Quote one argument for an sftp batch file.
fn sftp_quote(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Batch script uploading `local` to `remote` with `mode`.
pub fn upload_batch(local: &Path, remote: &str, mode: u32) -> String {
    let remote = sftp_quote(remote);
    format!(
        "put {} {}\nchmod {:o} {}\n",
        sftp_quote(&local.to_string_lossy()),
        remote,
        mode & 0o7777,
        remote
    )
}

impl RemoteSession for SshSession {
    fn host(&self) -> &str {
        &self.target.host
    }

    fn exec(&self, command: &str) -> Result<CommandOutput, TransportError> {
        self.ensure_open()?;
        let mut cmd = self.ssh_command();
        cmd.arg("-T")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(&self.target.host)
            .arg(command);
        let output = run_with_timeout(&mut cmd, self.target.command_timeout, command, None)?;
        Ok(CommandOutput::new(output.code(), output.combined()))
    }

    fn upload_file(&self, local: &Path, remote: &str, mode: u32) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut cmd = Command::new(&self.programs.sftp_program);
        for opt in self.common_options() {
            cmd.arg("-o").arg(opt);
        }
        cmd.arg("-q")
            .arg("-P")
            .arg(self.target.port.to_string())
            .arg("-b")
            .arg("-")
            .arg(format!("{}@{}", self.target.user, self.target.host));

        let batch = upload_batch(local, remote, mode);
        let label = format!("sftp put {}", remote);
        let output = run_with_timeout(
            &mut cmd,
            self.target.command_timeout,
            &label,
            Some(batch.as_bytes()),
        )?;
        if !output.status.success() {
            return Err(TransportError::NonZeroExit {
                command: label,
                status: output.code(),
                output: output.combined(),
            });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.master.is_none() {
            return Ok(());
        }
        let mut cmd = self.ssh_command();
        cmd.arg("-O").arg("exit").arg(&self.target.host);
        let result = run_with_timeout(&mut cmd, CHECK_TIMEOUT, "ssh -O exit", None);
        self.kill_master();
        tracing::debug!(event = "ssh.master_closed", host = %self.target.host);
        result.map(|_| ())
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.master.is_some() {
            let _ = self.close();
        }
    }
}
