//! Common test utilities for robodeploy integration tests.
//!
//! This module provides:
//! - `Controller`: an in-memory controller (files, packages, command log)
//! - `FakeConnector`: a `SessionConnector` backed by a `Controller`
//! - `FixedEnvironment`: deterministic build provenance
//! - project fixtures written with `tempfile`

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use robodeploy::domain::entities::VcsInfo;
use robodeploy::domain::ports::{BuildEnvironment, CommandOutput, RemoteSession, SessionConnector};
use robodeploy::domain::value_objects::{RemoteLayout, RemoteTarget};
use robodeploy::TransportError;
use tempfile::TempDir;

/// What the fake controller holds and what was done to it.
#[derive(Default)]
pub struct Controller {
    pub files: BTreeMap<String, Vec<u8>>,
    pub packages: BTreeMap<String, String>,
    /// `Requires-Dist` lines per installed package
    pub requires: BTreeMap<String, Vec<String>>,
    pub commands: Vec<String>,
    pub uploads: usize,
    pub connects: usize,
    /// SSH user of every connection attempt, in order
    pub users: Vec<String>,
    pub closed: usize,
    pub refuse_connection: bool,
    pub fail_upload_at: Option<usize>,
}

impl Controller {
    /// A controller that already runs an older deploy.
    pub fn with_previous_deploy() -> Rc<RefCell<Controller>> {
        let layout = RemoteLayout::default();
        let mut controller = Controller::default();
        controller.files.insert(
            format!("{}/robot.py", layout.code_dir()),
            b"old robot".to_vec(),
        );
        controller.packages.insert("pip".into(), "24.0".into());
        controller.packages.insert("robotpy".into(), "2024.3.2".into());
        controller.packages.insert("scipy".into(), "1.0".into());
        Rc::new(RefCell::new(controller))
    }

    /// Files under the live code directory, keyed by relative path.
    pub fn code_files(&self) -> BTreeMap<String, Vec<u8>> {
        let prefix = format!("{}/", RemoteLayout::default().code_dir());
        self.files
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|r| (r.to_string(), v.clone())))
            .collect()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands.iter().any(|c| c.contains(needle))
    }

    fn move_tree(&mut self, from: &str, to: &str) {
        let from_prefix = format!("{}/", from);
        let to_prefix = format!("{}/", to);
        self.files.retain(|k, _| !k.starts_with(&to_prefix));
        let moved: Vec<String> = self
            .files
            .keys()
            .filter(|k| k.starts_with(&from_prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(content) = self.files.remove(&key) {
                let rest = &key[from_prefix.len()..];
                self.files.insert(format!("{}{}", to_prefix, rest), content);
            }
        }
    }

    fn clear_tree(&mut self, dir: &str) {
        let prefix = format!("{}/", dir);
        self.files.retain(|k, _| !k.starts_with(&prefix));
    }
}

fn last_token(command: &str) -> String {
    command
        .split_whitespace()
        .last()
        .unwrap_or("")
        .trim_matches('\'')
        .to_string()
}

pub struct FakeSession {
    host: String,
    controller: Rc<RefCell<Controller>>,
}

impl RemoteSession for FakeSession {
    fn host(&self) -> &str {
        &self.host
    }

    fn exec(&self, command: &str) -> Result<CommandOutput, TransportError> {
        let layout = RemoteLayout::default();
        let mut controller = self.controller.borrow_mut();
        controller.commands.push(command.to_string());

        if command.contains("importlib.metadata") {
            let listing: BTreeMap<&String, Vec<String>> = controller
                .packages
                .keys()
                .map(|name| (name, controller.requires.get(name).cloned().unwrap_or_default()))
                .collect();
            return Ok(CommandOutput::new(0, serde_json::json!(listing).to_string()));
        }
        if command.contains(" list --format=json") {
            let entries: Vec<serde_json::Value> = controller
                .packages
                .iter()
                .map(|(n, v)| serde_json::json!({ "name": n, "version": v }))
                .collect();
            return Ok(CommandOutput::new(0, serde_json::Value::from(entries).to_string()));
        }
        if command.contains(" uninstall ") {
            let name = last_token(command);
            controller.packages.remove(&name);
        } else if command.contains(" install ") {
            let spec = last_token(command);
            let (name, version) = spec.split_once("==").unwrap_or((spec.as_str(), "*"));
            let name = name.split('[').next().unwrap_or(name);
            controller
                .packages
                .insert(name.to_string(), version.to_string());
        } else if command.contains(" && mv ") {
            controller.move_tree(&layout.staging_dir(), &layout.code_dir());
        } else if command.starts_with("rm -rf") {
            controller.clear_tree(&layout.staging_dir());
        } else if command.contains("frcUserProgram") {
            let home = format!("{}/", layout.deploy_dir);
            controller.files.retain(|k, _| {
                let Some(name) = k.strip_prefix(&home) else {
                    return true;
                };
                !(name == "frcUserProgram" || (name.ends_with(".jar") && !name.contains('/')))
            });
        }
        Ok(CommandOutput::new(0, ""))
    }

    fn upload_file(&self, local: &Path, remote: &str, _mode: u32) -> Result<(), TransportError> {
        let mut controller = self.controller.borrow_mut();
        if controller.fail_upload_at == Some(controller.uploads) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "link dropped",
            )));
        }
        controller.uploads += 1;
        let content = fs::read(local)?;
        controller.files.insert(remote.to_string(), content);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.controller.borrow_mut().closed += 1;
        Ok(())
    }
}

pub struct FakeConnector {
    pub controller: Rc<RefCell<Controller>>,
}

impl SessionConnector for FakeConnector {
    fn connect(&self, target: &RemoteTarget) -> Result<Box<dyn RemoteSession>, TransportError> {
        let mut controller = self.controller.borrow_mut();
        controller.connects += 1;
        controller.users.push(target.user.clone());
        if controller.refuse_connection {
            return Err(TransportError::Unreachable {
                host: target.host.clone(),
                detail: "No route to host".to_string(),
            });
        }
        Ok(Box::new(FakeSession {
            host: target.host.clone(),
            controller: self.controller.clone(),
        }))
    }
}

pub struct FixedEnvironment;

impl BuildEnvironment for FixedEnvironment {
    fn hostname(&self) -> String {
        "drivestation".to_string()
    }

    fn username(&self) -> String {
        "team1234".to_string()
    }

    fn now(&self) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    fn vcs_info(&self, _root: &Path) -> Option<VcsInfo> {
        None
    }
}

pub const PYPROJECT: &str = r#"[project]
name = "robot"

[tool.robotpy]
robotpy_version = "2025.1.1"
robotpy_extras = ["commands2"]
requires = ["numpy==1.26.4"]
"#;

pub fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A typical robot project, including clutter that must never be shipped.
pub fn robot_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "robot.py", b"import wpilib\n");
    write(root, "pyproject.toml", PYPROJECT.as_bytes());
    write(root, "subsystems/drive.py", b"class Drive: pass\n");
    write(root, "subsystems/__pycache__/drive.cpython-312.pyc", b"\0\0");
    write(root, ".git/HEAD", b"ref: refs/heads/main\n");
    write(root, "venv/bin/python", b"#!");
    write(root, ".vscode/settings.json", b"{}");
    write(root, "dist/robot-0.1.whl", b"PK");
    dir
}

/// A `Write` whose bytes stay readable after it is moved into a sink.
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
