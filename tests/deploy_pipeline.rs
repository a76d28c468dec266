//! End-to-end deploy pipeline scenarios.
//!
//! Real staging, real `pyproject.toml` parsing and real event sinks; only
//! the controller is faked.

mod common;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use common::{robot_project, write, Controller, FakeConnector, FixedEnvironment, SharedBuffer};
use robodeploy::application::{DeployExecutor, DeployOptions, DeployOutcome};
use robodeploy::domain::entities::BuildManifest;
use robodeploy::domain::ports::{
    AlwaysConfirm, Confirmer, DeployEventSink, NeverConfirm, NoopEventSink,
};
use robodeploy::domain::value_objects::{AbortReason, DeployState, RemoteTarget};
use robodeploy::infrastructure::{FileStager, JsonEventSink, PyprojectRequirements};
use robodeploy::DeployError;

type Executor = DeployExecutor<FileStager, FakeConnector>;

fn executor(controller: &Rc<RefCell<Controller>>, test_status: i32) -> Executor {
    DeployExecutor::new(
        FileStager::new(),
        FakeConnector {
            controller: controller.clone(),
        },
        Box::new(PyprojectRequirements::new()),
        Box::new(move |_: &Path| -> std::io::Result<i32> { Ok(test_status) }),
        Box::new(FixedEnvironment),
    )
}

fn noop() -> Arc<dyn DeployEventSink> {
    Arc::new(NoopEventSink)
}

fn options(root: &Path) -> DeployOptions {
    DeployOptions::new(root, RemoteTarget::new("roborio-1234-frc.local", "lvuser"))
}

fn deploy(
    controller: &Rc<RefCell<Controller>>,
    options: &DeployOptions,
    confirmer: &dyn Confirmer,
) -> DeployOutcome {
    executor(controller, 0).execute_full(options, noop(), confirmer)
}

#[test]
fn deploys_project_and_reconciles_packages() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();

    let outcome = deploy(&controller, &options(project.path()), &AlwaysConfirm);

    assert!(outcome.is_success(), "{}", outcome);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.final_state(), DeployState::Restarted);

    let controller = controller.borrow();
    let shipped: Vec<String> = controller.code_files().keys().cloned().collect();
    assert_eq!(
        shipped,
        vec!["deploy.json", "pyproject.toml", "robot.py", "subsystems/drive.py"]
    );

    assert_eq!(controller.packages.get("robotpy").map(String::as_str), Some("2025.1.1"));
    assert_eq!(controller.packages.get("numpy").map(String::as_str), Some("1.26.4"));
    assert!(controller.packages.contains_key("pip"));
    assert!(!controller.packages.contains_key("scipy"));
    assert!(controller.ran("robotpy[commands2]==2025.1.1"));
    assert_eq!(controller.users, vec!["lvuser", "admin"]);
    assert_eq!(controller.closed, 2);
}

#[test]
fn redeploy_keeps_dependencies_of_declared_packages() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();
    {
        let mut c = controller.borrow_mut();
        c.packages.clear();
        for (name, version) in [
            ("pip", "24.0"),
            ("robotpy", "2025.1.1"),
            ("numpy", "1.26.4"),
            ("wpilib", "2025.1.1"),
            ("pyntcore", "2025.1.1"),
            ("robotpy-wpiutil", "2025.1.1"),
            ("robotpy-commands-v2", "2025.1.1"),
            ("robotpy-cscore", "2025.1.1"),
        ] {
            c.packages.insert(name.into(), version.into());
        }
        let requires = |lines: &[&str]| lines.iter().map(|l| l.to_string()).collect();
        c.requires.insert(
            "robotpy".into(),
            requires(&[
                "wpilib==2025.1.1",
                "pyntcore==2025.1.1",
                "robotpy-commands-v2==2025.1.1; extra == \"commands2\"",
                "robotpy-cscore==2025.1.1; extra == \"cscore\"",
            ]),
        );
        c.requires.insert(
            "wpilib".into(),
            requires(&["pyntcore==2025.1.1", "robotpy-wpiutil==2025.1.1"]),
        );
        c.requires
            .insert("robotpy-commands-v2".into(), requires(&["wpilib>=2025.1.1"]));
    }

    let outcome = deploy(&controller, &options(project.path()), &AlwaysConfirm);

    let report = match outcome {
        DeployOutcome::Succeeded(report) => report,
        other => panic!("deploy failed: {}", other),
    };
    assert_eq!(report.packages.uninstalled, vec!["robotpy-cscore".to_string()]);
    let controller = controller.borrow();
    for name in ["wpilib", "pyntcore", "robotpy-wpiutil", "robotpy-commands-v2"] {
        assert!(controller.packages.contains_key(name), "{} was uninstalled", name);
        assert!(!controller.ran(&format!("--yes {}", name)));
    }
}

#[test]
fn leftover_java_program_is_removed_and_robot_stopped_before_packages() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();
    controller
        .borrow_mut()
        .files
        .insert("/home/lvuser/FRCUserProgram.jar".into(), b"PK".to_vec());

    let outcome = deploy(&controller, &options(project.path()), &AlwaysConfirm);
    assert!(outcome.is_success(), "{}", outcome);

    let controller = controller.borrow();
    assert!(!controller.files.contains_key("/home/lvuser/FRCUserProgram.jar"));
    let commands = &controller.commands;
    let cleanup = commands.iter().position(|c| c.contains("frcUserProgram")).unwrap();
    let stop = commands.iter().position(|c| c.ends_with("frcKillRobot.sh -t")).unwrap();
    let uninstall = commands.iter().position(|c| c.contains(" uninstall ")).unwrap();
    assert!(cleanup < stop);
    assert!(stop < uninstall);
}

#[test]
fn embedded_manifest_describes_the_deploy() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();

    let outcome = deploy(&controller, &options(project.path()), &AlwaysConfirm);
    let report = match outcome {
        DeployOutcome::Succeeded(report) => report,
        other => panic!("deploy failed: {}", other),
    };

    let files = controller.borrow().code_files();
    let manifest: BuildManifest = serde_json::from_slice(&files["deploy.json"]).unwrap();
    assert_eq!(manifest.deploy_host, "drivestation");
    assert_eq!(manifest.deploy_user, "team1234");
    assert!(manifest.git_hash.is_none());
    assert_eq!(Some(manifest), report.manifest);
}

#[test]
fn large_file_stops_before_connecting() {
    let project = robot_project();
    write(project.path(), "paths/auto.json", &vec![b'x'; 300_000]);
    let controller = Controller::with_previous_deploy();

    let outcome = deploy(&controller, &options(project.path()), &NeverConfirm);

    assert_eq!(outcome.reason(), Some(AbortReason::BlockedByLargeFiles));
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(controller.borrow().connects, 0);
    assert!(outcome.to_string().contains("paths/auto.json"));

    let outcome = executor(&controller, 0).execute_full(
        &options(project.path()).with_confirm_large_files(true),
        noop(),
        &AlwaysConfirm,
    );
    assert!(outcome.is_success(), "{}", outcome);
    assert!(controller.borrow().code_files().contains_key("paths/auto.json"));
}

#[test]
fn failing_tests_block_the_deploy_unless_skipped() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();

    let outcome =
        executor(&controller, 1).execute_full(&options(project.path()), noop(), &AlwaysConfirm);
    assert_eq!(outcome.reason(), Some(AbortReason::TestsFailed));
    assert_eq!(controller.borrow().connects, 0);

    let outcome = executor(&controller, 1).execute_full(
        &options(project.path()).with_skip_tests(true),
        noop(),
        &AlwaysConfirm,
    );
    assert!(outcome.is_success(), "{}", outcome);
}

#[test]
fn missing_pyproject_requires_no_install() {
    let project = robot_project();
    std::fs::remove_file(project.path().join("pyproject.toml")).unwrap();
    let controller = Controller::with_previous_deploy();

    let outcome = deploy(&controller, &options(project.path()), &AlwaysConfirm);
    assert_eq!(outcome.reason(), Some(AbortReason::RequirementsInvalid));

    let outcome = executor(&controller, 0).execute_full(
        &options(project.path()).with_no_install(true),
        noop(),
        &AlwaysConfirm,
    );
    assert!(outcome.is_success(), "{}", outcome);
    let controller = controller.borrow();
    assert!(!controller.ran(" install "));
    assert_eq!(controller.packages.get("scipy").map(String::as_str), Some("1.0"));
}

#[test]
fn interrupted_transfer_keeps_previous_code() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();
    controller.borrow_mut().fail_upload_at = Some(1);

    let outcome = deploy(&controller, &options(project.path()), &AlwaysConfirm);

    assert_eq!(outcome.reason(), Some(AbortReason::TransferFailed));
    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(outcome.error(), Some(DeployError::Transfer { .. })));

    let controller = controller.borrow();
    assert_eq!(
        controller.code_files().get("robot.py").map(Vec::as_slice),
        Some(&b"old robot"[..])
    );
    assert!(!controller.ran("frcKillRobot.sh -t -r"));
    assert_eq!(controller.closed, 2);
}

#[test]
fn unreachable_controller_fails_after_local_checks() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();
    controller.borrow_mut().refuse_connection = true;

    let outcome = deploy(&controller, &options(project.path()), &AlwaysConfirm);

    assert_eq!(outcome.reason(), Some(AbortReason::ConnectionFailed));
    assert!(outcome.to_string().contains("No route to host"));
    assert!(outcome.to_string().contains("VALIDATED"));
}

#[test]
fn refuses_filesystem_root() {
    let controller = Controller::with_previous_deploy();

    let outcome = executor(&controller, 0).execute_full(
        &options(Path::new("/")),
        noop(),
        &AlwaysConfirm,
    );

    assert_eq!(outcome.reason(), Some(AbortReason::UnsafeRoot));
    assert_eq!(
        outcome.history(),
        &[DeployState::Init, DeployState::Aborted(AbortReason::UnsafeRoot)]
    );
}

#[test]
fn json_events_trace_the_pipeline() {
    let project = robot_project();
    let controller = Controller::with_previous_deploy();
    let buffer = SharedBuffer::default();
    let sink: Arc<dyn DeployEventSink> = Arc::new(JsonEventSink::with_writer(buffer.clone()));

    let outcome =
        executor(&controller, 0).execute_full(&options(project.path()), sink, &AlwaysConfirm);
    assert!(outcome.is_success(), "{}", outcome);

    let events = buffer.lines();
    let names: Vec<&str> = events.iter().filter_map(|e| e["event"].as_str()).collect();
    assert_eq!(names.first(), Some(&"state"));
    assert!(names.contains(&"staged"));
    assert!(names.contains(&"package_installed"));
    assert_eq!(names.last(), Some(&"complete"));
    assert_eq!(events.last().unwrap()["status"], "success");
}
