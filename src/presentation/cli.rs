//! CLI Argument Parsing
//!
//! This module defines the CLI interface using clap. Values given here win
//! over environment variables and config files.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// robodeploy - deploy a robot project to its controller
#[derive(Parser, Debug)]
#[command(name = "robodeploy")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("destination").required(true).args(["robot", "team"])))]
pub struct Cli {
    /// Project directory containing the main file
    #[arg(default_value = ".")]
    pub project: PathBuf,

    /// Hostname or IP address of the controller
    #[arg(long)]
    pub robot: Option<String>,

    /// Team number; deploys to roborio-<team>-frc.local
    #[arg(long)]
    pub team: Option<u32>,

    /// SSH user (default: lvuser)
    #[arg(long)]
    pub user: Option<String>,

    /// SSH password (default: the controller's empty password)
    #[arg(long)]
    pub password: Option<String>,

    /// Robot entry point, relative to the project directory
    #[arg(long = "main", value_name = "FILE")]
    pub main_file: Option<String>,

    /// Deploy without running the local test suite
    #[arg(long)]
    pub skip_tests: bool,

    /// Start the robot program in debug mode
    #[arg(long)]
    pub debug: bool,

    /// Allow files larger than the size threshold without asking
    #[arg(long, alias = "confirm-large-files")]
    pub large: bool,

    /// Answer yes to every prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Do not touch packages on the controller
    #[arg(long)]
    pub no_install: bool,

    /// Reinstall every declared package
    #[arg(long, conflicts_with = "no_install")]
    pub force_install: bool,

    /// Never uninstall packages from the controller
    #[arg(long)]
    pub no_uninstall: bool,

    /// Emit NDJSON events on stdout
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Controller address from `--robot` or `--team`.
    pub fn host(&self) -> Option<String> {
        match (&self.robot, self.team) {
            (Some(robot), _) => Some(robot.trim().to_string()),
            (None, Some(team)) => Some(team_hostname(team)),
            (None, None) => None,
        }
    }
}

/// mDNS name of a team's controller.
pub fn team_hostname(team: u32) -> String {
    format!("roborio-{}-frc.local", team)
}
