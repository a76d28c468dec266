//! Deploy command entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;

use crate::application::{DeployOptions, DeployOutcome};
use crate::config::Config;
use crate::domain::ports::{AlwaysConfirm, Confirmer, DeployEventSink, NeverConfirm};
use crate::domain::value_objects::AbortReason;
use crate::infrastructure::{ConsoleEventSink, DialoguerConfirmer, JsonEventSink};

use super::cli::Cli;
use super::factory::create_deploy_executor;

/// Merge CLI flags over the loaded configuration.
pub fn build_options(cli: &Cli, config: &Config, host: &str) -> DeployOptions {
    let mut target = config.target(host);
    if let Some(user) = &cli.user {
        target.user = user.clone();
    }
    if let Some(password) = &cli.password {
        target.password = Some(password.clone());
    }

    let main_file = cli
        .main_file
        .clone()
        .unwrap_or_else(|| config.deploy.main_file.clone());
    let packages = config
        .reconcile_options()
        .with_force_install(cli.force_install)
        .with_no_uninstall(cli.no_uninstall);

    let mut options = DeployOptions::new(cli.project.clone(), target)
        .with_main_file(main_file)
        .with_skip_tests(cli.skip_tests)
        .with_large_file_threshold(config.deploy.large_file_threshold)
        .with_confirm_large_files(cli.large)
        .with_debug(cli.debug)
        .with_no_install(cli.no_install)
        .with_packages(packages);
    for root in &config.deploy.forbidden_roots {
        options = options.with_forbidden_root(root);
    }
    options
}

fn hint(reason: AbortReason) -> Option<&'static str> {
    match reason {
        AbortReason::BlockedByLargeFiles => Some("use --large to deploy them anyway"),
        AbortReason::RequirementsInvalid => {
            Some("fix pyproject.toml, or use --no-install to skip package installation")
        }
        AbortReason::ConnectionFailed => {
            Some("check that the controller is powered on and reachable")
        }
        _ => None,
    }
}

fn report(outcome: &DeployOutcome) {
    match outcome {
        DeployOutcome::Succeeded(report) => {
            println!("{}", outcome);
            if report.packages_skipped {
                println!("packages were not checked (--no-install)");
            } else if report.packages.declined {
                println!("package changes were declined; existing packages kept");
            }
        }
        DeployOutcome::Skipped(abort) | DeployOutcome::Failed(abort) => {
            eprintln!("error: {}", outcome);
            if let Some(hint) = hint(abort.reason) {
                eprintln!("hint: {}", hint);
            }
        }
    }
}

/// Run one deploy and return the process exit code.
pub fn cmd_deploy(cli: &Cli) -> Result<i32> {
    let host = cli
        .host()
        .context("either --robot or --team is required")?;

    let (config, warnings) = Config::load_layered(&cli.project)
        .with_context(|| format!("loading configuration for {}", cli.project.display()))?;
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    let options = build_options(cli, &config, &host);
    let executor = create_deploy_executor(&config, &options.main_file);

    let events: Arc<dyn DeployEventSink> = if cli.json {
        Arc::new(JsonEventSink::stdout())
    } else {
        Arc::new(ConsoleEventSink::new(cli.verbose > 0))
    };

    let interactive = !cli.json && std::io::stdin().is_terminal();
    let confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AlwaysConfirm)
    } else if interactive {
        Box::new(DialoguerConfirmer::new())
    } else {
        Box::new(NeverConfirm)
    };

    tracing::info!("deploying {} to {}", options.project_root.display(), host);
    let outcome = executor.execute_full(&options, events, confirmer.as_ref());

    if !cli.json {
        report(&outcome);
    }
    Ok(outcome.exit_code())
}
