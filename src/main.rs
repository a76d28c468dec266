//! robodeploy CLI
//!
//! Usage: robodeploy [PROJECT] (--robot <HOST> | --team <N>) [OPTIONS]

use anyhow::Result;
use clap::Parser;

use robodeploy::presentation::{cmd_deploy, init_logging, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    let code = cmd_deploy(&cli)?;
    std::process::exit(code);
}
