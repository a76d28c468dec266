//! Logging bootstrap
//!
//! Everything goes to stderr so `--json` keeps stdout clean. `RUST_LOG`
//! overrides the level picked from `-v`.

use tracing_subscriber::EnvFilter;

fn default_directive(verbose: u8, json: bool) -> &'static str {
    match (verbose, json) {
        (0, true) => "warn",
        (0, false) => "info",
        (1, _) => "debug",
        _ => "trace",
    }
}

pub fn init_logging(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, json)));

    // A second init (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
