//! Tracing setup shared by the binaries.
//!
//! Logs go to stderr: stdout belongs to `--dry-run` output, printed manifests,
//! and, after the handover, the wrapped process.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "INSTRUMENT_LOG";

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `INSTRUMENT_LOG` wins over `-v` flags.
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("instrumentrunner={}", level_for(verbose))));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
