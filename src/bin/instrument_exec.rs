//! Start-time half of the wrapper: exec a command with the plugins recorded
//! by `instrument-bootstrap` active.

use anyhow::{Context, Result};
use clap::Parser;
use instrumentrunner::cli::{CatalogArgs, LaunchArgs, LogArgs};
use instrumentrunner::logging::init_logging;
use instrumentrunner::{exit_code_for, read_manifest};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "instrument-exec")]
#[command(about = "Exec a command with the plugins from a manifest activated")]
struct Cli {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Manifest written by instrument-bootstrap.
    #[arg(long, value_name = "PATH", env = "INSTRUMENT_MANIFEST_PATH")]
    manifest: PathBuf,
    #[command(flatten)]
    launch: LaunchArgs,
    #[command(flatten)]
    log: LogArgs,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log.verbose);
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("instrument-exec: {err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let index = cli.catalog.load_index().context("loading plugin catalog")?;
    let manifest = read_manifest(&cli.manifest)
        .with_context(|| format!("reading manifest {}", cli.manifest.display()))?;
    Ok(cli.launch.launch(&index, &manifest)?)
}
