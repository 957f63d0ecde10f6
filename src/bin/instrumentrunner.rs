//! Discover, resolve, install, and launch in one invocation.
//!
//! Intended as a container entrypoint:
//!
//! ```text
//! instrumentrunner --exclude opentelemetry-instrumentation-aws-lambda -- \
//!     python manage.py runserver 0.0.0.0:8000
//! ```
//!
//! On success the target replaces this process, so its exit code is the
//! container's exit code. Any failure before that exits with 70.

use anyhow::{Context, Result};
use clap::Parser;
use instrumentrunner::cli::{CatalogArgs, LaunchArgs, LogArgs, ResolveArgs};
use instrumentrunner::logging::init_logging;
use instrumentrunner::{PluginInstaller, exit_code_for, run_bootstrap};

#[derive(Parser, Debug)]
#[command(name = "instrumentrunner")]
#[command(about = "Install matching instrumentation plugins and exec a command with them active")]
struct Cli {
    #[command(flatten)]
    catalog: CatalogArgs,
    #[command(flatten)]
    resolve: ResolveArgs,
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
            eprintln!("instrumentrunner: {err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let index = cli.catalog.load_index().context("loading plugin catalog")?;
    let source = cli.resolve.library_source()?;
    // A dry run must not touch the environment.
    let mut installer = if cli.launch.dry_run {
        None
    } else {
        cli.resolve.installer()?
    };

    let outcome = run_bootstrap(
        index.catalog(),
        &source,
        &cli.resolve.exclusions(),
        installer
            .as_mut()
            .map(|installer| installer as &mut dyn PluginInstaller),
    )?;

    Ok(cli.launch.launch(&index, &outcome.manifest)?)
}
