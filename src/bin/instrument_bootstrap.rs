//! Build-time half of the wrapper: resolve and install plugins, then record
//! the manifest for `instrument-exec`.
//!
//! Without `--manifest` the manifest is printed to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use instrumentrunner::cli::{CatalogArgs, LogArgs, ResolveArgs};
use instrumentrunner::logging::init_logging;
use instrumentrunner::manifest::manifest_to_string;
use instrumentrunner::{PluginInstaller, exit_code_for, run_bootstrap, write_manifest};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "instrument-bootstrap")]
#[command(about = "Resolve and install instrumentation plugins, then write the manifest")]
struct Cli {
    #[command(flatten)]
    catalog: CatalogArgs,
    #[command(flatten)]
    resolve: ResolveArgs,
    /// Where to write the manifest.
    #[arg(long, value_name = "PATH", env = "INSTRUMENT_MANIFEST_PATH")]
    manifest: Option<PathBuf>,
    #[command(flatten)]
    log: LogArgs,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log.verbose);
    if let Err(err) = run(&cli) {
        eprintln!("instrument-bootstrap: {err:#}");
        std::process::exit(exit_code_for(&err));
    }
}

fn run(cli: &Cli) -> Result<()> {
    let index = cli.catalog.load_index().context("loading plugin catalog")?;
    let source = cli.resolve.library_source()?;
    let mut installer = cli.resolve.installer()?;

    let outcome = run_bootstrap(
        index.catalog(),
        &source,
        &cli.resolve.exclusions(),
        installer
            .as_mut()
            .map(|installer| installer as &mut dyn PluginInstaller),
    )?;

    match &cli.manifest {
        Some(path) => {
            write_manifest(path, &outcome.manifest)?;
            eprintln!(
                "instrument-bootstrap: wrote {} plugin(s) to {}",
                outcome.manifest.len(),
                path.display()
            );
        }
        None => println!("{}", manifest_to_string(&outcome.manifest)?),
    }
    Ok(())
}
