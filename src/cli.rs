//! Argument groups shared by the binaries.
//!
//! Flags resolve as command line > environment variable > default, so a
//! container recipe can configure the wrapper entirely through `ENV` lines.

use crate::catalog::{PluginId, PluginIndex, load_catalog};
use crate::error::Result;
use crate::forwarded_exit_code;
use crate::installer::{CommandInstaller, DEFAULT_INSTALL_COMMAND};
use crate::launcher::{Launcher, current_environment};
use crate::libraries::{DEFAULT_DISCOVER_COMMAND, LibrarySource};
use crate::manifest::ResolvedManifest;
use crate::resolver::ExclusionSet;
use clap::Args;
use std::path::PathBuf;

const SERVICE_NAME_VAR: &str = "OTEL_SERVICE_NAME";

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Plugin catalog to use instead of the bundled one.
    #[arg(long, value_name = "PATH", env = "INSTRUMENT_CATALOG_PATH")]
    pub catalog: Option<PathBuf>,
}

impl CatalogArgs {
    pub fn load_index(&self) -> Result<PluginIndex> {
        PluginIndex::new(load_catalog(self.catalog.as_deref())?)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Never activate this plugin (repeatable, or comma separated).
    #[arg(
        long = "exclude",
        value_name = "PLUGIN_ID",
        env = "INSTRUMENT_EXCLUDE",
        value_delimiter = ','
    )]
    pub exclude: Vec<String>,

    /// Read the installed-library listing from this file instead of running
    /// the discovery command.
    #[arg(long, value_name = "PATH")]
    pub libraries: Option<PathBuf>,

    /// Command printing the installed-library listing as JSON.
    #[arg(
        long,
        value_name = "CMD",
        env = "INSTRUMENT_DISCOVER_COMMAND",
        default_value = DEFAULT_DISCOVER_COMMAND
    )]
    pub discover_command: String,

    /// Command installing one plugin; the plugin id is appended.
    #[arg(
        long,
        value_name = "CMD",
        env = "INSTRUMENT_INSTALL_COMMAND",
        default_value = DEFAULT_INSTALL_COMMAND
    )]
    pub install_command: String,

    /// Resolve without installing anything.
    #[arg(long)]
    pub skip_install: bool,
}

impl ResolveArgs {
    pub fn exclusions(&self) -> ExclusionSet {
        self.exclude
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(PluginId::from)
            .collect()
    }

    pub fn library_source(&self) -> Result<LibrarySource> {
        match &self.libraries {
            Some(path) => Ok(LibrarySource::Listing(path.clone())),
            None => LibrarySource::from_command_line(&self.discover_command),
        }
    }

    /// `None` when installation is skipped.
    pub fn installer(&self) -> Result<Option<CommandInstaller>> {
        if self.skip_install {
            return Ok(None);
        }
        CommandInstaller::from_command_line(&self.install_command).map(Some)
    }
}

#[derive(Args, Debug, Clone)]
pub struct LaunchArgs {
    /// Exported as OTEL_SERVICE_NAME, overriding the environment and catalog.
    #[arg(long, value_name = "NAME", env = "INSTRUMENT_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Print the resolved program, command, and overlay as JSON instead of
    /// starting the command.
    #[arg(long)]
    pub dry_run: bool,

    /// Command to run, after `--`.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl LaunchArgs {
    /// Start the command with `manifest` active and return the exit code to
    /// report. On Unix a successful start never returns.
    pub fn launch(&self, index: &PluginIndex, manifest: &ResolvedManifest) -> Result<i32> {
        let mut launcher = Launcher::new(index);
        if let Some(name) = &self.service_name {
            launcher = launcher.with_override(SERVICE_NAME_VAR, name.clone());
        }
        let mut prepared = launcher.prepare(manifest, &self.command, &current_environment())?;

        if self.dry_run {
            println!("{}", prepared.describe());
            return Ok(0);
        }
        let status = prepared.replace()?;
        Ok(forwarded_exit_code(status))
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct LogArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
