//! Instrumentation bootstrap and launch wrapper.
//!
//! The crate resolves which telemetry instrumentation plugins apply to the
//! libraries installed in a runtime environment, installs them through the
//! package manager, and execs a target command with the plugins' activation
//! hooks exported into its environment.
//!
//! Binaries:
//! - `instrumentrunner`: discover, resolve, install, and launch in one step.
//! - `instrument-bootstrap`: the build-time half; writes a manifest.
//! - `instrument-exec`: the start-time half; launches from a manifest.

pub mod bootstrap;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod installer;
pub mod launcher;
pub mod libraries;
pub mod logging;
pub mod manifest;
pub mod resolver;
pub mod runtime;

pub use bootstrap::{BootstrapOutcome, run_bootstrap};
pub use catalog::{
    ActivationHook, PluginCatalog, PluginCatalogEntry, PluginId, PluginIndex, bundled_catalog,
    load_catalog, load_catalog_from_path,
};
pub use error::{BootstrapError, EXIT_PRE_LAUNCH, exit_code_for};
pub use installer::{CommandInstaller, InstallReport, PluginInstaller, install_manifest};
pub use launcher::{
    Environment, LaunchSpec, LaunchState, Launcher, PreparedLaunch, current_environment,
};
pub use libraries::{LibraryRecord, LibrarySource, discover, normalize_name, parse_listing};
pub use manifest::{ResolvedManifest, read_manifest, write_manifest};
pub use resolver::{ExclusionSet, is_excluded, resolve};

use std::process::ExitStatus;

/// Exit code to forward for a finished target.
///
/// Signal deaths map to `128 + signal`, the shell convention.
pub fn forwarded_exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
