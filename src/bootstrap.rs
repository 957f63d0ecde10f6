//! Discover, resolve, and install in one pass.
//!
//! This is the build-time half of the wrapper. It stops at the first error,
//! so a launch never follows a partially installed plugin set.

use crate::catalog::PluginCatalog;
use crate::error::Result;
use crate::installer::{InstallReport, PluginInstaller, install_manifest};
use crate::libraries::{LibraryRecord, LibrarySource, discover, normalize_name};
use crate::manifest::ResolvedManifest;
use crate::resolver::{ExclusionSet, resolve};
use tracing::{info, warn};

#[derive(Debug)]
pub struct BootstrapOutcome {
    pub libraries: Vec<LibraryRecord>,
    pub manifest: ResolvedManifest,
    pub report: InstallReport,
}

/// Run discovery and resolution, then install through `installer` when given.
pub fn run_bootstrap(
    catalog: &PluginCatalog,
    source: &LibrarySource,
    exclusions: &ExclusionSet,
    installer: Option<&mut dyn PluginInstaller>,
) -> Result<BootstrapOutcome> {
    let libraries = discover(source)?;
    info!(count = libraries.len(), "discovered installed libraries");

    for excluded in exclusions {
        let wanted = normalize_name(excluded.as_str());
        let known = catalog
            .entries
            .iter()
            .any(|e| normalize_name(e.plugin_id.as_str()) == wanted);
        if !known {
            warn!(plugin = %excluded, "excluded plugin is not in the catalog");
        }
    }

    let manifest = resolve(&libraries, catalog, exclusions)?;
    let report = match installer {
        Some(installer) => install_manifest(&manifest, &libraries, installer)?,
        None => InstallReport::default(),
    };
    info!(
        plugins = manifest.len(),
        installed = report.installed.len(),
        already_present = report.already_present.len(),
        "bootstrap complete"
    );

    Ok(BootstrapOutcome {
        libraries,
        manifest,
        report,
    })
}
