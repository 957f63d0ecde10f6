//! Plugin installation through the package manager.
//!
//! Installation is the one step with host side effects, so it sits behind the
//! [`PluginInstaller`] trait. The bootstrap hands it the resolved manifest and
//! aborts on the first failure; there is no partially-instrumented launch.

use crate::catalog::PluginId;
use crate::error::{BootstrapError, Result};
use crate::libraries::{LibraryRecord, normalize_name, split_command};
use crate::manifest::ResolvedManifest;
use std::collections::BTreeSet;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Install command used when none is configured; the plugin id is appended.
pub const DEFAULT_INSTALL_COMMAND: &str = "python -m pip install";

pub trait PluginInstaller {
    /// Install one plugin. Must succeed when the plugin is already installed.
    fn install(&mut self, plugin: &PluginId) -> Result<()>;
}

/// Runs `argv... <plugin>` once per plugin.
#[derive(Clone, Debug)]
pub struct CommandInstaller {
    argv: Vec<String>,
}

impl CommandInstaller {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(BootstrapError::Install(
                "install command is empty".to_string(),
            ));
        }
        Ok(Self { argv })
    }

    pub fn from_command_line(command: &str) -> Result<Self> {
        Self::new(split_command(command))
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl PluginInstaller for CommandInstaller {
    fn install(&mut self, plugin: &PluginId) -> Result<()> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| BootstrapError::Install("install command is empty".to_string()))?;
        let rendered = format!("{} {plugin}", self.argv.join(" "));
        info!(command = %rendered, "installing plugin");

        // Output is captured so it never mixes with manifest output on stdout.
        let output = Command::new(program)
            .args(args)
            .arg(plugin.as_str())
            .stdin(Stdio::null())
            .output()
            .map_err(|err| BootstrapError::Install(format!("failed to run {rendered}: {err}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BootstrapError::Install(format!(
                "{rendered} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        debug!(
            plugin = %plugin,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "plugin installed"
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<PluginId>,
    pub already_present: Vec<PluginId>,
}

/// Install every manifest plugin missing from `installed`, in manifest order.
///
/// Plugins that already show up in the library listing are skipped, so
/// re-running a bootstrap against the same environment installs nothing.
pub fn install_manifest<I>(
    manifest: &ResolvedManifest,
    installed: &[LibraryRecord],
    installer: &mut I,
) -> Result<InstallReport>
where
    I: PluginInstaller + ?Sized,
{
    let present: BTreeSet<String> = installed
        .iter()
        .map(LibraryRecord::normalized_name)
        .collect();

    let mut report = InstallReport::default();
    for plugin in manifest.iter() {
        if present.contains(&normalize_name(plugin.as_str())) {
            debug!(plugin = %plugin, "plugin already installed");
            report.already_present.push(plugin.clone());
            continue;
        }
        installer.install(plugin)?;
        report.installed.push(plugin.clone());
    }
    Ok(report)
}
