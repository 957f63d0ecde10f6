//! Resolved manifest value and its file format.
//!
//! The manifest is written once by the bootstrap step and read once per
//! launch. Writes go through a temp file in the destination directory and a
//! rename, so a launcher never observes a half-written manifest.

use crate::catalog::PluginId;
use crate::error::{BootstrapError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const MANIFEST_SCHEMA_VERSION: &str = "plugin_manifest_v1";

/// Mode of a written manifest file.
#[cfg(unix)]
pub const MANIFEST_MODE: u32 = 0o644;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Ordered, duplicate-free list of plugins to activate.
pub struct ResolvedManifest {
    plugins: Vec<PluginId>,
}

impl ResolvedManifest {
    /// Build from an ordered list; later duplicates are dropped.
    pub fn from_plugins(plugins: impl IntoIterator<Item = PluginId>) -> Self {
        let mut ordered: Vec<PluginId> = Vec::new();
        for plugin in plugins {
            if !ordered.contains(&plugin) {
                ordered.push(plugin);
            }
        }
        Self { plugins: ordered }
    }

    pub fn plugins(&self) -> &[PluginId] {
        &self.plugins
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginId> {
        self.plugins.iter()
    }

    pub fn contains(&self, plugin: &PluginId) -> bool {
        self.plugins.contains(plugin)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    schema_version: String,
    plugins: Vec<PluginId>,
}

pub fn manifest_to_string(manifest: &ResolvedManifest) -> Result<String> {
    let file = ManifestFile {
        schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
        plugins: manifest.plugins.clone(),
    };
    serde_json::to_string_pretty(&file)
        .map_err(|err| BootstrapError::Manifest(format!("serializing manifest: {err}")))
}

pub fn parse_manifest(contents: &str, origin: &Path) -> Result<ResolvedManifest> {
    let file: ManifestFile = serde_json::from_str(contents)
        .map_err(|err| BootstrapError::Manifest(format!("parsing {}: {err}", origin.display())))?;
    if file.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(BootstrapError::Manifest(format!(
            "unsupported manifest version '{}' in {}, expected {}",
            file.schema_version,
            origin.display(),
            MANIFEST_SCHEMA_VERSION
        )));
    }
    if let Some(blank) = file.plugins.iter().position(|p| p.as_str().trim().is_empty()) {
        return Err(BootstrapError::Manifest(format!(
            "plugin {} in {} is empty",
            blank + 1,
            origin.display()
        )));
    }
    let count = file.plugins.len();
    let manifest = ResolvedManifest::from_plugins(file.plugins);
    if manifest.len() != count {
        return Err(BootstrapError::Manifest(format!(
            "{} lists a plugin more than once",
            origin.display()
        )));
    }
    Ok(manifest)
}

pub fn read_manifest(path: &Path) -> Result<ResolvedManifest> {
    let contents = fs::read_to_string(path).map_err(|err| BootstrapError::io(path, err))?;
    parse_manifest(&contents, path)
}

/// Atomically replace `path` with the serialized manifest.
pub fn write_manifest(path: &Path, manifest: &ResolvedManifest) -> Result<()> {
    let rendered = manifest_to_string(manifest)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|err| BootstrapError::io(dir, err))?;
    let temp_path = file.path().to_path_buf();
    writeln!(file, "{rendered}").map_err(|err| BootstrapError::io(&temp_path, err))?;
    // Temp files are created 0600; the launch step may run as another user.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(MANIFEST_MODE))
            .map_err(|err| BootstrapError::io(&temp_path, err))?;
    }
    file.persist(path)
        .map_err(|err| BootstrapError::io(path, err.error))?;
    Ok(())
}
