use crate::error::{BootstrapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Package identifier of an instrumentation plugin.
pub struct PluginId(pub String);

impl PluginId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(value: &str) -> Self {
        PluginId(value.to_string())
    }
}

impl From<String> for PluginId {
    fn from(value: String) -> Self {
        PluginId(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// One environment assignment that switches a plugin on in the launched process.
pub struct ActivationHook {
    #[serde(rename = "hook_key")]
    pub key: String,
    #[serde(rename = "hook_value")]
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// A catalog record: which plugin instruments which library, and how it hooks in.
pub struct PluginCatalogEntry {
    pub target_library: String,
    pub plugin_id: PluginId,
    #[serde(flatten)]
    pub activation_hook: ActivationHook,
}

impl PluginCatalogEntry {
    pub fn new(target_library: &str, plugin_id: &str, key: &str, value: &str) -> Self {
        Self {
            target_library: target_library.to_string(),
            plugin_id: PluginId::from(plugin_id),
            activation_hook: ActivationHook {
                key: key.to_string(),
                value: value.to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// On-disk plugin catalog.
///
/// `entries` keeps file order; resolution order is derived from it.
/// `defaults` are agent-level variables applied only when the launching
/// environment leaves them unset.
pub struct PluginCatalog {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, String>,
    pub entries: Vec<PluginCatalogEntry>,
}

/// Parse a catalog document. `origin` only labels errors.
pub fn parse_catalog(contents: &str, origin: &Path) -> Result<PluginCatalog> {
    serde_json::from_str(contents).map_err(|err| {
        BootstrapError::Catalog(format!("parsing {}: {err}", origin.display()))
    })
}

pub fn load_catalog_from_path(path: &Path) -> Result<PluginCatalog> {
    let contents = fs::read_to_string(path)
        .map_err(|err| BootstrapError::Catalog(format!("reading {}: {err}", path.display())))?;
    parse_catalog(&contents, path)
}

/// Serialize a catalog in the same layout it is read from.
pub fn catalog_to_string(catalog: &PluginCatalog) -> Result<String> {
    serde_json::to_string_pretty(catalog)
        .map_err(|err| BootstrapError::Catalog(format!("serializing catalog: {err}")))
}
