//! Validated, indexed view of a plugin catalog.
//!
//! Validation is strict: an empty catalog or an entry with a blank library,
//! plugin id, or hook key is rejected outright. A corrupt catalog would
//! otherwise disable instrumentation without any visible failure.

use crate::catalog::{ActivationHook, PluginCatalog, PluginId};
use crate::error::{BootstrapError, Result};
use crate::libraries::normalize_name;
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_SCHEMA_VERSION: &str = "plugin_catalog_v1";
const ENV_ALLOWED_SCHEMA_VERSIONS: &str = "INSTRUMENT_ALLOWED_CATALOG_SCHEMAS";

#[derive(Debug)]
/// Plugin catalog plus activation hooks grouped by plugin id.
pub struct PluginIndex {
    catalog: PluginCatalog,
    hooks: BTreeMap<PluginId, Vec<ActivationHook>>,
}

impl PluginIndex {
    pub fn new(catalog: PluginCatalog) -> Result<Self> {
        validate_catalog(&catalog)?;
        let mut hooks: BTreeMap<PluginId, Vec<ActivationHook>> = BTreeMap::new();
        for entry in &catalog.entries {
            let slot = hooks.entry(entry.plugin_id.clone()).or_default();
            // A plugin targeting several libraries repeats its hook per library.
            if !slot.contains(&entry.activation_hook) {
                slot.push(entry.activation_hook.clone());
            }
        }
        Ok(Self { catalog, hooks })
    }

    /// Hooks for `plugin` in catalog order, or `None` when the plugin is unknown.
    pub fn hooks(&self, plugin: &PluginId) -> Option<&[ActivationHook]> {
        self.hooks.get(plugin).map(Vec::as_slice)
    }

    /// Known plugin ids in stable order.
    pub fn plugin_ids(&self) -> impl Iterator<Item = &PluginId> {
        self.hooks.keys()
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.catalog.defaults
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }
}

/// Reject catalogs that cannot be trusted to drive resolution.
pub fn validate_catalog(catalog: &PluginCatalog) -> Result<()> {
    validate_schema_version(&catalog.schema_version)?;

    if catalog.entries.is_empty() {
        return Err(BootstrapError::Catalog(
            "catalog contains no entries".to_string(),
        ));
    }

    for (idx, entry) in catalog.entries.iter().enumerate() {
        let position = idx + 1;
        if normalize_name(&entry.target_library).is_empty() {
            return Err(BootstrapError::Catalog(format!(
                "entry {position} has an empty target_library"
            )));
        }
        if entry.plugin_id.as_str().trim().is_empty() {
            return Err(BootstrapError::Catalog(format!(
                "entry {position} ({}) has an empty plugin_id",
                entry.target_library
            )));
        }
        validate_variable(&entry.activation_hook.key, &entry.activation_hook.value).map_err(
            |reason| {
                BootstrapError::Catalog(format!(
                    "entry {position} ({}): {reason}",
                    entry.plugin_id
                ))
            },
        )?;
    }

    for (key, value) in &catalog.defaults {
        validate_variable(key, value)
            .map_err(|reason| BootstrapError::Catalog(format!("defaults: {reason}")))?;
    }

    Ok(())
}

fn validate_variable(key: &str, value: &str) -> std::result::Result<(), String> {
    if key.trim().is_empty() {
        return Err("hook_key must not be empty".to_string());
    }
    if key.contains('=') || key.contains('\0') {
        return Err(format!("hook_key '{key}' is not a valid environment name"));
    }
    if value.contains('\0') {
        return Err(format!("value for '{key}' contains a NUL byte"));
    }
    Ok(())
}

fn validate_schema_version(schema_version: &str) -> Result<()> {
    if schema_version.is_empty() {
        return Err(BootstrapError::Catalog(
            "schema_version must not be empty".to_string(),
        ));
    }

    let allowed = allowed_schema_versions();
    if !allowed.contains(schema_version) {
        return Err(BootstrapError::Catalog(format!(
            "schema_version '{schema_version}' not in allowed set {allowed:?}"
        )));
    }
    Ok(())
}

pub fn allowed_schema_versions() -> BTreeSet<String> {
    let mut versions: BTreeSet<String> = BTreeSet::new();
    versions.insert(DEFAULT_SCHEMA_VERSION.to_string());
    if let Ok(raw) = std::env::var(ENV_ALLOWED_SCHEMA_VERSIONS) {
        for v in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            versions.insert(v.to_string());
        }
    }
    versions
}
