//! Plugin resolution: installed libraries × catalog − exclusions.
//!
//! [`resolve`] is pure. It does not look at the host, install anything, or
//! depend on the order in which libraries were discovered.

use crate::catalog::{PluginCatalog, PluginId, validate_catalog};
use crate::error::Result;
use crate::libraries::{LibraryRecord, normalize_name};
use crate::manifest::ResolvedManifest;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Plugins the operator never wants activated, whatever is installed.
pub type ExclusionSet = BTreeSet<PluginId>;

/// True when `plugin` is named by `exclusions`, compared as package names
/// (`aws_lambda` and `AWS-Lambda` exclude `aws-lambda`).
pub fn is_excluded(plugin: &PluginId, exclusions: &ExclusionSet) -> bool {
    let wanted = normalize_name(plugin.as_str());
    exclusions
        .iter()
        .any(|excluded| normalize_name(excluded.as_str()) == wanted)
}

/// Resolve the plugins that apply to `installed`.
///
/// A plugin applies when any of its entries targets an installed library
/// (name match; versions are ignored). Output follows the catalog position
/// of each plugin's first applicable entry, ties broken by plugin id.
/// Fails only on an invalid catalog; no match is an empty manifest.
pub fn resolve(
    installed: &[LibraryRecord],
    catalog: &PluginCatalog,
    exclusions: &ExclusionSet,
) -> Result<ResolvedManifest> {
    validate_catalog(catalog)?;

    let present: BTreeSet<String> = installed
        .iter()
        .map(LibraryRecord::normalized_name)
        .filter(|name| !name.is_empty())
        .collect();

    let mut first_position: BTreeMap<&PluginId, usize> = BTreeMap::new();
    let mut excluded_hits: BTreeSet<&PluginId> = BTreeSet::new();
    for (position, entry) in catalog.entries.iter().enumerate() {
        if !present.contains(&normalize_name(&entry.target_library)) {
            continue;
        }
        if is_excluded(&entry.plugin_id, exclusions) {
            excluded_hits.insert(&entry.plugin_id);
            continue;
        }
        first_position.entry(&entry.plugin_id).or_insert(position);
    }

    for plugin in &excluded_hits {
        info!(plugin = %plugin, "plugin applies but is excluded");
    }

    let mut ordered: Vec<(usize, &PluginId)> = first_position
        .into_iter()
        .map(|(plugin, position)| (position, plugin))
        .collect();
    ordered.sort();

    let manifest = ResolvedManifest::from_plugins(ordered.into_iter().map(|(_, p)| p.clone()));
    debug!(
        libraries = present.len(),
        plugins = manifest.len(),
        excluded = excluded_hits.len(),
        "resolved plugin manifest"
    );
    Ok(manifest)
}
