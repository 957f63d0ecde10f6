//! Plugin catalog wiring.
//!
//! The catalog is static reference data mapping installed libraries to the
//! instrumentation plugins that trace them. A default catalog is compiled into
//! the binaries; `--catalog PATH` (or `INSTRUMENT_CATALOG_PATH`) replaces it.

pub mod index;
pub mod model;

pub use index::{PluginIndex, validate_catalog};
pub use model::{
    ActivationHook, PluginCatalog, PluginCatalogEntry, PluginId, catalog_to_string,
    load_catalog_from_path, parse_catalog,
};

use crate::error::Result;
use std::path::Path;

/// Name of the bundled catalog, used in error messages.
pub const BUNDLED_CATALOG_NAME: &str = "catalogs/python_otel_v1.json";

const BUNDLED_CATALOG: &str = include_str!("../../catalogs/python_otel_v1.json");

pub fn bundled_catalog() -> Result<PluginCatalog> {
    parse_catalog(BUNDLED_CATALOG, Path::new(BUNDLED_CATALOG_NAME))
}

/// Load the override catalog when given, otherwise the bundled one.
pub fn load_catalog(path: Option<&Path>) -> Result<PluginCatalog> {
    match path {
        Some(path) => load_catalog_from_path(path),
        None => bundled_catalog(),
    }
}
