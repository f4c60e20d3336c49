//! Built-in and External Template Sources
//!
//! The default registry is compiled into the binary from
//! `templates/registry.json`. A replacement registry can be loaded from a
//! JSON file of the same shape.

use crate::core::CanecoError;
use crate::templates::schema::RegistrySource;
use std::path::Path;

const EMBEDDED_REGISTRY: &str = include_str!("../../templates/registry.json");

/// Raw JSON of the embedded registry.
pub fn embedded_registry_json() -> &'static str {
    EMBEDDED_REGISTRY
}

/// Parse a registry source from JSON text.
pub fn parse_registry_source(json: &str) -> Result<RegistrySource, CanecoError> {
    serde_json::from_str(json).map_err(|e| CanecoError::Registry(format!("invalid registry JSON: {}", e)))
}

/// Load a registry source from a JSON file.
pub fn load_registry_source(path: &Path) -> Result<RegistrySource, CanecoError> {
    let content = std::fs::read_to_string(path)?;
    let source = parse_registry_source(&content)?;
    tracing::info!(
        "Loaded {} templates from {:?}",
        source.templates.len(),
        path.file_name()
    );
    Ok(source)
}
