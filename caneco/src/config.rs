//! Converter configuration
//!
//! Everything that ends up in a document but does not come from the input
//! rows: root header values, namespace declarations, the project
//! description, contact details and name-based template hints. Every field
//! has a default, so an empty JSON object is a valid configuration.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::CanecoError;

/// Default (exchange-format) namespace of a Caneco BT document.
pub const EXCHANGE_NAMESPACE: &str =
    "http://www.schneider-electric.com/electrical-distribution/exchange-format";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Namespace URIs declared by, or used inside, a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceSet {
    pub default: String,
    pub xsi: String,
    pub xsd: String,
    pub commercial_taxonomy: String,
    pub electrical_taxonomy: String,
}

impl Default for NamespaceSet {
    fn default() -> Self {
        Self {
            default: EXCHANGE_NAMESPACE.to_string(),
            xsi: XSI_NAMESPACE.to_string(),
            xsd: XSD_NAMESPACE.to_string(),
            commercial_taxonomy: format!("{}/commercial-taxonomy", EXCHANGE_NAMESPACE),
            electrical_taxonomy: format!("{}/electrical-taxonomy", EXCHANGE_NAMESPACE),
        }
    }
}

impl NamespaceSet {
    /// All URIs as a sorted list, for set comparison.
    pub fn uris(&self) -> Vec<String> {
        let mut uris = vec![
            self.default.clone(),
            self.xsi.clone(),
            self.xsd.clone(),
            self.commercial_taxonomy.clone(),
            self.electrical_taxonomy.clone(),
        ];
        uris.sort();
        uris.dedup();
        uris
    }
}

/// Root element attributes. The consuming tool compares these as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatHeader {
    pub format_version: String,
    pub product_range_values_version: String,
    pub commercial_taxonomy_version: String,
    pub electrical_taxonomy_version: String,
    pub mechanical_taxonomy_version: String,
    pub namespaces: NamespaceSet,
}

impl Default for FormatHeader {
    fn default() -> Self {
        Self {
            format_version: "0.29".to_string(),
            product_range_values_version: "0.17".to_string(),
            commercial_taxonomy_version: "0.26".to_string(),
            electrical_taxonomy_version: "0.19".to_string(),
            mechanical_taxonomy_version: "0.1".to_string(),
            namespaces: NamespaceSet::default(),
        }
    }
}

/// Contents of the `Description` and `Contacts` sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDescription {
    pub name: String,
    pub number: String,
    pub order_number: String,
    pub start_date: NaiveDate,
    pub company_name: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone: String,
    pub contact_last_name: String,
    pub contact_phone: String,
    pub contact_email: String,
}

impl Default for ProjectDescription {
    fn default() -> Self {
        Self {
            name: "Caneco BT - Conversion AutoCAD vers Caneco".to_string(),
            number: String::new(),
            order_number: String::new(),
            // Fixed date keeps repeated runs byte-identical.
            start_date: NaiveDate::from_ymd_opt(2025, 8, 11).unwrap_or_default(),
            company_name: "Authorized user".to_string(),
            street: String::new(),
            postal_code: String::new(),
            city: String::new(),
            state: String::new(),
            country: "France".to_string(),
            phone: String::new(),
            contact_last_name: String::new(),
            contact_phone: String::new(),
            contact_email: String::new(),
        }
    }
}

impl ProjectDescription {
    /// `StartDate` text as the reference file writes it.
    pub fn start_date_text(&self) -> String {
        format!("{}T00:00:00.0Z", self.start_date.format("%Y-%m-%d"))
    }
}

/// Picks `template` for a record whose name contains `keyword`, when the
/// template is of the kind the record was already classified as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateHint {
    pub keyword: String,
    pub template: String,
}

impl TemplateHint {
    pub fn new(keyword: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            template: template.into(),
        }
    }
}

fn default_hints() -> Vec<TemplateHint> {
    vec![
        TemplateHint::new("IRVE", "ALIM TD IRVE"),
        TemplateHint::new("ECL", "TD1-ECL 1"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub header: FormatHeader,
    pub project: ProjectDescription,
    pub template_hints: Vec<TemplateHint>,
    /// External registry replacing the embedded one.
    pub registry: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            header: FormatHeader::default(),
            project: ProjectDescription::default(),
            template_hints: default_hints(),
            registry: None,
        }
    }
}

impl ConverterConfig {
    pub fn from_json(json: &str) -> Result<Self, CanecoError> {
        serde_json::from_str(json).map_err(|e| CanecoError::Config(e.to_string()))
    }

    /// Load a configuration file. A relative `registry` path is resolved
    /// against the directory holding the configuration file.
    pub fn load(path: &Path) -> Result<Self, CanecoError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&content)?;
        if let (Some(registry), Some(dir)) = (config.registry.as_ref(), path.parent()) {
            if registry.is_relative() {
                config.registry = Some(dir.join(registry));
            }
        }
        tracing::debug!("Loaded converter config from {:?}", path);
        Ok(config)
    }
}
