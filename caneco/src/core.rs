//! Conversion pipeline shared by the CLI and any embedding service.
//! Single-threaded, no state survives a run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::assembler::assemble;
use crate::binder::{bind, BoundComponent, IdSequence};
use crate::classifier::ComponentClassifier;
use crate::config::ConverterConfig;
use crate::input::{load_records, InputRecord};
use crate::templates::{ComponentKind, TemplateRegistry};
use crate::validator::{validate, ReferenceFingerprint, ValidationReport};

#[derive(Debug, thiserror::Error)]
pub enum CanecoError {
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },
    #[error("No template registered for component kind '{kind}'")]
    NoTemplatesForKind { kind: ComponentKind },
    #[error("Registry error: {0}")]
    Registry(String),
    #[error("Identifier space exhausted for section {section}")]
    IdSpaceExhausted { section: String },
    #[error("Input error: {0}")]
    Input(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for CanecoError {
    fn from(e: quick_xml::Error) -> Self {
        CanecoError::Xml(e.to_string())
    }
}

/// Per-run counts and the records left out of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub converted: usize,
    /// Ids of records that matched no component kind, in input order.
    pub unclassified: Vec<String>,
    pub per_kind: BTreeMap<String, usize>,
    pub per_template: BTreeMap<String, usize>,
}

impl RunSummary {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn count(&mut self, component: &BoundComponent) {
        self.converted += 1;
        *self.per_kind.entry(component.kind.to_string()).or_insert(0) += 1;
        *self
            .per_template
            .entry(component.template_name.clone())
            .or_insert(0) += 1;
    }

    pub fn has_unclassified(&self) -> bool {
        !self.unclassified.is_empty()
    }
}

/// A finished run: the complete document and what went into it.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub document: String,
    pub components: Vec<BoundComponent>,
    pub summary: RunSummary,
}

/// Core conversion API used by the CLI.
pub struct CanecoCore;

impl CanecoCore {
    /// Registry named by the configuration, or the embedded one.
    pub fn load_registry(config: &ConverterConfig) -> Result<TemplateRegistry, CanecoError> {
        match &config.registry {
            Some(path) => TemplateRegistry::load(path),
            None => TemplateRegistry::builtin(),
        }
    }

    /// Convert one batch of records.
    ///
    /// Unclassifiable records are listed in the summary and skipped. Any
    /// error aborts the run and no document text is returned.
    pub fn convert(
        records: &[InputRecord],
        registry: &TemplateRegistry,
        config: &ConverterConfig,
    ) -> Result<ConversionOutput, CanecoError> {
        let classifier = ComponentClassifier::with_hints(config.template_hints.clone());
        let mut ids = IdSequence::new();
        let mut summary = RunSummary::new(records.len());
        let mut components = Vec::with_capacity(records.len());

        for record in records {
            match classifier.classify(record, registry)? {
                Some(classification) => {
                    let template = registry.get(&classification.template_name)?;
                    let component = bind(record, template, &classification.extraction, &mut ids)?;
                    summary.count(&component);
                    components.push(component);
                }
                None => {
                    tracing::warn!("Unclassified record {} ({})", record.id, record.name);
                    summary.unclassified.push(record.id.clone());
                }
            }
        }

        let document = assemble(&components, &config.header, &config.project)?;

        tracing::info!(
            "Converted {}/{} records ({} unclassified)",
            summary.converted,
            summary.total,
            summary.unclassified.len()
        );

        Ok(ConversionOutput {
            document,
            components,
            summary,
        })
    }

    /// Read an input file and convert it.
    pub fn convert_file(
        path: &Path,
        config: &ConverterConfig,
    ) -> Result<ConversionOutput, CanecoError> {
        let registry = Self::load_registry(config)?;
        let records = load_records(path)?;
        Self::convert(&records, &registry, config)
    }

    /// Check a document against a reference export, or against what this
    /// converter emits when no reference is given.
    pub fn validate_document(
        document: &str,
        reference: Option<&str>,
        config: &ConverterConfig,
    ) -> Result<ValidationReport, CanecoError> {
        let fingerprint = match reference {
            Some(xml) => ReferenceFingerprint::from_document(xml)?,
            None => ReferenceFingerprint::from_registry(&Self::load_registry(config)?, &config.header),
        };
        validate(document, &fingerprint)
    }
}
