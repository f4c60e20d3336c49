//! Caneco - AutoCAD component lists to Caneco BT exchange documents
//!
//! This library turns the component rows exported from an AutoCAD drawing
//! into the XML exchange format read by Caneco BT: each row is classified
//! into a component template, its specification text is mined for ratings,
//! poles and references, and the bound components are written with linked,
//! per-run sequential identifiers.
//!
//! # Quick Start
//!
//! ```no_run
//! use caneco::{CanecoCore, ConverterConfig, InputRecord, TemplateRegistry};
//!
//! let registry = TemplateRegistry::builtin().unwrap();
//! let records = vec![InputRecord::new(
//!     "TR01",
//!     "TR01",
//!     "Schneider Electric",
//!     "NSX630F Micrologic 2.3 4P3D 36kA",
//! )];
//!
//! let output = CanecoCore::convert(&records, &registry, &ConverterConfig::default()).unwrap();
//! std::fs::write("project.xml", &output.document).unwrap();
//!
//! for id in &output.summary.unclassified {
//!     eprintln!("unclassified: {}", id);
//! }
//! ```
//!
//! # Features
//!
//! - **Pattern extraction**: ratings, pole layouts, product references
//! - **Classification**: keyword table, name hints and closest-rating templates
//! - **Exact serialization**: root header and namespaces as Caneco BT writes them
//! - **Compatibility checks**: compare output against a reference export

pub mod assembler;
pub mod binder;
pub mod classifier;
pub mod config;
pub mod core;
pub mod extractor;
pub mod input;
pub mod templates;
pub mod validator;

// Re-export main types
pub use assembler::{assemble, DocumentAssembler};
pub use binder::{bind, BoundComponent, IdSequence, Section};
pub use classifier::{Classification, ComponentClassifier, MatchReason};
pub use config::{ConverterConfig, FormatHeader, NamespaceSet, ProjectDescription, TemplateHint};
pub use crate::core::{CanecoCore, CanecoError, ConversionOutput, RunSummary};
pub use extractor::{extract, Extraction};
pub use input::{load_records, parse_records, InputFormat, InputRecord};
pub use templates::{Characteristic, ComponentKind, Seed, Template, TemplateRegistry};
pub use validator::{validate, Mismatch, ReferenceFingerprint, ValidationReport};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CanecoCore, CanecoError, ComponentKind, ConversionOutput, ConverterConfig, InputRecord,
        RunSummary, TemplateRegistry, ValidationReport,
    };
}
