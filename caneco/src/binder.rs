//! Record Binder
//!
//! Merges one record's extracted values into a fresh copy of its template
//! and assigns the per-run identifiers that link the document sections.

use serde::Serialize;
use std::fmt;

use crate::core::CanecoError;
use crate::extractor::Extraction;
use crate::input::InputRecord;
use crate::templates::{Characteristic, ComponentKind, Seed, Template};

/// Highest number a five-digit identifier can carry.
const MAX_SEQUENCE: u32 = 99_999;

/// Document sections that number their entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Product,
    Pack,
    Instance,
    Equipment,
    Device,
    Function,
}

impl Section {
    pub fn prefix(&self) -> &'static str {
        match self {
            Section::Product => "PG",
            Section::Pack => "PK",
            Section::Instance => "PI",
            Section::Equipment => "EQ",
            Section::Device => "ED",
            Section::Function => "EF",
        }
    }

    fn slot(&self) -> usize {
        match self {
            Section::Product => 0,
            Section::Pack => 1,
            Section::Instance => 2,
            Section::Equipment => 3,
            Section::Device => 4,
            Section::Function => 5,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Product => "Product",
            Section::Pack => "Pack",
            Section::Instance => "Instance",
            Section::Equipment => "Equipment",
            Section::Device => "Device",
            Section::Function => "Function",
        };
        f.write_str(name)
    }
}

/// Per-run identifier generator. One independent counter per section,
/// each starting at 1. Never shared between runs.
#[derive(Debug, Default)]
pub struct IdSequence {
    issued: [u32; 6],
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next identifier of `section`, e.g. `PG00001`.
    pub fn next(&mut self, section: Section) -> Result<String, CanecoError> {
        let counter = &mut self.issued[section.slot()];
        if *counter >= MAX_SEQUENCE {
            return Err(CanecoError::IdSpaceExhausted {
                section: section.to_string(),
            });
        }
        *counter += 1;
        Ok(format!("{}{:05}", section.prefix(), *counter))
    }

    /// How many identifiers of `section` were handed out.
    pub fn issued(&self, section: Section) -> u32 {
        self.issued[section.slot()]
    }
}

/// A record bound to its template, with identifiers assigned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundComponent {
    pub source_record_id: String,
    pub name: String,
    pub manufacturer: String,
    pub template_name: String,
    pub kind: ComponentKind,
    pub seed: Seed,
    /// Template order, values overridden from the extraction.
    pub characteristics: Vec<Characteristic>,
    pub product_id: String,
    pub pack_id: String,
    pub instance_id: String,
    pub equipment_id: String,
    pub device_id: String,
    pub function_id: String,
}

impl BoundComponent {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.characteristics
            .iter()
            .find(|c| c.id == key)
            .map(|c| c.value.as_str())
    }

    pub fn keys(&self) -> Vec<&str> {
        self.characteristics.iter().map(|c| c.id.as_str()).collect()
    }

    /// Name written into the document; falls back to the record id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.source_record_id
        } else {
            &self.name
        }
    }
}

/// Bind `record` to a copy of `template`.
///
/// Only keys the template already declares are overridden, in place; keys
/// the extraction did not fill keep the template default verbatim.
pub fn bind(
    record: &InputRecord,
    template: &Template,
    extraction: &Extraction,
    ids: &mut IdSequence,
) -> Result<BoundComponent, CanecoError> {
    let mut characteristics = template.characteristics.clone();
    for (key, value) in extraction.overrides() {
        if let Some(slot) = characteristics.iter_mut().find(|c| c.id == key) {
            slot.value = value;
        }
    }

    Ok(BoundComponent {
        source_record_id: record.id.clone(),
        name: record.name.clone(),
        manufacturer: record.manufacturer.clone(),
        template_name: template.name.clone(),
        kind: template.kind,
        seed: template.seed.clone(),
        characteristics,
        product_id: ids.next(Section::Product)?,
        pack_id: ids.next(Section::Pack)?,
        instance_id: ids.next(Section::Instance)?,
        equipment_id: ids.next(Section::Equipment)?,
        device_id: ids.next(Section::Device)?,
        function_id: ids.next(Section::Function)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract;
    use crate::templates::TemplateRegistry;

    #[test]
    fn test_id_format_and_sequence() {
        let mut ids = IdSequence::new();
        assert_eq!(ids.next(Section::Product).unwrap(), "PG00001");
        assert_eq!(ids.next(Section::Product).unwrap(), "PG00002");
        assert_eq!(ids.next(Section::Pack).unwrap(), "PK00001");
        assert_eq!(ids.next(Section::Function).unwrap(), "EF00001");
        assert_eq!(ids.issued(Section::Product), 2);
        assert_eq!(ids.issued(Section::Device), 0);
    }

    #[test]
    fn test_id_space_exhausted() {
        let mut ids = IdSequence::new();
        ids.issued[Section::Device.slot()] = MAX_SEQUENCE - 1;
        assert_eq!(ids.next(Section::Device).unwrap(), "ED99999");
        assert!(matches!(
            ids.next(Section::Device),
            Err(CanecoError::IdSpaceExhausted { .. })
        ));
    }

    #[test]
    fn test_bind_main_breaker() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("TR01").unwrap();
        let record = InputRecord::new(
            "TR01",
            "TR01",
            "Schneider Electric",
            "NSX630F Micrologic 2.3 4P3D 36kA",
        );
        let mut ids = IdSequence::new();
        let bound = bind(&record, template, &extract(&record.raw_specification), &mut ids).unwrap();

        assert_eq!(bound.value("PRT_CAL"), Some("630.00"));
        assert_eq!(bound.value("PRT_REF"), Some("NSX630F"));
        assert_eq!(bound.value("PRT_NBPPP"), Some("4P3D"));
        assert_eq!(bound.value("PRT_ICC"), Some("36"));
        assert_eq!(bound.value("PRT_BDCLS"), Some(""));
        assert_eq!(bound.keys(), template.keys());
        assert_eq!(bound.product_id, "PG00001");
        assert_eq!(bound.function_id, "EF00001");
    }

    #[test]
    fn test_bind_never_adds_keys() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("CABLE").unwrap();
        let record = InputRecord::new("C1", "CBL1", "", "NSX100F 4P 100A 16mm2");
        let mut ids = IdSequence::new();
        let bound = bind(&record, template, &extract(&record.raw_specification), &mut ids).unwrap();
        assert_eq!(bound.keys(), template.keys());
        assert_eq!(bound.value("PRT_CAL"), None);
        assert_eq!(bound.value("PRT_REF"), Some("NSX100F"));
        assert_eq!(bound.value("PRT_SECTION"), Some("16.00"));
    }

    #[test]
    fn test_bind_leaves_template_untouched() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("TR01").unwrap();
        let before = template.clone();
        let record = InputRecord::new("Q", "Q", "", "NSX250F 3P 250A");
        let mut ids = IdSequence::new();
        bind(&record, template, &extract(&record.raw_specification), &mut ids).unwrap();
        assert_eq!(registry.get("TR01").unwrap(), &before);
    }

    #[test]
    fn test_same_template_gets_distinct_ids() {
        let registry = TemplateRegistry::builtin().unwrap();
        let template = registry.get("TR01").unwrap();
        let mut ids = IdSequence::new();
        let a = InputRecord::new("A", "A", "", "NSX630F");
        let b = InputRecord::new("B", "B", "", "NSX400F");
        let first = bind(&a, template, &extract(&a.raw_specification), &mut ids).unwrap();
        let second = bind(&b, template, &extract(&b.raw_specification), &mut ids).unwrap();
        assert_eq!(first.product_id, "PG00001");
        assert_eq!(second.product_id, "PG00002");
        assert_ne!(first.pack_id, second.pack_id);
        assert_ne!(first.instance_id, second.instance_id);
        assert_ne!(first.equipment_id, second.equipment_id);
        assert_ne!(first.function_id, second.function_id);
    }
}
