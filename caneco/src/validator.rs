//! Compatibility Validator
//!
//! Compares a candidate document against the structural fingerprint of a
//! reference export. Pure diagnostics: nothing here runs while a document
//! is being generated, and a mismatch is a report entry, not an error.
//!
//! Checks run in this order:
//! 1. namespace declarations and root header attributes
//! 2. characteristic key order per product seed
//! 3. identifier format and uniqueness per section
//! 4. cross-reference resolution

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;

use crate::assembler::{root_attributes, ROOT_ELEMENT};
use crate::config::FormatHeader;
use crate::core::CanecoError;
use crate::templates::TemplateRegistry;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{2})(\d{5})$").expect("id pattern"));

/// Identified element kinds and their identifier prefix.
const ID_PREFIXES: &[(&str, &str)] = &[
    ("Product", "PG"),
    ("Pack", "PK"),
    ("Instance", "PI"),
    ("Equipment", "EQ"),
    ("Device", "ED"),
    ("Function", "EF"),
    ("Company", "CC"),
    ("Person", "CP"),
];

/// Structural fingerprint a candidate must agree with.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFingerprint {
    /// Root attributes, namespace declarations included, in order.
    pub root_attributes: Vec<(String, String)>,
    /// Every namespace URI the format may declare.
    pub namespaces: BTreeSet<String>,
    /// Characteristic key order keyed by (GroupId, ItemId).
    pub characteristic_orders: BTreeMap<(String, String), Vec<String>>,
}

impl ReferenceFingerprint {
    /// Fingerprint of what this converter emits for `registry`.
    pub fn from_registry(registry: &TemplateRegistry, header: &FormatHeader) -> Self {
        let characteristic_orders = registry
            .templates()
            .iter()
            .map(|t| {
                (
                    (t.seed.group_id.clone(), t.seed.item_id.clone()),
                    t.keys().into_iter().map(String::from).collect(),
                )
            })
            .collect();

        Self {
            root_attributes: root_attributes(header)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            namespaces: header.namespaces.uris().into_iter().collect(),
            characteristic_orders,
        }
    }

    /// Fingerprint of an existing export, e.g. a file saved by Caneco BT.
    pub fn from_document(xml: &str) -> Result<Self, CanecoError> {
        let scan = DocumentScan::read(xml)?;

        let mut namespaces: BTreeSet<String> = scan
            .root_attributes
            .iter()
            .filter(|(k, _)| is_namespace_declaration(k))
            .map(|(_, v)| v.clone())
            .collect();
        namespaces.extend(scan.nested_namespaces.iter().map(|(_, uri)| uri.clone()));

        let mut characteristic_orders = BTreeMap::new();
        for product in &scan.products {
            if let Some(seed) = &product.seed {
                characteristic_orders
                    .entry(seed.clone())
                    .or_insert_with(|| product.keys.clone());
            }
        }

        Ok(Self {
            root_attributes: scan.root_attributes,
            namespaces,
            characteristic_orders,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub location: String,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    fn new(location: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub mismatches: Vec<Mismatch>,
}

impl ValidationReport {
    fn from_mismatches(mismatches: Vec<Mismatch>) -> Self {
        Self {
            ok: mismatches.is_empty(),
            mismatches,
        }
    }
}

/// Compare `candidate` with `reference`.
///
/// Fails only when the candidate is not readable XML.
pub fn validate(
    candidate: &str,
    reference: &ReferenceFingerprint,
) -> Result<ValidationReport, CanecoError> {
    let scan = DocumentScan::read(candidate)?;
    let mut mismatches = Vec::new();

    check_namespaces(&scan, reference, &mut mismatches);
    check_characteristic_order(&scan, reference, &mut mismatches);
    check_identifiers(&scan, &mut mismatches);
    check_references(&scan, &mut mismatches);

    tracing::debug!("Validation finished: {} mismatches", mismatches.len());
    Ok(ValidationReport::from_mismatches(mismatches))
}

fn is_namespace_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

fn check_namespaces(scan: &DocumentScan, reference: &ReferenceFingerprint, out: &mut Vec<Mismatch>) {
    let declared = |attrs: &[(String, String)]| -> BTreeMap<String, String> {
        attrs
            .iter()
            .filter(|(k, _)| is_namespace_declaration(k))
            .cloned()
            .collect()
    };
    let expected = declared(&reference.root_attributes);
    let actual = declared(&scan.root_attributes);

    for (key, uri) in &expected {
        match actual.get(key) {
            Some(found) if found == uri => {}
            Some(found) => out.push(Mismatch::new(format!("{}/@{}", ROOT_ELEMENT, key), uri, found)),
            None => out.push(Mismatch::new(format!("{}/@{}", ROOT_ELEMENT, key), uri, "<missing>")),
        }
    }
    for (key, uri) in &actual {
        if !expected.contains_key(key) {
            out.push(Mismatch::new(format!("{}/@{}", ROOT_ELEMENT, key), "<absent>", uri));
        }
    }

    for (location, uri) in &scan.nested_namespaces {
        if !reference.namespaces.contains(uri) {
            out.push(Mismatch::new(location.clone(), "declared format namespace", uri.clone()));
        }
    }

    // Header values are compared as text, attribute by attribute.
    let actual_attrs: HashMap<&str, &str> = scan
        .root_attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for (key, value) in &reference.root_attributes {
        if is_namespace_declaration(key) {
            continue;
        }
        match actual_attrs.get(key.as_str()) {
            Some(found) if found == value => {}
            Some(found) => out.push(Mismatch::new(format!("{}/@{}", ROOT_ELEMENT, key), value.clone(), *found)),
            None => out.push(Mismatch::new(format!("{}/@{}", ROOT_ELEMENT, key), value.clone(), "<missing>")),
        }
    }

    let expected_order: Vec<&str> = reference.root_attributes.iter().map(|(k, _)| k.as_str()).collect();
    let actual_order: Vec<&str> = scan.root_attributes.iter().map(|(k, _)| k.as_str()).collect();
    let same_set = {
        let a: BTreeSet<_> = expected_order.iter().collect();
        let b: BTreeSet<_> = actual_order.iter().collect();
        a == b
    };
    if same_set && expected_order != actual_order {
        out.push(Mismatch::new(
            ROOT_ELEMENT,
            expected_order.join(" "),
            actual_order.join(" "),
        ));
    }
}

fn check_characteristic_order(
    scan: &DocumentScan,
    reference: &ReferenceFingerprint,
    out: &mut Vec<Mismatch>,
) {
    for product in &scan.products {
        let location = format!("Products/ProductSet/Product[{}]", product.id);
        let Some(seed) = &product.seed else {
            out.push(Mismatch::new(location, "Seed element", "<missing>"));
            continue;
        };
        match reference.characteristic_orders.get(seed) {
            Some(expected) if *expected == product.keys => {}
            Some(expected) => out.push(Mismatch::new(
                format!("{}/Content/Characteristics", location),
                expected.join(","),
                product.keys.join(","),
            )),
            None => out.push(Mismatch::new(
                format!("{}/Seed", location),
                "seed known to the reference",
                format!("{}/{}", seed.0, seed.1),
            )),
        }
    }
}

fn check_identifiers(scan: &DocumentScan, out: &mut Vec<Mismatch>) {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for entry in &scan.identified {
        let prefix = ID_PREFIXES
            .iter()
            .find(|(kind, _)| *kind == entry.kind)
            .map(|(_, p)| *p)
            .unwrap_or("");
        let well_formed = ID_PATTERN
            .captures(&entry.id)
            .map(|caps| &caps[1] == prefix && &caps[2] != "00000")
            .unwrap_or(false);
        if !well_formed {
            out.push(Mismatch::new(
                entry.location.clone(),
                format!("{}#####", prefix),
                entry.id.clone(),
            ));
        }
        if !seen.insert((entry.kind, entry.id.as_str())) {
            out.push(Mismatch::new(
                entry.location.clone(),
                format!("unique {} id", entry.kind),
                format!("duplicate {}", entry.id),
            ));
        }
    }
}

fn check_references(scan: &DocumentScan, out: &mut Vec<Mismatch>) {
    let known: HashSet<(&str, &str)> = scan
        .identified
        .iter()
        .map(|e| (e.kind, e.id.as_str()))
        .collect();
    for reference in &scan.references {
        if !known.contains(&(reference.target, reference.id.as_str())) {
            out.push(Mismatch::new(
                reference.location.clone(),
                format!("existing {}", reference.target),
                reference.id.clone(),
            ));
        }
    }
}

#[derive(Debug, Default)]
struct ScannedProduct {
    id: String,
    seed: Option<(String, String)>,
    keys: Vec<String>,
}

#[derive(Debug)]
struct Identified {
    kind: &'static str,
    id: String,
    location: String,
}

#[derive(Debug)]
struct IdReference {
    target: &'static str,
    id: String,
    location: String,
}

/// Everything the checks need, gathered in one pass over the document.
#[derive(Debug, Default)]
struct DocumentScan {
    root_attributes: Vec<(String, String)>,
    nested_namespaces: Vec<(String, String)>,
    products: Vec<ScannedProduct>,
    identified: Vec<Identified>,
    references: Vec<IdReference>,
    path: Vec<String>,
    capture_key: bool,
}

impl DocumentScan {
    fn read(xml: &str) -> Result<Self, CanecoError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut scan = DocumentScan::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    scan.open(&e, false)?;
                }
                Ok(Event::Empty(e)) => {
                    scan.open(&e, true)?;
                }
                Ok(Event::End(_)) => {
                    scan.path.pop();
                    scan.capture_key = false;
                }
                Ok(Event::Text(t)) => {
                    if scan.capture_key {
                        let text = String::from_utf8_lossy(&t).trim().to_string();
                        if let Some(product) = scan.products.last_mut() {
                            if let Some(key) = product.keys.last_mut() {
                                key.push_str(&text);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(err) => return Err(CanecoError::Xml(err.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if scan.root_attributes.is_empty() && scan.products.is_empty() && scan.identified.is_empty() {
            tracing::warn!("Validated document has no recognizable content");
        }
        Ok(scan)
    }

    fn location(&self, name: &str, id: Option<&str>) -> String {
        let mut parts: Vec<&str> = self.path.iter().skip(1).map(String::as_str).collect();
        parts.push(name);
        let path = parts.join("/");
        match id {
            Some(id) => format!("{}[{}]", path, id),
            None => path,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), CanecoError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let attrs = read_attributes(e)?;
        let attr = |key: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        if self.path.is_empty() {
            if name == ROOT_ELEMENT {
                self.root_attributes = attrs.clone();
            }
        } else {
            for (key, uri) in attrs.iter().filter(|(k, _)| is_namespace_declaration(k)) {
                let location = format!("{}/@{}", self.location(&name, None), key);
                self.nested_namespaces.push((location, uri.clone()));
            }
        }

        let parent = self.path.last().cloned().unwrap_or_default();
        let in_product_set = self.path.iter().any(|p| p == "ProductSet");
        let id = attr("id");
        let location = self.location(&name, id.as_deref());

        match (parent.as_str(), name.as_str()) {
            ("ProductSet", "Product") => {
                let id = id.unwrap_or_default();
                self.identify("Product", &id, &location);
                self.products.push(ScannedProduct {
                    id,
                    ..ScannedProduct::default()
                });
            }
            ("Product", "Seed") if in_product_set => {
                if let Some(product) = self.products.last_mut() {
                    product.seed = Some((
                        attr("GroupId").unwrap_or_default(),
                        attr("ItemId").unwrap_or_default(),
                    ));
                }
            }
            ("Characteristic", "Id") if in_product_set => {
                if let Some(product) = self.products.last_mut() {
                    product.keys.push(String::new());
                }
                self.capture_key = !empty;
            }
            ("ProductList", "Pack") => {
                self.identify("Pack", &id.unwrap_or_default(), &location);
                self.refer("Product", attr("Descriptor"), &location);
            }
            ("Instances", "Instance") => {
                self.identify("Instance", &id.unwrap_or_default(), &location);
            }
            ("Equipments", "Equipment") => {
                self.identify("Equipment", &id.unwrap_or_default(), &location);
            }
            ("Equipment", "Commercial") => {
                self.refer("Pack", attr("ProductPacks"), &location);
            }
            ("Equipment", "Electrical") => {
                self.refer("Device", attr("Devices"), &location);
                self.refer("Function", attr("Functions"), &location);
            }
            ("Equipments", "Device") => {
                self.identify("Device", &id.unwrap_or_default(), &location);
                self.refer("Instance", attr("ProductInstance"), &location);
            }
            ("Network", "Function") => {
                self.identify("Function", &id.unwrap_or_default(), &location);
                self.refer("Equipment", attr("Equipment"), &location);
                self.refer("Device", attr("Devices"), &location);
            }
            ("Contacts", "Company") => {
                self.identify("Company", &id.unwrap_or_default(), &location);
            }
            ("Contacts", "Person") => {
                self.identify("Person", &id.unwrap_or_default(), &location);
            }
            ("Person", "Company") => {
                self.refer("Company", id, &location);
            }
            _ => {}
        }

        if !empty {
            self.path.push(name);
        }
        Ok(())
    }

    fn identify(&mut self, kind: &'static str, id: &str, location: &str) {
        self.identified.push(Identified {
            kind,
            id: id.to_string(),
            location: location.to_string(),
        });
    }

    /// Record every whitespace-separated id of a reference attribute.
    fn refer(&mut self, target: &'static str, ids: Option<String>, location: &str) {
        let Some(ids) = ids else { return };
        for id in ids.split_whitespace() {
            self.references.push(IdReference {
                target,
                id: id.to_string(),
                location: location.to_string(),
            });
        }
    }
}

fn read_attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, CanecoError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| CanecoError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| CanecoError::Xml(err.to_string()))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::binder::{bind, IdSequence};
    use crate::config::ProjectDescription;
    use crate::extractor::extract;
    use crate::input::InputRecord;

    fn generated() -> (String, ReferenceFingerprint) {
        let registry = TemplateRegistry::builtin().unwrap();
        let header = FormatHeader::default();
        let mut ids = IdSequence::new();
        let mut components = Vec::new();
        for (name, template, spec) in [
            ("TR01", "TR01", "NSX630F Micrologic 2.3 4P3D 36kA"),
            ("C1", "CABLE", "U1000 R2V 16mm2"),
            ("T1", "TRANSFO HTA/BT", "630kVA"),
        ] {
            let record = InputRecord::new(name, name, "Schneider Electric", spec);
            let template = registry.get(template).unwrap();
            components.push(bind(&record, template, &extract(spec), &mut ids).unwrap());
        }
        let xml = assemble(&components, &header, &ProjectDescription::default()).unwrap();
        (xml, ReferenceFingerprint::from_registry(&registry, &header))
    }

    #[test]
    fn test_generated_document_passes() {
        let (xml, fingerprint) = generated();
        let report = validate(&xml, &fingerprint).unwrap();
        assert!(report.ok, "{:?}", report.mismatches);
    }

    #[test]
    fn test_fingerprint_from_document_matches_registry() {
        let (xml, fingerprint) = generated();
        let from_doc = ReferenceFingerprint::from_document(&xml).unwrap();
        assert_eq!(from_doc.root_attributes, fingerprint.root_attributes);
        assert_eq!(
            from_doc.characteristic_orders.get(&("ECD_DISJONCTEUR".to_string(), "MG4_13271".to_string())),
            fingerprint.characteristic_orders.get(&("ECD_DISJONCTEUR".to_string(), "MG4_13271".to_string()))
        );
        assert!(validate(&xml, &from_doc).unwrap().ok);
    }

    #[test]
    fn test_changed_format_version_reported() {
        let (xml, fingerprint) = generated();
        let xml = xml.replace("formatVersion=\"0.29\"", "formatVersion=\"0.30\"");
        let report = validate(&xml, &fingerprint).unwrap();
        assert!(!report.ok);
        assert_eq!(report.mismatches[0].location, "ElectricalProject/@formatVersion");
        assert_eq!(report.mismatches[0].expected, "0.29");
        assert_eq!(report.mismatches[0].actual, "0.30");
    }

    #[test]
    fn test_foreign_namespace_reported() {
        let (xml, fingerprint) = generated();
        let xml = xml.replace("/electrical-taxonomy\"", "/electrical-taxonomy-v2\"");
        let report = validate(&xml, &fingerprint).unwrap();
        assert!(report
            .mismatches
            .iter()
            .any(|m| m.actual.ends_with("electrical-taxonomy-v2")));
    }

    #[test]
    fn test_characteristic_order_mismatch() {
        let (xml, fingerprint) = generated();
        let xml = xml.replacen("<Id>PRT_PERFO</Id>", "<Id>PRT_SWAP</Id>", 1);
        let report = validate(&xml, &fingerprint).unwrap();
        let m = report
            .mismatches
            .iter()
            .find(|m| m.location.ends_with("Content/Characteristics"))
            .unwrap();
        assert_eq!(m.location, "Products/ProductSet/Product[PG00001]/Content/Characteristics");
        assert!(m.actual.contains("PRT_SWAP"));
    }

    #[test]
    fn test_bad_id_and_dangling_reference() {
        let (xml, fingerprint) = generated();
        let xml = xml.replace("<Product id=\"PG00002\">", "<Product id=\"PG2\">");
        let report = validate(&xml, &fingerprint).unwrap();
        assert!(report
            .mismatches
            .iter()
            .any(|m| m.expected == "PG#####" && m.actual == "PG2"));
        assert!(report
            .mismatches
            .iter()
            .any(|m| m.location.starts_with("Products/ProductList/Pack[PK00002]") && m.actual == "PG00002"));
    }

    #[test]
    fn test_dangling_equipment_pack_reference() {
        let (xml, fingerprint) = generated();
        let xml = xml.replace("ProductPacks=\"PK00002\"", "ProductPacks=\"PK00099\"");
        let report = validate(&xml, &fingerprint).unwrap();
        assert!(!report.ok);
        assert!(report
            .mismatches
            .iter()
            .any(|m| m.expected == "existing Pack" && m.actual == "PK00099"));
    }

    #[test]
    fn test_dangling_equipment_function_reference() {
        let (xml, fingerprint) = generated();
        let xml = xml.replace("Functions=\"EF00003\"", "Functions=\"EF00042\"");
        let report = validate(&xml, &fingerprint).unwrap();
        let m = report
            .mismatches
            .iter()
            .find(|m| m.actual == "EF00042")
            .unwrap();
        assert_eq!(m.expected, "existing Function");
        assert_eq!(report.mismatches.len(), 1);
    }

    #[test]
    fn test_duplicate_id_reported() {
        let (xml, fingerprint) = generated();
        let xml = xml.replace("<Instance id=\"PI00002\"/>", "<Instance id=\"PI00001\"/>");
        let report = validate(&xml, &fingerprint).unwrap();
        assert!(report.mismatches.iter().any(|m| m.actual == "duplicate PI00001"));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let (_, fingerprint) = generated();
        assert!(validate("<ElectricalProject><Products></ElectricalProject>", &fingerprint).is_err());
    }
}
