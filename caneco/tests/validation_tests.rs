//! Compatibility checks against a reference Caneco BT export

use caneco::prelude::*;
use caneco::{validate, ReferenceFingerprint};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn reference() -> ReferenceFingerprint {
    let xml = std::fs::read_to_string(fixture_path("reference_export.xml")).unwrap();
    ReferenceFingerprint::from_document(&xml).unwrap()
}

fn convert(records: &[InputRecord]) -> String {
    let registry = TemplateRegistry::builtin().unwrap();
    CanecoCore::convert(records, &registry, &ConverterConfig::default())
        .unwrap()
        .document
}

#[test]
fn test_reference_fingerprint() {
    let fingerprint = reference();
    assert_eq!(fingerprint.root_attributes.len(), 8);
    assert_eq!(fingerprint.namespaces.len(), 5);
    let order = fingerprint
        .characteristic_orders
        .get(&("ECD_DISJONCTEUR".to_string(), "MG4_13271".to_string()))
        .unwrap();
    assert_eq!(order.first().map(String::as_str), Some("PRT_INST"));
    assert_eq!(order.len(), 14);
}

#[test]
fn test_main_breaker_matches_reference() {
    let xml = convert(&[InputRecord::new(
        "TR01",
        "TR01",
        "Schneider Electric",
        "NSX630F Micrologic 2.3 4P3D 36kA",
    )]);
    let report = validate(&xml, &reference()).unwrap();
    assert!(report.ok, "{:?}", report.mismatches);
}

#[test]
fn test_product_unknown_to_reference_is_reported() {
    let xml = convert(&[
        InputRecord::new("TR01", "TR01", "Schneider Electric", "NSX630F 4P3D"),
        InputRecord::new("Q2", "DEPART", "Schneider Electric", "iDT40N 4P 10A"),
    ]);
    let report = validate(&xml, &reference()).unwrap();
    assert!(!report.ok);
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(
        report.mismatches[0].location,
        "Products/ProductSet/Product[PG00002]/Seed"
    );
    assert_eq!(report.mismatches[0].actual, "ECD_DISJONCTEUR/SC4_19030");
}

#[test]
fn test_reference_validates_against_registry() {
    let xml = std::fs::read_to_string(fixture_path("reference_export.xml")).unwrap();
    let report = CanecoCore::validate_document(&xml, None, &ConverterConfig::default()).unwrap();
    assert!(report.ok, "{:?}", report.mismatches);
}

#[test]
fn test_validation_does_not_touch_document() {
    let xml = convert(&[InputRecord::new("TR01", "TR01", "", "NSX630F")]);
    let copy = xml.clone();
    let _ = validate(&xml, &reference()).unwrap();
    assert_eq!(xml, copy);
}

#[test]
fn test_report_serializes_for_tooling() {
    let xml = convert(&[InputRecord::new("Q2", "DEPART", "", "iDT40N 4P 10A")]);
    let report = validate(&xml, &reference()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["ok"], false);
    assert!(json["mismatches"][0]["location"].is_string());
}
