//! Input ingestion
//!
//! Turns an AutoCAD attribute export into [`InputRecord`]s. Two shapes are
//! understood: the tab-separated text export and a JSON array of records.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::CanecoError;

/// One physical component read from the drawing export.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputRecord {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub raw_specification: String,
}

impl InputRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        raw_specification: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            manufacturer: manufacturer.into(),
            raw_specification: raw_specification.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `id<TAB>name<TAB>manufacturer<TAB>specification...`
    Tsv,
    Json,
}

impl InputFormat {
    /// Pick the format from a file extension. Anything that is not `.json`
    /// is read as the tab-separated export.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => InputFormat::Json,
            _ => InputFormat::Tsv,
        }
    }
}

/// Read and parse an input file.
pub fn load_records(path: &Path) -> Result<Vec<InputRecord>, CanecoError> {
    let text = std::fs::read_to_string(path)?;
    let records = parse_records(&text, InputFormat::from_path(path))?;
    tracing::info!("Read {} records from {:?}", records.len(), path.file_name());
    Ok(records)
}

pub fn parse_records(text: &str, format: InputFormat) -> Result<Vec<InputRecord>, CanecoError> {
    match format {
        InputFormat::Tsv => Ok(parse_tsv(text)),
        InputFormat::Json => parse_json(text),
    }
}

fn synthesized_id(row: usize) -> String {
    format!("ROW_{:03}", row)
}

fn parse_tsv(text: &str) -> Vec<InputRecord> {
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let cells: Vec<&str> = line.split('\t').map(str::trim).collect();
        let id = cells[0].trim_start_matches('\'').trim();
        if id.eq_ignore_ascii_case("REPERE") || id.eq_ignore_ascii_case("ID") {
            continue;
        }

        let cell = |i: usize| cells.get(i).copied().unwrap_or("").to_string();
        let specification = cells
            .iter()
            .skip(3)
            .filter(|c| !c.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        records.push(InputRecord {
            id: if id.is_empty() {
                synthesized_id(index + 1)
            } else {
                id.to_string()
            },
            name: cell(1),
            manufacturer: cell(2),
            raw_specification: specification,
        });
    }

    records
}

fn parse_json(text: &str) -> Result<Vec<InputRecord>, CanecoError> {
    let mut records: Vec<InputRecord> = serde_json::from_str(text)
        .map_err(|e| CanecoError::Input(format!("invalid record array: {}", e)))?;
    for (index, record) in records.iter_mut().enumerate() {
        if record.id.trim().is_empty() {
            record.id = synthesized_id(index + 1);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_basic_row() {
        let text = "'TR01\tTR01\tSchneider Electric\tNSX630F Micrologic 2.3\t4P3D 36kA\n";
        let records = parse_records(text, InputFormat::Tsv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "TR01");
        assert_eq!(records[0].manufacturer, "Schneider Electric");
        assert_eq!(
            records[0].raw_specification,
            "NSX630F Micrologic 2.3 4P3D 36kA"
        );
    }

    #[test]
    fn test_tsv_skips_header_comments_and_blanks() {
        let text = "REPERE\tNOM\tFABRICANT\tSPEC\n# comment\n\n'Q1\tDEPART\tSchneider\t32A\n";
        let records = parse_records(text, InputFormat::Tsv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "Q1");
    }

    #[test]
    fn test_tsv_missing_id_synthesized_from_line() {
        let text = "'Q1\tA\tB\t10A\n\tNO ID\tB\t16A\n";
        let records = parse_records(text, InputFormat::Tsv).unwrap();
        assert_eq!(records[1].id, "ROW_002");
        assert_eq!(records[1].name, "NO ID");
    }

    #[test]
    fn test_tsv_short_row() {
        let records = parse_records("'Q9\tLONELY", InputFormat::Tsv).unwrap();
        assert_eq!(records[0].manufacturer, "");
        assert_eq!(records[0].raw_specification, "");
    }

    #[test]
    fn test_json_records() {
        let text = r#"[{"id":"Q1","name":"DEPART","manufacturer":"Schneider","rawSpecification":"iDT40N 4P 16A"},
                       {"name":"X"}]"#;
        let records = parse_records(text, InputFormat::Json).unwrap();
        assert_eq!(records[0].raw_specification, "iDT40N 4P 16A");
        assert_eq!(records[1].id, "ROW_002");
    }

    #[test]
    fn test_json_malformed_is_input_error() {
        assert!(matches!(
            parse_records("{}", InputFormat::Json),
            Err(CanecoError::Input(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(InputFormat::from_path(Path::new("a.JSON")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("a.txt")), InputFormat::Tsv);
        assert_eq!(InputFormat::from_path(Path::new("export")), InputFormat::Tsv);
    }
}
