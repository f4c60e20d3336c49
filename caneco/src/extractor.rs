//! Pattern Extractor
//!
//! Pulls a current rating, a pole configuration and a manufacturer
//! reference (plus transformer power, cable section and a differential
//! marker) out of one free-text specification string.
//!
//! Every rule list is tried in order and the first rule that matches wins,
//! even when a later rule would produce a longer match. A miss is a normal
//! outcome and is reported as `None`, never as an error.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Characteristic keys the extractor can override.
pub const KEY_RATING: &str = "PRT_CAL";
pub const KEY_POLES: &str = "PRT_NBPPP";
pub const KEY_REFERENCE: &str = "PRT_REF";
pub const KEY_POWER: &str = "PRT_PUISSANCE";
pub const KEY_SECTION: &str = "PRT_SECTION";

/// Rating rules, in priority order: `32A`, `NSX630`, `32 amp`.
static RATING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"(\d+)A", r"NSX(\d+)", r"(?i)(\d+(?:[.,]\d+)?)\s*amps?\b"])
});

static POLES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([1-4]P(?:[1-4]D)?)\b").expect("poles pattern"));

/// Product-family reference rules, in priority order.
static REFERENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"NSX\w*", r"iDT\w*", r"TM-D", r"Micrologic\s*\d+(?:\.\d+)?"])
});

static POWER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*kVA").expect("power pattern"));

static SECTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*mm").expect("section pattern"));

static DIFFERENTIAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"(?i)\bvigi", r"\b\d+\s*mA\b", r"(?i)\bddr\b", r"(?i)\bdiff"])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("extractor pattern"))
        .collect()
}

/// Values found in one specification string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub rating: Option<f64>,
    pub poles: Option<String>,
    pub reference: Option<String>,
    pub power_kva: Option<f64>,
    pub section_mm2: Option<f64>,
    pub differential: bool,
}

impl Extraction {
    /// True when no rule matched at all.
    pub fn is_empty(&self) -> bool {
        self.rating.is_none()
            && self.poles.is_none()
            && self.reference.is_none()
            && self.power_kva.is_none()
            && self.section_mm2.is_none()
            && !self.differential
    }

    /// Characteristic overrides in a fixed key order. Only non-empty values
    /// are returned.
    pub fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(rating) = self.rating {
            out.push((KEY_RATING, format_decimal(rating)));
        }
        if let Some(poles) = self.poles.as_deref().filter(|p| !p.is_empty()) {
            out.push((KEY_POLES, poles.to_string()));
        }
        if let Some(reference) = self.reference.as_deref().filter(|r| !r.is_empty()) {
            out.push((KEY_REFERENCE, reference.to_string()));
        }
        if let Some(power) = self.power_kva {
            out.push((KEY_POWER, format_decimal(power)));
        }
        if let Some(section) = self.section_mm2 {
            out.push((KEY_SECTION, format_decimal(section)));
        }
        out
    }
}

/// Render a numeric characteristic the way the reference file stores it.
pub fn format_decimal(value: f64) -> String {
    format!("{:.2}", value)
}

/// Run every rule family over `raw`.
pub fn extract(raw: &str) -> Extraction {
    Extraction {
        rating: extract_rating(raw),
        poles: extract_poles(raw),
        reference: extract_reference(raw),
        power_kva: first_number(&POWER_PATTERN, raw),
        section_mm2: first_number(&SECTION_PATTERN, raw),
        differential: DIFFERENTIAL_PATTERNS.iter().any(|re| re.is_match(raw)),
    }
}

pub fn extract_rating(raw: &str) -> Option<f64> {
    RATING_PATTERNS
        .iter()
        .find_map(|re| first_number(re, raw))
}

pub fn extract_poles(raw: &str) -> Option<String> {
    POLES_PATTERN
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_reference(raw: &str) -> Option<String> {
    REFERENCE_PATTERNS
        .iter()
        .find_map(|re| re.find(raw))
        .map(|m| m.as_str().to_string())
}

fn first_number(re: &Regex, raw: &str) -> Option<f64> {
    let caps = re.captures(raw)?;
    let text = caps.get(1)?.as_str().replace(',', ".");
    text.parse::<f64>().ok()
}
