//! Component Classification Module
//!
//! Decides which component kind a drawing record stands for, then which
//! template of that kind fits it best. Decisions are made, in order, from
//! configured name hints, a keyword table over the record name and
//! manufacturer, and finally from what the pattern extractor found in the
//! specification text.

use serde::Serialize;

use crate::config::TemplateHint;
use crate::core::CanecoError;
use crate::extractor::{self, Extraction};
use crate::input::InputRecord;
use crate::templates::{ComponentKind, Template, TemplateRegistry};

/// Transformer keywords (matched lowercase)
const TRANSFORMER_PATTERNS: &[&str] = &["transfo", "transformer", "transformateur", "hta/bt"];

/// Busbar keywords
const BUSBAR_PATTERNS: &[&str] = &["jeu de barre", "jdb", "busbar", "canalis"];

/// Cable keywords
const CABLE_PATTERNS: &[&str] = &["cable", "câble", "u1000", "r2v"];

/// Load / receiver keywords
const LOAD_PATTERNS: &[&str] = &["charge", "load", "recepteur", "récepteur", "moteur", "motor"];

/// Breaker family keywords
const BREAKER_PATTERNS: &[&str] = &[
    "disjoncteur", "breaker", "nsx", "idt", "compact", "masterpact", "acti9", "irve", "borne",
];

/// Record name prefixes used on drawings (matched uppercase)
const NAME_PREFIXES: &[(&str, ComponentKind)] = &[
    ("TA-", ComponentKind::Transformer),
    ("JB-", ComponentKind::Busbar),
    ("CBL", ComponentKind::Cable),
];

/// Keyword table in evaluation order.
const KIND_TABLE: &[(ComponentKind, &[&str])] = &[
    (ComponentKind::Transformer, TRANSFORMER_PATTERNS),
    (ComponentKind::Busbar, BUSBAR_PATTERNS),
    (ComponentKind::Cable, CABLE_PATTERNS),
    (ComponentKind::Load, LOAD_PATTERNS),
    (ComponentKind::Breaker, BREAKER_PATTERNS),
];

/// What settled the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    Hint,
    Keyword,
    Extraction,
}

/// Outcome for a record that could be classified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub kind: ComponentKind,
    pub template_name: String,
    pub reason: MatchReason,
    pub extraction: Extraction,
}

/// Keyword and hint driven classifier
pub struct ComponentClassifier {
    hints: Vec<TemplateHint>,
}

impl Default for ComponentClassifier {
    fn default() -> Self {
        Self { hints: Vec::new() }
    }
}

impl ComponentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hints(hints: Vec<TemplateHint>) -> Self {
        Self { hints }
    }

    /// Add a name hint; hints are tried in insertion order.
    pub fn add_hint(&mut self, keyword: &str, template: &str) {
        self.hints.push(TemplateHint::new(keyword, template));
    }

    /// Classify one record.
    ///
    /// The kind comes from the keyword table, or failing that from the
    /// extraction. Name hints then only choose among templates of that kind.
    ///
    /// `Ok(None)` means the record is unclassifiable, which callers report
    /// and skip. Errors are registry defects: a hint naming a missing
    /// template, or a kind with no template at all.
    pub fn classify(
        &self,
        record: &InputRecord,
        registry: &TemplateRegistry,
    ) -> Result<Option<Classification>, CanecoError> {
        let extraction = extractor::extract(&record.raw_specification);

        let (kind, reason) = match Self::kind_from_keywords(record) {
            Some(kind) => (kind, MatchReason::Keyword),
            None => match Self::kind_from_extraction(&extraction) {
                Some(kind) => (kind, MatchReason::Extraction),
                None => {
                    tracing::debug!("{}: no kind matched", record.id);
                    return Ok(None);
                }
            },
        };

        if let Some((hint, template)) = self.matching_hint(record, kind, registry)? {
            tracing::debug!(
                "{}: kind {} ({:?}), hint '{}' -> template '{}'",
                record.id,
                kind,
                reason,
                hint.keyword,
                template.name
            );
            return Ok(Some(Classification {
                kind,
                template_name: template.name.clone(),
                reason: MatchReason::Hint,
                extraction,
            }));
        }

        let template = Self::select_template(registry, kind, record, &extraction)?;
        tracing::debug!(
            "{}: kind {} ({:?}) -> template '{}'",
            record.id,
            kind,
            reason,
            template.name
        );

        Ok(Some(Classification {
            kind,
            template_name: template.name.clone(),
            reason,
            extraction,
        }))
    }

    /// First hint whose keyword appears in the record name and whose
    /// template belongs to the already decided kind.
    ///
    /// A hint naming a template missing from the registry is an error even
    /// when its kind would not have applied.
    fn matching_hint<'r>(
        &self,
        record: &InputRecord,
        kind: ComponentKind,
        registry: &'r TemplateRegistry,
    ) -> Result<Option<(&TemplateHint, &'r Template)>, CanecoError> {
        let name = record.name.to_uppercase();
        for hint in &self.hints {
            if hint.keyword.is_empty() || !name.contains(&hint.keyword.to_uppercase()) {
                continue;
            }
            let template = registry.get(&hint.template)?;
            if template.kind == kind {
                return Ok(Some((hint, template)));
            }
            tracing::debug!(
                "{}: hint '{}' skipped, template '{}' is not a {}",
                record.id,
                hint.keyword,
                template.name,
                kind
            );
        }
        Ok(None)
    }

    /// Keyword table over the name first, then the manufacturer.
    pub fn kind_from_keywords(record: &InputRecord) -> Option<ComponentKind> {
        let upper_name = record.name.trim().to_uppercase();
        for (prefix, kind) in NAME_PREFIXES {
            if upper_name.starts_with(prefix) {
                return Some(*kind);
            }
        }

        [&record.name, &record.manufacturer]
            .iter()
            .find_map(|field| Self::kind_from_text(field))
    }

    fn kind_from_text(text: &str) -> Option<ComponentKind> {
        let lower = text.to_lowercase();
        KIND_TABLE
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| lower.contains(p)))
            .map(|(kind, _)| *kind)
    }

    /// Infer a kind from which extraction rules succeeded.
    pub fn kind_from_extraction(extraction: &Extraction) -> Option<ComponentKind> {
        if extraction.reference.is_some()
            || extraction.differential
            || extraction.poles.is_some()
            || extraction.rating.is_some()
        {
            Some(ComponentKind::Breaker)
        } else if extraction.power_kva.is_some() {
            Some(ComponentKind::Transformer)
        } else if extraction.section_mm2.is_some() {
            Some(ComponentKind::Cable)
        } else {
            None
        }
    }

    /// Pick the template of `kind` that fits the record best.
    ///
    /// A template named like the record wins outright. Otherwise templates
    /// whose differential flag agrees with the record are preferred, then
    /// the one whose default rating is closest to the extracted rating.
    /// Ties, and records without a rating, fall to the lowest registry index.
    pub fn select_template<'r>(
        registry: &'r TemplateRegistry,
        kind: ComponentKind,
        record: &InputRecord,
        extraction: &Extraction,
    ) -> Result<&'r Template, CanecoError> {
        let candidates = registry.all_of_kind(kind);
        if candidates.is_empty() {
            return Err(CanecoError::NoTemplatesForKind { kind });
        }

        let name = record.name.trim();
        if let Some(exact) = candidates
            .iter()
            .copied()
            .find(|t| !name.is_empty() && t.name.eq_ignore_ascii_case(name))
        {
            return Ok(exact);
        }

        let preferred: Vec<&Template> = candidates
            .iter()
            .copied()
            .filter(|t| t.differential == extraction.differential)
            .collect();
        let pool = if preferred.is_empty() { candidates } else { preferred };

        let mut best = pool[0];
        let mut best_distance = rating_distance(best, extraction.rating);
        for &template in pool.iter().skip(1) {
            let distance = rating_distance(template, extraction.rating);
            // Strict comparison keeps the earlier template on ties.
            if distance < best_distance {
                best = template;
                best_distance = distance;
            }
        }
        Ok(best)
    }
}

fn rating_distance(template: &Template, rating: Option<f64>) -> f64 {
    match (rating, template.default_rating()) {
        (Some(r), Some(d)) => (d - r).abs(),
        _ => f64::INFINITY,
    }
}
