//! Template data model
//!
//! Types deserialized from the declarative registry source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of component kinds a record can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Breaker,
    Transformer,
    Busbar,
    Cable,
    Load,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 5] = [
        ComponentKind::Breaker,
        ComponentKind::Transformer,
        ComponentKind::Busbar,
        ComponentKind::Cable,
        ComponentKind::Load,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Breaker => "breaker",
            ComponentKind::Transformer => "transformer",
            ComponentKind::Busbar => "busbar",
            ComponentKind::Cable => "cable",
            ComponentKind::Load => "load",
        }
    }

    /// Element name of the commercial-taxonomy block inside a Pack.
    pub fn commercial_element(&self) -> &'static str {
        match self {
            ComponentKind::Breaker => "CircuitBreaker",
            ComponentKind::Transformer => "Transformer",
            ComponentKind::Busbar => "Busbar",
            ComponentKind::Cable => "Cable",
            ComponentKind::Load => "Load",
        }
    }

    /// Element name of the electrical-taxonomy marker inside a Device.
    pub fn device_element(&self) -> &'static str {
        match self {
            ComponentKind::Breaker => "CircuitBreakerDevice",
            ComponentKind::Transformer => "MvLvTransformerDevice",
            ComponentKind::Busbar => "BusbarDevice",
            ComponentKind::Cable => "CableDevice",
            ComponentKind::Load => "LoadDevice",
        }
    }

    /// Element name of the electrical-taxonomy marker inside a Function.
    pub fn function_element(&self) -> &'static str {
        match self {
            ComponentKind::Breaker => "SwitchgearFunction",
            ComponentKind::Transformer => "SourceFunction",
            ComponentKind::Busbar => "DistributionFunction",
            ComponentKind::Cable => "TransmissionFunction",
            ComponentKind::Load => "ReceiverFunction",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product seed identifying the vendor catalog entry a template stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed {
    pub group_id: String,
    pub item_id: String,
}

/// One characteristic slot: key plus its value.
///
/// An empty `value` is a real value and is emitted as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    pub id: String,
    pub value: String,
}

impl Characteristic {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// A named, immutable component template.
///
/// The order of `characteristics` is part of the template's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub kind: ComponentKind,
    /// Selected for records carrying a differential-protection marker.
    #[serde(default)]
    pub differential: bool,
    pub seed: Seed,
    pub characteristics: Vec<Characteristic>,
}

impl Template {
    /// Characteristic keys in template order.
    pub fn keys(&self) -> Vec<&str> {
        self.characteristics.iter().map(|c| c.id.as_str()).collect()
    }

    /// Default value of a characteristic, if the template defines it.
    pub fn default_value(&self, key: &str) -> Option<&str> {
        self.characteristics
            .iter()
            .find(|c| c.id == key)
            .map(|c| c.value.as_str())
    }

    /// Default current rating (`PRT_CAL`) as a number.
    pub fn default_rating(&self) -> Option<f64> {
        self.default_value(crate::extractor::KEY_RATING)
            .and_then(|v| v.trim().parse::<f64>().ok())
    }
}

/// On-disk shape of the registry source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySource {
    pub templates: Vec<Template>,
}
