//! Template Registry
//!
//! Immutable catalog of named templates, loaded once from a declarative
//! source. Lookups hand out shared references; nothing in the registry is
//! ever reordered or rewritten after load.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::core::CanecoError;
use crate::templates::builtin::{embedded_registry_json, load_registry_source, parse_registry_source};
use crate::templates::schema::{ComponentKind, RegistrySource, Template};

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
    by_name: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Registry built from the embedded `templates/registry.json`.
    pub fn builtin() -> Result<Self, CanecoError> {
        Self::from_json(embedded_registry_json())
    }

    pub fn from_json(json: &str) -> Result<Self, CanecoError> {
        Self::from_source(parse_registry_source(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CanecoError> {
        Self::from_source(load_registry_source(path)?)
    }

    /// Build a registry, rejecting sources whose lookups would be ambiguous.
    pub fn from_source(source: RegistrySource) -> Result<Self, CanecoError> {
        let mut by_name = HashMap::new();
        let mut seeds = HashSet::new();

        for (index, template) in source.templates.iter().enumerate() {
            if template.name.trim().is_empty() {
                return Err(CanecoError::Registry(format!(
                    "template at index {} has an empty name",
                    index
                )));
            }
            if by_name.insert(template.name.clone(), index).is_some() {
                return Err(CanecoError::Registry(format!(
                    "duplicate template name '{}'",
                    template.name
                )));
            }
            if !seeds.insert(template.seed.clone()) {
                return Err(CanecoError::Registry(format!(
                    "template '{}' reuses seed {}/{}",
                    template.name, template.seed.group_id, template.seed.item_id
                )));
            }
            let mut keys = HashSet::new();
            for characteristic in &template.characteristics {
                if !keys.insert(characteristic.id.as_str()) {
                    return Err(CanecoError::Registry(format!(
                        "template '{}' declares characteristic '{}' twice",
                        template.name, characteristic.id
                    )));
                }
            }
        }

        tracing::debug!("Template registry loaded: {} templates", source.templates.len());

        Ok(Self {
            templates: source.templates,
            by_name,
        })
    }

    /// Look up a template by exact name.
    pub fn get(&self, name: &str) -> Result<&Template, CanecoError> {
        self.by_name
            .get(name)
            .map(|&index| &self.templates[index])
            .ok_or_else(|| CanecoError::TemplateNotFound {
                name: name.to_string(),
            })
    }

    /// Templates of one kind, in registry order.
    pub fn all_of_kind(&self, kind: ComponentKind) -> Vec<&Template> {
        self.templates.iter().filter(|t| t.kind == kind).collect()
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = TemplateRegistry::builtin().expect("embedded registry should parse");
        assert!(!registry.is_empty());
        for kind in ComponentKind::ALL {
            assert!(
                !registry.all_of_kind(kind).is_empty(),
                "no template for kind {}",
                kind
            );
        }
    }

    #[test]
    fn test_get_missing_template() {
        let registry = TemplateRegistry::builtin().unwrap();
        match registry.get("NOPE") {
            Err(CanecoError::TemplateNotFound { name }) => assert_eq!(name, "NOPE"),
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_characteristic_order_is_source_order() {
        let registry = TemplateRegistry::builtin().unwrap();
        let tr01 = registry.get("TR01").unwrap();
        let keys = tr01.keys();
        assert_eq!(keys.first(), Some(&"PRT_INST"));
        assert_eq!(keys.last(), Some(&"PRT_REF"));
        assert_eq!(tr01.default_value("PRT_ICC"), Some("36"));
        assert_eq!(tr01.default_value("PRT_BDCLS"), Some(""));
    }

    #[test]
    fn test_all_of_kind_keeps_registry_order() {
        let registry = TemplateRegistry::builtin().unwrap();
        let breakers: Vec<_> = registry
            .all_of_kind(ComponentKind::Breaker)
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(breakers[0], "TR01");
        assert_eq!(breakers[1], "ALIM TD IRVE");
    }

    #[test]
    fn test_duplicate_characteristic_rejected() {
        let json = r#"{"templates":[{"name":"X","kind":"load",
            "seed":{"group_id":"G","item_id":"I"},
            "characteristics":[{"id":"A","value":""},{"id":"A","value":"1"}]}]}"#;
        assert!(matches!(
            TemplateRegistry::from_json(json),
            Err(CanecoError::Registry(_))
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let json = r#"{"templates":[
            {"name":"X","kind":"load","seed":{"group_id":"G","item_id":"I1"},"characteristics":[]},
            {"name":"X","kind":"load","seed":{"group_id":"G","item_id":"I2"},"characteristics":[]}]}"#;
        assert!(matches!(
            TemplateRegistry::from_json(json),
            Err(CanecoError::Registry(_))
        ));
    }
}
