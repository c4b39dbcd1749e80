//! Read-only view over the component catalog.
//!
//! The catalog maps a category key (`dataIngestion`, `mlAi`, …) to the
//! components offered in that category. Only `name` and `shortName` take
//! part in validation; the remaining fields are carried for display.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Catalog categories in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub categories: IndexMap<String, Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_color: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Canonical block name. Nameless components load but match nothing by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
}

impl Catalog {
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("invalid catalog: {e}"))
    }

    /// All components across categories, in catalog order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.categories.values().flat_map(|c| c.components.iter())
    }

    pub fn component_count(&self) -> usize {
        self.components().count()
    }

    /// Every canonical name followed by its short name, in catalog order.
    /// Missing or empty names are skipped.
    pub fn valid_block_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for component in self.components() {
            if let Some(name) = component.name.as_deref().filter(|n| !n.is_empty()) {
                names.push(name);
            }
            if let Some(short) = component.short_name.as_deref() {
                names.push(short);
            }
        }
        names
    }
}
