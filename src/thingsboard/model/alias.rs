use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Late-bound entity reference stored in a dashboard's `configuration.entityAliases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAlias {
    #[serde(default)]
    pub id: String,
    pub alias: String,
    #[serde(default)]
    pub filter: Value,
}

/// Alias as carried inside an exported widget, before it gets an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAliasInfo {
    pub alias: String,
    #[serde(default)]
    pub filter: Value,
}

/// Map of alias id to alias, in insertion order of the source document.
pub type EntityAliases = serde_json::Map<String, Value>;

/// Positional aliases of an exported widget, keyed by datasource index.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasesInfo {
    #[serde(default)]
    pub datasource_aliases: BTreeMap<usize, EntityAliasInfo>,
    #[serde(default)]
    pub target_device_aliases: BTreeMap<usize, EntityAliasInfo>,
}

impl AliasesInfo {
    pub fn is_empty(&self) -> bool {
        self.datasource_aliases.is_empty() && self.target_device_aliases.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterInfo {
    pub filter: String,
    #[serde(default)]
    pub key_filters: Value,
    #[serde(default)]
    pub editable: bool,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersInfo {
    #[serde(default)]
    pub datasource_filters: BTreeMap<usize, FilterInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSize {
    pub size_x: f64,
    pub size_y: f64,
}
