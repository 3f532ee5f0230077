use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEntityAttributes {
    #[serde(default)]
    pub server: Vec<KeyValue>,
    #[serde(default)]
    pub shared: Vec<KeyValue>,
}

/// One CSV row converted into the fields of an entity to create or update.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntityData {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gateway: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub attributes: ImportEntityAttributes,
    #[serde(default)]
    pub timeseries: Vec<KeyValue>,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCount {
    pub entity: u64,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCount {
    pub entity: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

/// Summary of a client-side import, the fold of every row's outcome.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntitiesResultInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<EntityCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<EntityCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCount>,
}

impl ImportEntitiesResultInfo {
    pub fn created(&self) -> u64 {
        self.create.map_or(0, |c| c.entity)
    }

    pub fn updated(&self) -> u64 {
        self.update.map_or(0, |c| c.entity)
    }

    pub fn failed(&self) -> u64 {
        self.error.as_ref().map_or(0, |c| c.entity)
    }

    /// Failure messages, one per failed row.
    pub fn error_messages(&self) -> Vec<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.errors.as_deref())
            .map(|errors| errors.lines().filter(|l| !l.is_empty()).collect())
            .unwrap_or_default()
    }
}
