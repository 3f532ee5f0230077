use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Entity types that can be created row-by-row from a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Device,
    Asset,
    Edge,
}

impl EntityType {
    /// Path segment of the entity's REST resource, e.g. `device` in `api/device`.
    pub fn resource(self) -> &'static str {
        match self {
            EntityType::Device => "device",
            EntityType::Asset => "asset",
            EntityType::Edge => "edge",
        }
    }

    /// Tenant-scoped lookup endpoint and the query parameter holding the entity name.
    pub fn lookup_by_name(self) -> (&'static str, &'static str) {
        match self {
            EntityType::Device => ("tenant/devices", "deviceName"),
            EntityType::Asset => ("tenant/assets", "assetName"),
            EntityType::Edge => ("tenant/edges", "edgeName"),
        }
    }

    /// Only devices carry shared attributes and access tokens.
    pub fn supports_shared_attributes(self) -> bool {
        matches!(self, EntityType::Device)
    }
}
