use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::thingsboard::model::{
    BulkImportRequest, BulkImportResult, EntityType, ImportEntitiesResultInfo, ImportEntityData,
};

/// Trait for entity lookups and per-row/bulk entity import
#[async_trait]
pub trait EntityOperations: Send + Sync {
    /// Number of entities matched by an entity filter (`entitiesQuery/count`)
    async fn count_entities(&self, entity_filter: &Value) -> Result<u64>;

    /// Create or update one entity with its attributes and timeseries.
    ///
    /// Fails when the entity already exists and `update` is false.
    async fn save_entity_parameters(
        &self,
        entity_type: EntityType,
        data: &ImportEntityData,
        update: bool,
    ) -> Result<ImportEntitiesResultInfo>;

    /// Hand the raw CSV and its mapping to the server-side importer
    async fn bulk_import(
        &self,
        entity_type: EntityType,
        request: &BulkImportRequest,
    ) -> Result<BulkImportResult>;
}
