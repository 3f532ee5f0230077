use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};

use crate::thingsboard::model::{
    BulkImportRequest, BulkImportResult, EntityCount, EntityType, ImportEntitiesResultInfo,
    ImportEntityData, KeyValue,
};
use crate::thingsboard::traits::EntityOperations;

use super::RestClient;

fn key_values_to_object(values: &[KeyValue]) -> Value {
    Value::Object(
        values
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect::<Map<String, Value>>(),
    )
}

/// Merge the row's fields into an existing entity, or start a fresh one.
fn entity_body(entity_type: EntityType, data: &ImportEntityData, existing: Option<Value>) -> Value {
    let mut entity = existing.unwrap_or_else(|| json!({ "name": data.name }));
    entity["type"] = json!(data.entity_type);
    entity["label"] = json!(data.label);
    if !entity["additionalInfo"].is_object() {
        entity["additionalInfo"] = json!({});
    }
    entity["additionalInfo"]["description"] = json!(data.description);
    if let Some(gateway) = data.gateway {
        entity["additionalInfo"]["gateway"] = json!(gateway);
    }
    if entity_type == EntityType::Edge {
        for key in ["routingKey", "secret"] {
            if entity.get(key).map_or(true, Value::is_null) {
                entity[key] = json!(uuid::Uuid::new_v4().simple().to_string());
            }
        }
    }
    entity
}

impl RestClient {
    async fn find_entity_by_name(&self, entity_type: EntityType, name: &str) -> Result<Option<Value>> {
        let (endpoint, param) = entity_type.lookup_by_name();
        let response = self
            .base_api(Method::GET, endpoint)
            .await?
            .query(&[(param, name)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }

    async fn save_telemetry(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        path: &str,
        values: &[KeyValue],
    ) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.base_api(
            Method::POST,
            &format!("plugins/telemetry/{entity_type}/{entity_id}/{path}"),
        )
        .await?
        .json(&key_values_to_object(values))
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl EntityOperations for RestClient {
    async fn count_entities(&self, entity_filter: &Value) -> Result<u64> {
        let response = self
            .base_api(Method::POST, "entitiesQuery/count")
            .await?
            .json(&json!({ "entityFilter": entity_filter }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn save_entity_parameters(
        &self,
        entity_type: EntityType,
        data: &ImportEntityData,
        update: bool,
    ) -> Result<ImportEntitiesResultInfo> {
        let existing = self.find_entity_by_name(entity_type, &data.name).await?;
        let is_update = existing.is_some();
        if is_update && !update {
            return Err(anyhow::anyhow!(
                "{} '{}' already exists",
                entity_type.resource(),
                data.name
            ));
        }

        let mut request = self
            .base_api(Method::POST, entity_type.resource())
            .await?
            .json(&entity_body(entity_type, data, existing));
        if let (false, Some(token)) = (is_update, &data.access_token) {
            request = request.query(&[("accessToken", token)]);
        }
        let saved: Value = request.send().await?.error_for_status()?.json().await?;
        let entity_id = saved["id"]["id"]
            .as_str()
            .context("Saved entity has no id")?
            .to_string();
        debug!("Saved {} {} ({entity_id})", entity_type.resource(), data.name);

        self.save_telemetry(
            entity_type,
            &entity_id,
            "attributes/SERVER_SCOPE",
            &data.attributes.server,
        )
        .await?;
        if entity_type.supports_shared_attributes() {
            self.save_telemetry(
                entity_type,
                &entity_id,
                "attributes/SHARED_SCOPE",
                &data.attributes.shared,
            )
            .await?;
        }
        self.save_telemetry(entity_type, &entity_id, "timeseries/ANY", &data.timeseries)
            .await?;

        let count = Some(EntityCount { entity: 1 });
        Ok(if is_update {
            ImportEntitiesResultInfo {
                update: count,
                ..Default::default()
            }
        } else {
            ImportEntitiesResultInfo {
                create: count,
                ..Default::default()
            }
        })
    }

    async fn bulk_import(
        &self,
        entity_type: EntityType,
        request: &BulkImportRequest,
    ) -> Result<BulkImportResult> {
        let response = self
            .base_api(Method::POST, &format!("{}/bulk_import", entity_type.resource()))
            .await?
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let result: BulkImportResult = response.json().await?;
        debug!(
            "Bulk import of {entity_type}: created={}, updated={}, errors={}",
            result.created, result.updated, result.errors
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_edge_gets_credentials() {
        let data = ImportEntityData {
            name: "edge-1".to_string(),
            entity_type: "default".to_string(),
            ..Default::default()
        };
        let body = entity_body(EntityType::Edge, &data, None);
        assert_eq!(body["name"], "edge-1");
        assert_eq!(body["routingKey"].as_str().unwrap().len(), 32);
        assert!(body["secret"].is_string());
    }

    #[test]
    fn update_keeps_existing_fields() {
        let existing = json!({
            "id": {"entityType": "DEVICE", "id": "d-1"},
            "name": "d1",
            "type": "old",
            "additionalInfo": {"gateway": true, "overwriteActivityTime": false}
        });
        let data = ImportEntityData {
            name: "d1".to_string(),
            entity_type: "thermostat".to_string(),
            description: "lobby".to_string(),
            ..Default::default()
        };
        let body = entity_body(EntityType::Device, &data, Some(existing));
        assert_eq!(body["id"]["id"], "d-1");
        assert_eq!(body["type"], "thermostat");
        assert_eq!(body["additionalInfo"]["gateway"], true);
        assert_eq!(body["additionalInfo"]["overwriteActivityTime"], false);
        assert_eq!(body["additionalInfo"]["description"], "lobby");
    }
}
