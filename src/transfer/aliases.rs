//! Entity alias normalization and re-resolution against the target tenant.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info};
use serde_json::{json, Value};

use crate::thingsboard::model::{AliasesInfo, EntityAliasInfo, EntityAliases};
use crate::thingsboard::traits::EntityOperations;

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn list_or_name_filter(entity_type: &Value, legacy: &Value, list_key: &str, name_key: &str) -> Value {
    let use_filter = legacy
        .get("useFilter")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if use_filter {
        json!({
            "type": "entityName",
            "entityType": entity_type,
            "resolveMultiple": false,
            "entityNameFilter": legacy.get(name_key).cloned().unwrap_or(Value::Null),
        })
    } else {
        json!({
            "type": "entityList",
            "entityType": entity_type,
            "resolveMultiple": false,
            "entityList": legacy.get(list_key).cloned().unwrap_or(Value::Null),
        })
    }
}

/// Normalize an exported alias into `{alias, filter}`.
///
/// Older exports describe aliases with `deviceId`, `deviceFilter` or
/// `entityFilter` plus an `aliasName`; these are rewritten into the current
/// filter shape. Anything else is taken as already normalized.
pub fn prepare_entity_alias(info: &Value) -> EntityAliasInfo {
    if let Some(device_id) = info.get("deviceId").filter(|v| !v.is_null()) {
        return EntityAliasInfo {
            alias: text(info, "aliasName"),
            filter: json!({
                "type": "entityList",
                "entityType": "DEVICE",
                "entityList": [device_id],
                "resolveMultiple": false,
            }),
        };
    }
    if let Some(legacy) = info.get("deviceFilter").filter(|v| !v.is_null()) {
        return EntityAliasInfo {
            alias: text(info, "aliasName"),
            filter: list_or_name_filter(&json!("DEVICE"), legacy, "deviceList", "deviceNameFilter"),
        };
    }
    if let Some(legacy) = info.get("entityFilter").filter(|v| !v.is_null()) {
        let entity_type = info.get("entityType").cloned().unwrap_or(Value::Null);
        return EntityAliasInfo {
            alias: text(info, "aliasName"),
            filter: list_or_name_filter(&entity_type, legacy, "entityList", "entityNameFilter"),
        };
    }
    EntityAliasInfo {
        alias: text(info, "alias"),
        filter: info.get("filter").cloned().unwrap_or(Value::Null),
    }
}

fn indexed_aliases(raw: Option<&Value>) -> impl Iterator<Item = (usize, EntityAliasInfo)> + '_ {
    raw.and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter_map(|(index, info)| Some((index.parse().ok()?, prepare_entity_alias(info))))
}

/// Read a widget's `aliasesInfo`, normalizing every alias it carries.
///
/// A single `targetDeviceAlias` is treated as target device alias 0.
pub fn prepare_aliases_info(raw: &Value) -> AliasesInfo {
    let mut info = AliasesInfo {
        datasource_aliases: indexed_aliases(raw.get("datasourceAliases")).collect(),
        target_device_aliases: indexed_aliases(raw.get("targetDeviceAliases")).collect(),
    };
    if let Some(single) = raw.get("targetDeviceAlias").filter(|v| v.is_object()) {
        info.target_device_aliases
            .entry(0)
            .or_insert_with(|| prepare_entity_alias(single));
    }
    info
}

/// Whether `alias` resolves to anything on the target tenant.
///
/// Aliases without a filter never resolve. State entity aliases are bound at
/// view time and always count as resolved. Backend errors count as unresolved.
pub async fn check_entity_alias<C>(client: &C, alias: &Value) -> bool
where
    C: EntityOperations + ?Sized,
{
    let filter = match alias.get("filter") {
        Some(filter) if filter.is_object() => filter,
        _ => return false,
    };
    if filter.get("type").and_then(Value::as_str) == Some("stateEntity") {
        return true;
    }
    match client.count_entities(filter).await {
        Ok(count) => count > 0,
        Err(e) => {
            debug!("Alias check failed: {e:#}");
            false
        }
    }
}

/// Check `alias_ids` concurrently and return the unresolved ones as copies
/// with their filter cleared, keyed by alias id.
pub async fn process_entity_aliases<C>(
    client: &C,
    aliases: &EntityAliases,
    alias_ids: &[String],
) -> EntityAliases
where
    C: EntityOperations + ?Sized,
{
    let checks = alias_ids.iter().filter_map(|id| {
        let alias = aliases.get(id)?;
        Some(async move { (id, alias, check_entity_alias(client, alias).await) })
    });

    let mut missing = EntityAliases::new();
    for (id, alias, resolved) in join_all(checks).await {
        if !resolved {
            let mut copy = alias.clone();
            if copy.is_object() {
                copy["filter"] = Value::Null;
            }
            missing.insert(id.clone(), copy);
        }
    }
    missing
}

/// Asks the user to fix aliases that do not resolve on the target tenant.
#[async_trait]
pub trait AliasEditor: Send + Sync {
    /// Returns the edited aliases keyed by id, or `None` when the user
    /// dismissed the editor.
    async fn edit_missing_aliases(
        &self,
        widgets: &[Value],
        title: &str,
        missing: EntityAliases,
    ) -> Result<Option<EntityAliases>>;
}

/// Editor for unattended runs: any missing alias cancels the import.
pub struct NonInteractiveEditor;

#[async_trait]
impl AliasEditor for NonInteractiveEditor {
    async fn edit_missing_aliases(
        &self,
        _widgets: &[Value],
        title: &str,
        missing: EntityAliases,
    ) -> Result<Option<EntityAliases>> {
        info!("{title}: {} unresolved alias(es), not prompting", missing.len());
        Ok(None)
    }
}

/// Check every alias in `aliases` and let `editor` fix the unresolved ones.
///
/// Returns `false` when editing was dismissed; `aliases` is then untouched.
pub async fn resolve_aliases<C, E>(
    client: &C,
    editor: &E,
    aliases: &mut EntityAliases,
    widgets: &[Value],
    title: &str,
) -> Result<bool>
where
    C: EntityOperations + ?Sized,
    E: AliasEditor + ?Sized,
{
    let alias_ids: Vec<String> = aliases.keys().cloned().collect();
    let missing = process_entity_aliases(client, aliases, &alias_ids).await;
    if missing.is_empty() {
        return Ok(true);
    }
    debug!("🔎 Unresolved aliases: {:?}", missing.keys().collect::<Vec<_>>());
    match editor.edit_missing_aliases(widgets, title, missing).await? {
        Some(updated) => {
            for (id, alias) in updated {
                aliases.insert(id, alias);
            }
            Ok(true)
        }
        None => Ok(false),
    }
}
