//! Single-widget export and attachment of an imported widget to a dashboard.

use anyhow::anyhow;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::aliases::prepare_aliases_info;
use super::error::{TransferError, TransferResult};
use crate::thingsboard::model::{
    AliasesInfo, EntityAliasInfo, EntityAliases, FilterInfo, FiltersInfo, WidgetSize,
};

const DEFAULT_GRID_COLUMNS: u64 = 24;
const DEFAULT_SIZE: WidgetSize = WidgetSize {
    size_x: 8.0,
    size_y: 6.0,
};

/// A widget exported together with everything needed to re-bind it elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetItem {
    pub widget: Value,
    pub aliases_info: AliasesInfo,
    #[serde(default)]
    pub filters_info: FiltersInfo,
    pub original_columns: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_size: Option<WidgetSize>,
}

impl WidgetItem {
    /// Read an imported widget file, normalizing legacy alias forms.
    pub fn from_import(item: &Value) -> TransferResult<Self> {
        Ok(Self {
            widget: item.get("widget").cloned().unwrap_or(Value::Null),
            aliases_info: prepare_aliases_info(item.get("aliasesInfo").unwrap_or(&Value::Null)),
            filters_info: match item.get("filtersInfo") {
                Some(info) if !info.is_null() => serde_json::from_value(info.clone())?,
                _ => FiltersInfo::default(),
            },
            original_columns: item
                .get("originalColumns")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_GRID_COLUMNS),
            original_size: item
                .get("originalSize")
                .and_then(|size| serde_json::from_value(size.clone()).ok()),
        })
    }
}

/// Where a resolved alias goes back to once the user has confirmed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasSlot {
    Datasource(usize),
    TargetDevice(usize),
}

fn is_entity_datasource(datasource: &Value) -> bool {
    matches!(
        datasource.get("type").and_then(Value::as_str),
        Some("entity" | "entityCount")
    )
}

fn state_layout<'a>(dashboard: &'a Value, state: &str, layout: &str) -> Option<&'a Value> {
    dashboard
        .get("configuration")?
        .get("states")?
        .get(state)?
        .get("layouts")?
        .get(layout)
}

/// Grid columns of the source layout times the number of layouts in the state.
pub fn original_columns(dashboard: &Value, state: &str, layout: &str) -> u64 {
    let layout_count = dashboard
        .get("configuration")
        .and_then(|c| c.get("states")?.get(state)?.get("layouts"))
        .and_then(Value::as_object)
        .map_or(1, Map::len) as u64;
    let columns = state_layout(dashboard, state, layout)
        .and_then(|l| l.pointer("/gridSettings/columns"))
        .and_then(Value::as_u64)
        .filter(|c| *c > 0)
        .unwrap_or(DEFAULT_GRID_COLUMNS);
    columns * layout_count
}

pub fn original_size(dashboard: &Value, state: &str, layout: &str, widget_id: &str) -> Option<WidgetSize> {
    let entry = state_layout(dashboard, state, layout)?.get("widgets")?.get(widget_id)?;
    Some(WidgetSize {
        size_x: entry.get("sizeX")?.as_f64()?,
        size_y: entry.get("sizeY")?.as_f64()?,
    })
}

/// Collect a widget and the aliases and filters it references from `dashboard`.
pub fn prepare_widget_item(
    dashboard: &Value,
    state: &str,
    layout: &str,
    widget_id: &str,
) -> TransferResult<WidgetItem> {
    let widget = dashboard
        .pointer("/configuration/widgets")
        .and_then(|widgets| widgets.get(widget_id))
        .ok_or_else(|| TransferError::Backend(anyhow!("Widget {widget_id} not found in dashboard")))?;

    let entity_aliases = dashboard.pointer("/configuration/entityAliases");
    let filters = dashboard.pointer("/configuration/filters");
    let datasources = widget
        .pointer("/config/datasources")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut aliases_info = AliasesInfo::default();
    let mut filters_info = FiltersInfo::default();
    let alias_info = |alias_id: &Value| -> Option<EntityAliasInfo> {
        let alias = entity_aliases?.get(alias_id.as_str()?)?;
        Some(EntityAliasInfo {
            alias: alias.get("alias")?.as_str()?.to_string(),
            filter: alias.get("filter").cloned().unwrap_or(Value::Null),
        })
    };

    for (index, datasource) in datasources.iter().enumerate() {
        if !is_entity_datasource(datasource) {
            continue;
        }
        if let Some(info) = datasource.get("entityAliasId").and_then(alias_info) {
            aliases_info.datasource_aliases.insert(index, info);
        }
        let filter = datasource
            .get("filterId")
            .and_then(Value::as_str)
            .and_then(|id| filters?.get(id));
        if let Some(filter) = filter {
            filters_info.datasource_filters.insert(
                index,
                FilterInfo {
                    filter: filter.get("filter").and_then(Value::as_str).unwrap_or_default().to_string(),
                    key_filters: filter.get("keyFilters").cloned().unwrap_or(Value::Null),
                    editable: filter.get("editable").and_then(Value::as_bool).unwrap_or(false),
                },
            );
        }
    }

    let target_ids = widget
        .pointer("/config/targetDeviceAliasIds")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (index, alias_id) in target_ids.iter().enumerate() {
        if let Some(info) = alias_info(alias_id) {
            aliases_info.target_device_aliases.insert(index, info);
        }
    }

    Ok(WidgetItem {
        widget: widget.clone(),
        aliases_info,
        filters_info,
        original_columns: original_columns(dashboard, state, layout),
        original_size: original_size(dashboard, state, layout, widget_id),
    })
}

/// Give every alias a fresh id so it can be checked and edited as a
/// dashboard alias; the slots record where each id came from.
pub fn alias_table(info: &AliasesInfo) -> (EntityAliases, Vec<(String, AliasSlot)>) {
    let mut table = EntityAliases::new();
    let mut slots = Vec::new();
    let entries = info
        .datasource_aliases
        .iter()
        .map(|(index, alias)| (AliasSlot::Datasource(*index), alias))
        .chain(
            info.target_device_aliases
                .iter()
                .map(|(index, alias)| (AliasSlot::TargetDevice(*index), alias)),
        );
    for (slot, alias) in entries {
        let id = Uuid::new_v4().to_string();
        table.insert(
            id.clone(),
            json!({"id": id, "alias": alias.alias, "filter": alias.filter}),
        );
        slots.push((id, slot));
    }
    (table, slots)
}

/// Write edited aliases from `table` back into their slots.
pub fn apply_alias_table(info: &mut AliasesInfo, table: &EntityAliases, slots: &[(String, AliasSlot)]) {
    for (id, slot) in slots {
        let Some(alias) = table.get(id) else { continue };
        let resolved = EntityAliasInfo {
            alias: alias.get("alias").and_then(Value::as_str).unwrap_or_default().to_string(),
            filter: alias.get("filter").cloned().unwrap_or(Value::Null),
        };
        match slot {
            AliasSlot::Datasource(index) => info.datasource_aliases.insert(*index, resolved),
            AliasSlot::TargetDevice(index) => info.target_device_aliases.insert(*index, resolved),
        };
    }
}

fn unique_name<'a>(taken: impl Iterator<Item = &'a str> + Clone, base: &str) -> String {
    let mut candidate = base.to_string();
    let mut counter = 0;
    while taken.clone().any(|name| name == candidate) {
        counter += 1;
        candidate = format!("{base}{counter}");
    }
    candidate
}

/// Id of an alias with the same filter, or of a newly added one.
fn entity_alias_id(aliases: &mut Map<String, Value>, info: &EntityAliasInfo) -> String {
    if let Some((id, _)) = aliases.iter().find(|(_, alias)| alias.get("filter") == Some(&info.filter)) {
        return id.clone();
    }
    let name = unique_name(
        aliases.values().filter_map(|a| a.get("alias").and_then(Value::as_str)),
        &info.alias,
    );
    let id = Uuid::new_v4().to_string();
    aliases.insert(id.clone(), json!({"id": id, "alias": name, "filter": info.filter}));
    id
}

/// Id of a filter with the same key filters, or of a newly added one.
fn filter_id(filters: &mut Map<String, Value>, info: &FilterInfo) -> String {
    if let Some((id, _)) = filters
        .iter()
        .find(|(_, filter)| filter.get("keyFilters") == Some(&info.key_filters))
    {
        return id.clone();
    }
    let name = unique_name(
        filters.values().filter_map(|f| f.get("filter").and_then(Value::as_str)),
        &info.filter,
    );
    let id = Uuid::new_v4().to_string();
    filters.insert(
        id.clone(),
        json!({"id": id, "filter": name, "keyFilters": info.key_filters, "editable": info.editable}),
    );
    id
}

/// `value[key]` as an object, replacing anything else found there.
fn object_at<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let child = &mut value[key];
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    child
}

fn take_object(value: &mut Value) -> Map<String, Value> {
    match value.take() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Store `item` at `index`, padding with nulls. Indices at or past `limit`
/// are ignored.
fn set_indexed(array: &mut Value, index: usize, item: Value, limit: usize) {
    if !array.is_array() {
        *array = Value::Array(Vec::new());
    }
    if let Some(items) = array.as_array_mut() {
        if index >= limit.max(items.len()) {
            warn!("Ignoring alias slot {index}, only {limit} expected");
            return;
        }
        if items.len() <= index {
            items.resize(index + 1, Value::Null);
        }
        items[index] = item;
    }
}

/// Set `key` on datasource `index` of `widget` when that datasource is an object.
fn set_datasource_field(widget: &mut Value, index: usize, key: &str, id: &str) {
    if let Some(datasource) = widget
        .pointer_mut(&format!("/config/datasources/{index}"))
        .and_then(Value::as_object_mut)
    {
        datasource.insert(key.to_string(), json!(id));
    }
}

/// Add `widget` to `dashboard` in `state`/`layout`, re-binding its aliases and
/// filters to the dashboard's own. Equal aliases and filters are shared.
///
/// The widget gets a fresh id, which is returned. Missing states and layouts
/// are created; the widget keeps its original size.
pub fn attach_widget(
    dashboard: &mut Value,
    state: &str,
    layout: &str,
    mut widget: Value,
    aliases_info: &AliasesInfo,
    filters_info: &FiltersInfo,
    size: Option<WidgetSize>,
) -> String {
    let configuration = object_at(dashboard, "configuration");

    let mut aliases = take_object(object_at(configuration, "entityAliases"));
    for (index, info) in &aliases_info.datasource_aliases {
        let id = entity_alias_id(&mut aliases, info);
        set_datasource_field(&mut widget, *index, "entityAliasId", &id);
    }
    let target_slots = aliases_info.target_device_aliases.len();
    for (index, info) in &aliases_info.target_device_aliases {
        let id = entity_alias_id(&mut aliases, info);
        set_indexed(
            &mut object_at(&mut widget, "config")["targetDeviceAliasIds"],
            *index,
            json!(id),
            target_slots,
        );
    }
    configuration["entityAliases"] = Value::Object(aliases);

    let mut filters = take_object(object_at(configuration, "filters"));
    for (index, info) in &filters_info.datasource_filters {
        let id = filter_id(&mut filters, info);
        set_datasource_field(&mut widget, *index, "filterId", &id);
    }
    configuration["filters"] = Value::Object(filters);

    let widget_id = Uuid::new_v4().to_string();
    widget["id"] = json!(widget_id);
    object_at(configuration, "widgets")[widget_id.as_str()] = widget;

    let states = object_at(configuration, "states");
    let is_first_state = states.as_object().is_some_and(Map::is_empty);
    let target_state = object_at(states, state);
    if target_state.get("name").is_none() {
        target_state["name"] = json!(state);
        target_state["root"] = json!(is_first_state);
    }
    let size = size.unwrap_or(DEFAULT_SIZE);
    let layout_widgets = object_at(object_at(object_at(target_state, "layouts"), layout), "widgets");
    layout_widgets[widget_id.as_str()] = json!({"sizeX": size.size_x, "sizeY": size.size_y});

    widget_id
}
