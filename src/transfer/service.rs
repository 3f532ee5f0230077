//! Export and import of platform documents, wired to a backend client, a
//! notifier and, for dashboards and widgets, an alias editor.

use futures::future::{join_all, try_join_all};
use log::{debug, info};
use serde_json::{json, Value};

use super::aliases::{resolve_aliases, AliasEditor};
use super::batch::{import_in_batches, BatchOptions};
use super::error::{TransferError, TransferResult};
use super::files::{export_json, export_zip, normalize_file_name, ExportFile};
use super::notify::{Notification, Notifier};
use super::sanitize::{self, prepare_import, BundleMembers};
use super::validate::{fill_import_defaults, validate, EntityKind};
use super::widget::{alias_table, apply_alias_table, attach_widget, prepare_widget_item, WidgetItem};
use crate::thingsboard::model::{
    BulkImportRequest, BulkImportResult, EntityType, ImportEntitiesResultInfo, ImportEntityData,
    RuleChainType,
};
use crate::thingsboard::traits::{ProfileKind, TbClient};

const RULE_CHAIN_INPUT_NODE: &str = "org.thingsboard.rule.engine.flow.TbRuleChainInputNode";
const RULE_CHAIN_INPUT_NAME: &str = "Rule Chain Input";

const DASHBOARD_ALIASES_TITLE: &str = "dashboard.dashboard-import-missing-aliases-title";
const WIDGET_ALIASES_TITLE: &str = "dashboard.widget-import-missing-aliases-title";

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn profile_entity_kind(kind: ProfileKind) -> EntityKind {
    match kind {
        ProfileKind::Device => EntityKind::DeviceProfile,
        ProfileKind::Asset => EntityKind::AssetProfile,
        ProfileKind::Tenant => EntityKind::TenantProfile,
    }
}

/// Where an imported widget is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetTarget {
    pub dashboard_id: String,
    pub state: String,
    pub layout: String,
}

/// Give a bundled widget type its fully qualified name inside `bundle_alias`
/// unless it already has one.
pub fn prepare_widget_type(widget_type: &Value, bundle_alias: &str) -> Value {
    let mut prepared = prepare_import(widget_type);
    if text(&prepared, "fqn").is_empty() && prepared.is_object() {
        let alias = match text(&prepared, "alias") {
            "" => normalize_file_name(text(&prepared, "name")),
            alias => alias.to_string(),
        };
        prepared["fqn"] = json!(format!("{bundle_alias}.{alias}"));
    }
    prepared
}

/// Rewrite rule chain metadata written by older platform versions.
///
/// `debugMode` on nodes becomes full debug settings. Each legacy
/// `ruleChainConnections` entry becomes a rule chain input node plus a
/// connection to it; the returned pairs are `(node index, target chain id)`.
pub fn upgrade_rule_chain_metadata(metadata: &mut Value) -> Vec<(usize, String)> {
    if !metadata.is_object() {
        return Vec::new();
    }
    if let Some(nodes) = metadata.get_mut("nodes").and_then(Value::as_array_mut) {
        for node in nodes.iter_mut().filter_map(Value::as_object_mut) {
            let debug = node.shift_remove("debugMode");
            if debug.as_ref().and_then(Value::as_bool) == Some(true) {
                node.insert(
                    "debugSettings".to_string(),
                    json!({"failuresEnabled": true, "allEnabled": true}),
                );
            }
        }
    }

    let legacy = metadata
        .as_object_mut()
        .and_then(|m| m.shift_remove("ruleChainConnections"));
    let Some(Value::Array(legacy)) = legacy else {
        return Vec::new();
    };

    if !metadata["nodes"].is_array() {
        metadata["nodes"] = json!([]);
    }
    if !metadata["connections"].is_array() {
        metadata["connections"] = json!([]);
    }

    let mut inputs = Vec::new();
    for connection in legacy {
        let Some(target) = connection
            .pointer("/targetRuleChainId/id")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            continue;
        };
        let node = json!({
            "name": "",
            "singletonMode": false,
            "type": RULE_CHAIN_INPUT_NODE,
            "configuration": {"ruleChainId": target},
            "additionalInfo": connection.get("additionalInfo").cloned().unwrap_or(Value::Null),
        });
        let index = metadata["nodes"].as_array().map_or(0, Vec::len);
        let link = json!({
            "toIndex": index,
            "fromIndex": connection.get("fromIndex").cloned().unwrap_or(Value::Null),
            "type": connection.get("type").cloned().unwrap_or(Value::Null),
        });
        if let Some(nodes) = metadata["nodes"].as_array_mut() {
            nodes.push(node);
        }
        if let Some(connections) = metadata["connections"].as_array_mut() {
            connections.push(link);
        }
        inputs.push((index, target));
    }
    inputs
}

pub struct ImportExportService<C, N> {
    client: C,
    notifier: N,
}

impl<C: TbClient, N: Notifier> ImportExportService<C, N> {
    pub fn new(client: C, notifier: N) -> Self {
        Self { client, notifier }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn report<T>(&self, result: TransferResult<T>) -> TransferResult<T> {
        if let Err(e) = &result {
            self.notifier.notify(Notification::from(e));
        }
        result
    }

    fn exported(&self, kind: EntityKind, result: TransferResult<ExportFile>) -> TransferResult<ExportFile> {
        if let Err(e) = &result {
            self.notifier
                .notify(Notification::error(kind.export_failed_key(), format!("Failed to export {kind}: {e}")));
        }
        result
    }

    /// Cancellations become `Ok(None)`; everything else is reported.
    fn imported(&self, result: TransferResult<Value>) -> TransferResult<Option<Value>> {
        match result {
            Ok(saved) => Ok(Some(saved)),
            Err(e) if e.is_cancellation() => {
                info!("Import cancelled: {e}");
                Ok(None)
            }
            Err(e) => {
                self.notifier.notify(Notification::from(&e));
                Err(e)
            }
        }
    }

    fn read_import(file: Option<String>, kind: EntityKind) -> TransferResult<Value> {
        let text = file.ok_or(TransferError::NoFileSelected)?;
        let mut candidate: Value = serde_json::from_str(&text)?;
        if !validate(kind, &candidate) {
            return Err(TransferError::ValidationFailed(kind));
        }
        fill_import_defaults(kind, &mut candidate);
        Ok(candidate)
    }

    // Exports

    pub async fn export_dashboard(&self, dashboard_id: &str) -> TransferResult<ExportFile> {
        let result = async {
            let dashboard = self.client.get_dashboard(dashboard_id).await?;
            export_json(&sanitize::export_dashboard(&dashboard), text(&dashboard, "title"))
        };
        self.exported(EntityKind::Dashboard, result.await)
    }

    pub async fn export_widget(
        &self,
        dashboard_id: &str,
        state: &str,
        layout: &str,
        widget_id: &str,
    ) -> TransferResult<ExportFile> {
        let result = async {
            let dashboard = self.client.get_dashboard(dashboard_id).await?;
            let item = prepare_widget_item(&dashboard, state, layout, widget_id)?;
            let title = item
                .widget
                .pointer("/config/title")
                .and_then(Value::as_str)
                .unwrap_or("widget")
                .to_string();
            export_json(&item, &title)
        };
        self.exported(EntityKind::Widget, result.await)
    }

    pub async fn export_widget_type(&self, widget_type_id: &str) -> TransferResult<ExportFile> {
        let result = async {
            let widget_type = self.client.get_widget_type(widget_type_id).await?;
            export_json(&sanitize::export_widget_type(&widget_type), text(&widget_type, "name"))
        };
        self.exported(EntityKind::WidgetType, result.await)
    }

    /// Several widget types in one `widget_types.zip`, one JSON entry each.
    pub async fn export_widget_types(&self, widget_type_ids: &[String]) -> TransferResult<ExportFile> {
        let result = async {
            let widget_types =
                try_join_all(widget_type_ids.iter().map(|id| self.client.get_widget_type(id))).await?;
            let entries = widget_types
                .iter()
                .map(|widget_type| {
                    let name = format!("{}.json", normalize_file_name(text(widget_type, "name")));
                    Ok::<_, TransferError>((name, serde_json::to_string_pretty(&sanitize::export_widget_type(widget_type))?))
                })
                .collect::<TransferResult<Vec<_>>>()?;
            export_zip(&entries, "widget_types")
        };
        self.exported(EntityKind::WidgetType, result.await)
    }

    pub async fn export_widgets_bundle(
        &self,
        bundle_id: &str,
        include_types: bool,
    ) -> TransferResult<ExportFile> {
        let result = async {
            let bundle = self.client.get_widgets_bundle(bundle_id).await?;
            let exported = if include_types {
                let types = self.client.get_bundle_widget_types_details(bundle_id).await?;
                sanitize::export_widgets_bundle(&bundle, BundleMembers::Types(&types))
            } else {
                let fqns = self.client.get_bundle_widget_type_fqns(bundle_id).await?;
                sanitize::export_widgets_bundle(&bundle, BundleMembers::Fqns(&fqns))
            };
            export_json(&exported, text(&bundle, "title"))
        };
        self.exported(EntityKind::WidgetsBundle, result.await)
    }

    pub async fn export_rule_chain(&self, rule_chain_id: &str) -> TransferResult<ExportFile> {
        let result = async {
            let (rule_chain, metadata) = futures::try_join!(
                self.client.get_rule_chain(rule_chain_id),
                self.client.get_rule_chain_metadata(rule_chain_id)
            )?;
            export_json(
                &sanitize::export_rule_chain_import(&rule_chain, &metadata),
                text(&rule_chain, "name"),
            )
        };
        self.exported(EntityKind::RuleChain, result.await)
    }

    pub async fn export_profile(&self, kind: ProfileKind, profile_id: &str) -> TransferResult<ExportFile> {
        let result = async {
            let profile = self.client.get_profile(kind, profile_id).await?;
            export_json(&sanitize::export_profile(&profile), text(&profile, "name"))
        };
        self.exported(profile_entity_kind(kind), result.await)
    }

    pub async fn export_device_profile(&self, profile_id: &str) -> TransferResult<ExportFile> {
        self.export_profile(ProfileKind::Device, profile_id).await
    }

    pub async fn export_asset_profile(&self, profile_id: &str) -> TransferResult<ExportFile> {
        self.export_profile(ProfileKind::Asset, profile_id).await
    }

    pub async fn export_tenant_profile(&self, profile_id: &str) -> TransferResult<ExportFile> {
        self.export_profile(ProfileKind::Tenant, profile_id).await
    }

    // Imports

    /// Import a dashboard, re-resolving its entity aliases first.
    ///
    /// Unresolved aliases go to `editor`; dismissing it cancels the import
    /// and nothing is saved.
    pub async fn import_dashboard(
        &self,
        file: Option<String>,
        editor: &dyn AliasEditor,
    ) -> TransferResult<Option<Value>> {
        let result = async {
            let mut dashboard = prepare_import(&Self::read_import(file, EntityKind::Dashboard)?);
            let mut aliases = dashboard
                .pointer("/configuration/entityAliases")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            if !aliases.is_empty() {
                let widgets: Vec<Value> = match dashboard.pointer("/configuration/widgets") {
                    Some(Value::Object(widgets)) => widgets.values().cloned().collect(),
                    Some(Value::Array(widgets)) => widgets.clone(),
                    _ => Vec::new(),
                };
                if !resolve_aliases(&self.client, editor, &mut aliases, &widgets, DASHBOARD_ALIASES_TITLE)
                    .await?
                {
                    return Err(TransferError::UnresolvedAliases);
                }
                dashboard["configuration"]["entityAliases"] = Value::Object(aliases);
            }
            Ok::<_, TransferError>(self.client.save_dashboard(&dashboard).await?)
        };
        self.imported(result.await)
    }

    /// Import a single widget into an existing dashboard and save it.
    pub async fn import_widget(
        &self,
        file: Option<String>,
        target: &WidgetTarget,
        editor: &dyn AliasEditor,
    ) -> TransferResult<Option<Value>> {
        let result = async {
            let item = WidgetItem::from_import(&Self::read_import(file, EntityKind::Widget)?)?;
            let widget = prepare_import(&item.widget);
            let mut aliases_info = item.aliases_info;

            let (mut table, slots) = alias_table(&aliases_info);
            if !table.is_empty() {
                let widgets = [widget.clone()];
                if !resolve_aliases(&self.client, editor, &mut table, &widgets, WIDGET_ALIASES_TITLE).await? {
                    return Err(TransferError::UnresolvedAliases);
                }
                apply_alias_table(&mut aliases_info, &table, &slots);
            }

            let mut dashboard = self.client.get_dashboard(&target.dashboard_id).await?;
            let widget_id = attach_widget(
                &mut dashboard,
                &target.state,
                &target.layout,
                widget,
                &aliases_info,
                &item.filters_info,
                item.original_size,
            );
            debug!("Attached widget {widget_id} to dashboard {}", target.dashboard_id);
            Ok::<_, TransferError>(self.client.save_dashboard(&dashboard).await?)
        };
        self.imported(result.await)
    }

    /// Import a widget type, optionally placing it into `bundle_alias`.
    pub async fn import_widget_type(
        &self,
        file: Option<String>,
        bundle_alias: Option<&str>,
    ) -> TransferResult<Option<Value>> {
        let result = async {
            let widget_type = Self::read_import(file, EntityKind::WidgetType)?;
            let prepared = match bundle_alias {
                Some(alias) => {
                    let mut prepared = prepare_widget_type(&widget_type, alias);
                    prepared["bundleAlias"] = json!(alias);
                    prepared
                }
                None => prepare_import(&widget_type),
            };
            Ok::<_, TransferError>(self.client.save_widget_type(&prepared).await?)
        };
        self.imported(result.await)
    }

    /// Save the bundle, then its bundled widget types, then its membership.
    pub async fn import_widgets_bundle(&self, file: Option<String>) -> TransferResult<Option<Value>> {
        let result = async {
            let item = Self::read_import(file, EntityKind::WidgetsBundle)?;
            let saved = self
                .client
                .save_widgets_bundle(&prepare_import(&item["widgetsBundle"]))
                .await?;
            let bundle_alias = text(&saved, "alias");

            let types = item
                .get("widgetTypes")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let saved_types = try_join_all(types.iter().map(|widget_type| async move {
                self.client
                    .save_widget_type(&prepare_widget_type(widget_type, bundle_alias))
                    .await
            }))
            .await?;

            let mut fqns: Vec<String> = saved_types
                .iter()
                .map(|t| text(t, "fqn").to_string())
                .filter(|fqn| !fqn.is_empty())
                .collect();
            if let Some(listed) = item.get("widgetTypeFqns").and_then(Value::as_array) {
                fqns.extend(listed.iter().filter_map(Value::as_str).map(str::to_string));
            }
            if !fqns.is_empty() {
                let bundle_id = saved
                    .pointer("/id/id")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                self.client
                    .update_widgets_bundle_widget_fqns(bundle_id, &fqns)
                    .await?;
            }
            Ok::<_, TransferError>(saved)
        };
        self.imported(result.await)
    }

    /// Import a `{ruleChain, metadata}` document as a new rule chain of
    /// `expected` type, upgrading legacy metadata on the way.
    pub async fn import_rule_chain(
        &self,
        file: Option<String>,
        expected: RuleChainType,
    ) -> TransferResult<Option<Value>> {
        let result = async {
            let document = Self::read_import(file, EntityKind::RuleChain)?;
            let actual = text(&document["ruleChain"], "type");
            if actual != expected.to_string() {
                return Err(TransferError::InvalidRuleChainType {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }

            if !document["metadata"].is_object() {
                return Err(TransferError::ValidationFailed(EntityKind::RuleChain));
            }
            let rule_chain = prepare_import(&document["ruleChain"]);
            let mut metadata = document["metadata"].clone();
            let inputs = upgrade_rule_chain_metadata(&mut metadata);
            let names = join_all(inputs.iter().map(|(_, target)| async move {
                match self.client.get_rule_chain(target).await {
                    Ok(chain) => text(&chain, "name").to_string(),
                    Err(e) => {
                        debug!("Rule chain {target} not found: {e:#}");
                        RULE_CHAIN_INPUT_NAME.to_string()
                    }
                }
            }))
            .await;
            for ((index, _), name) in inputs.iter().zip(names) {
                metadata["nodes"][*index]["name"] = json!(name);
            }

            let saved = self.client.save_rule_chain(&rule_chain).await?;
            metadata["ruleChainId"] = saved.get("id").cloned().unwrap_or(Value::Null);
            let saved_metadata = self.client.save_rule_chain_metadata(&metadata).await?;
            Ok::<_, TransferError>(json!({"ruleChain": saved, "metadata": saved_metadata}))
        };
        self.imported(result.await)
    }

    pub async fn import_profile(&self, kind: ProfileKind, file: Option<String>) -> TransferResult<Option<Value>> {
        let result = async {
            let profile = Self::read_import(file, profile_entity_kind(kind))?;
            Ok::<_, TransferError>(self.client.save_profile(kind, &prepare_import(&profile)).await?)
        };
        self.imported(result.await)
    }

    pub async fn import_device_profile(&self, file: Option<String>) -> TransferResult<Option<Value>> {
        self.import_profile(ProfileKind::Device, file).await
    }

    pub async fn import_asset_profile(&self, file: Option<String>) -> TransferResult<Option<Value>> {
        self.import_profile(ProfileKind::Asset, file).await
    }

    pub async fn import_tenant_profile(&self, file: Option<String>) -> TransferResult<Option<Value>> {
        self.import_profile(ProfileKind::Tenant, file).await
    }

    /// Create or update entities row by row, in waves of `options.batch_size`.
    pub async fn import_entities(
        &self,
        rows: &[ImportEntityData],
        entity_type: EntityType,
        update: bool,
        options: &BatchOptions,
        on_completed: impl Fn(),
    ) -> TransferResult<ImportEntitiesResultInfo> {
        let client = &self.client;
        let result = async {
            let total = import_in_batches(
                rows,
                options,
                move |row| async move {
                    let info = client.save_entity_parameters(entity_type, row, update).await?;
                    Ok::<_, anyhow::Error>(serde_json::to_value(info)?)
                },
                on_completed,
            )
            .await?;
            Ok::<_, TransferError>(serde_json::from_value(total)?)
        };
        self.report(result.await)
    }

    /// Hand the whole file to the server-side importer.
    pub async fn bulk_import_entities(
        &self,
        request: &BulkImportRequest,
        entity_type: EntityType,
    ) -> TransferResult<BulkImportResult> {
        let result = self
            .client
            .bulk_import(entity_type, request)
            .await
            .map_err(TransferError::from);
        self.report(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::{anyhow, bail, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::thingsboard::model::{EntityAliases, EntityCount};
    use crate::thingsboard::traits::{
        DashboardOperations, EntityOperations, ProfileOperations, RuleChainOperations, WidgetOperations,
    };
    use crate::transfer::aliases::NonInteractiveEditor;
    use crate::transfer::files::FileType;
    use crate::transfer::notify::testing::RecordingNotifier;

    /// In-memory backend recording every save.
    #[derive(Default)]
    struct FakeClient {
        dashboards: Mutex<Vec<Value>>,
        widget_types: Mutex<Vec<Value>>,
        bundles: Mutex<Vec<Value>>,
        bundle_fqns: Mutex<Vec<(String, Vec<String>)>>,
        rule_chains: Mutex<Vec<Value>>,
        metadata: Mutex<Vec<Value>>,
        profiles: Mutex<Vec<(ProfileKind, Value)>>,
        existing: Mutex<Vec<String>>,
    }

    fn with_id(value: &Value, id: &str) -> Value {
        let mut saved = value.clone();
        saved["id"] = json!({"id": id});
        saved
    }

    #[async_trait]
    impl DashboardOperations for FakeClient {
        async fn get_dashboard(&self, dashboard_id: &str) -> Result<Value> {
            if dashboard_id != "d1" {
                bail!("404 Not Found");
            }
            Ok(json!({
                "id": {"id": "d1"},
                "title": "Plant Overview",
                "tenantId": {"id": "t"},
                "assignedCustomers": [],
                "configuration": {
                    "entityAliases": {},
                    "widgets": {"w1": {"id": "w1", "type": "static", "config": {"title": "Notes"}}},
                    "states": {"default": {"layouts": {"main": {"widgets": {"w1": {"sizeX": 4, "sizeY": 3}}}}}}
                }
            }))
        }

        async fn save_dashboard(&self, dashboard: &Value) -> Result<Value> {
            self.dashboards.lock().unwrap().push(dashboard.clone());
            Ok(with_id(dashboard, "saved-dashboard"))
        }
    }

    #[async_trait]
    impl WidgetOperations for FakeClient {
        async fn get_widget_type(&self, widget_type_id: &str) -> Result<Value> {
            Ok(json!({
                "id": {"id": widget_type_id},
                "name": format!("Gauge {widget_type_id}"),
                "bundleAlias": "charts",
                "descriptor": {}
            }))
        }

        async fn save_widget_type(&self, widget_type: &Value) -> Result<Value> {
            self.widget_types.lock().unwrap().push(widget_type.clone());
            Ok(widget_type.clone())
        }

        async fn get_widgets_bundle(&self, bundle_id: &str) -> Result<Value> {
            Ok(json!({"id": {"id": bundle_id}, "title": "Charts", "alias": "charts"}))
        }

        async fn save_widgets_bundle(&self, bundle: &Value) -> Result<Value> {
            self.bundles.lock().unwrap().push(bundle.clone());
            let mut saved = with_id(bundle, "b-new");
            saved["alias"] = json!("my_charts");
            Ok(saved)
        }

        async fn get_bundle_widget_types_details(&self, _bundle_id: &str) -> Result<Vec<Value>> {
            Ok(vec![json!({"id": {"id": "wt"}, "name": "Bars", "bundleAlias": "charts", "descriptor": {}})])
        }

        async fn get_bundle_widget_type_fqns(&self, _bundle_id: &str) -> Result<Vec<String>> {
            Ok(vec!["charts.bars".to_string()])
        }

        async fn update_widgets_bundle_widget_fqns(&self, bundle_id: &str, fqns: &[String]) -> Result<()> {
            self.bundle_fqns
                .lock()
                .unwrap()
                .push((bundle_id.to_string(), fqns.to_vec()));
            Ok(())
        }
    }

    #[async_trait]
    impl RuleChainOperations for FakeClient {
        async fn get_rule_chain(&self, rule_chain_id: &str) -> Result<Value> {
            match rule_chain_id {
                "rc-known" => Ok(json!({"id": {"id": "rc-known"}, "name": "Alarms"})),
                "rc1" => Ok(json!({"id": {"id": "rc1"}, "name": "Root", "root": true, "type": "CORE"})),
                _ => Err(anyhow!("404 Not Found")),
            }
        }

        async fn get_rule_chain_metadata(&self, rule_chain_id: &str) -> Result<Value> {
            Ok(json!({"ruleChainId": {"id": rule_chain_id}, "nodes": [], "connections": []}))
        }

        async fn save_rule_chain(&self, rule_chain: &Value) -> Result<Value> {
            self.rule_chains.lock().unwrap().push(rule_chain.clone());
            Ok(with_id(rule_chain, "rc-new"))
        }

        async fn save_rule_chain_metadata(&self, metadata: &Value) -> Result<Value> {
            self.metadata.lock().unwrap().push(metadata.clone());
            Ok(metadata.clone())
        }
    }

    #[async_trait]
    impl ProfileOperations for FakeClient {
        async fn get_profile(&self, _kind: ProfileKind, profile_id: &str) -> Result<Value> {
            Ok(json!({"id": {"id": profile_id}, "name": "Thermostat", "default": true}))
        }

        async fn save_profile(&self, kind: ProfileKind, profile: &Value) -> Result<Value> {
            self.profiles.lock().unwrap().push((kind, profile.clone()));
            Ok(with_id(profile, "p-new"))
        }
    }

    #[async_trait]
    impl EntityOperations for FakeClient {
        async fn count_entities(&self, entity_filter: &Value) -> Result<u64> {
            Ok(u64::from(entity_filter["type"] == "entityType"))
        }

        async fn save_entity_parameters(
            &self,
            _entity_type: EntityType,
            data: &ImportEntityData,
            update: bool,
        ) -> Result<ImportEntitiesResultInfo> {
            let exists = self.existing.lock().unwrap().contains(&data.name);
            if exists && !update {
                bail!("{} already exists", data.name);
            }
            let count = Some(EntityCount { entity: 1 });
            Ok(if exists {
                ImportEntitiesResultInfo { update: count, ..Default::default() }
            } else {
                ImportEntitiesResultInfo { create: count, ..Default::default() }
            })
        }

        async fn bulk_import(&self, _entity_type: EntityType, request: &BulkImportRequest) -> Result<BulkImportResult> {
            if request.file.is_empty() {
                bail!("400 Bad Request");
            }
            Ok(BulkImportResult { created: 2, ..Default::default() })
        }
    }

    fn service() -> ImportExportService<FakeClient, RecordingNotifier> {
        ImportExportService::new(FakeClient::default(), RecordingNotifier::default())
    }

    struct FixingEditor;

    #[async_trait]
    impl AliasEditor for FixingEditor {
        async fn edit_missing_aliases(
            &self,
            _widgets: &[Value],
            _title: &str,
            missing: EntityAliases,
        ) -> Result<Option<EntityAliases>> {
            Ok(Some(
                missing
                    .into_iter()
                    .map(|(id, mut alias)| {
                        alias["filter"] = json!({"type": "entityType", "entityType": "DEVICE"});
                        (id, alias)
                    })
                    .collect(),
            ))
        }
    }

    fn content(file: &ExportFile) -> Value {
        serde_json::from_slice(&file.content).unwrap()
    }

    #[tokio::test]
    async fn test_export_dashboard() {
        let file = service().export_dashboard("d1").await.unwrap();
        assert_eq!(file.file_name(), "plant_overview.json");
        let exported = content(&file);
        assert!(exported.get("id").is_none());
        assert!(exported.get("tenantId").is_none());
        assert!(exported.get("assignedCustomers").is_none());
    }

    #[tokio::test]
    async fn test_export_failure_is_reported() {
        let service = service();
        assert!(service.export_dashboard("missing").await.is_err());
        assert_eq!(service.notifier().keys(), vec!["dashboard.export-failed-error"]);
    }

    #[tokio::test]
    async fn test_export_widget() {
        let file = service().export_widget("d1", "default", "main", "w1").await.unwrap();
        assert_eq!(file.name, "notes");
        let exported = content(&file);
        assert_eq!(exported["originalColumns"], 24);
        assert_eq!(exported["widget"]["type"], "static");
        assert!(validate(EntityKind::Widget, &json!({
            "widget": {"type": "static", "typeFullFqn": "system.cards.html"},
            "aliasesInfo": exported["aliasesInfo"],
            "originalColumns": exported["originalColumns"]
        })));
    }

    #[tokio::test]
    async fn test_export_widget_types_zip() {
        let file = service()
            .export_widget_types(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(file.file_type, FileType::Zip);
        assert_eq!(file.file_name(), "widget_types.zip");
        let archive = zip::ZipArchive::new(std::io::Cursor::new(file.content)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["gauge_a.json", "gauge_b.json"]);
    }

    #[tokio::test]
    async fn test_export_widgets_bundle() {
        let service = service();
        let with_types = content(&service.export_widgets_bundle("b1", true).await.unwrap());
        assert_eq!(with_types["widgetTypes"][0]["name"], "Bars");
        assert!(with_types["widgetTypes"][0].get("bundleAlias").is_none());

        let by_reference = content(&service.export_widgets_bundle("b1", false).await.unwrap());
        assert_eq!(by_reference["widgetTypeFqns"], json!(["charts.bars"]));
        assert!(by_reference["widgetsBundle"].get("id").is_none());
    }

    #[tokio::test]
    async fn test_export_rule_chain_and_profile() {
        let service = service();
        let chain = content(&service.export_rule_chain("rc1").await.unwrap());
        assert_eq!(chain["ruleChain"]["root"], false);
        assert!(chain["metadata"].get("ruleChainId").is_none());

        let profile = service.export_device_profile("p1").await.unwrap();
        assert_eq!(profile.file_name(), "thermostat.json");
        assert_eq!(content(&profile)["default"], false);
    }

    #[tokio::test]
    async fn test_import_without_file_is_cancelled() {
        let service = service();
        assert_eq!(service.import_device_profile(None).await.unwrap(), None);
        assert!(service.notifier().keys().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_file_is_reported() {
        let service = service();
        let result = service
            .import_tenant_profile(Some(r#"{"name": "t", "profileData": {}}"#.to_string()))
            .await;
        assert!(matches!(result, Err(TransferError::ValidationFailed(EntityKind::TenantProfile))));
        assert_eq!(
            service.notifier().keys(),
            vec!["tenant-profile.invalid-tenant-profile-file-error"]
        );
        assert!(service.client().profiles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_profile_drops_external_id() {
        let service = service();
        let saved = service
            .import_asset_profile(Some(r#"{"name": "pump", "externalId": {"id": "x"}}"#.to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved["id"]["id"], "p-new");
        let profiles = service.client().profiles.lock().unwrap();
        assert_eq!(profiles[0].0, ProfileKind::Asset);
        assert!(profiles[0].1.get("externalId").is_none());
    }

    fn dashboard_file(filter: Value) -> Option<String> {
        Some(
            json!({
                "title": "Imported",
                "configuration": {
                    "entityAliases": {"a1": {"id": "a1", "alias": "pumps", "filter": filter}},
                    "widgets": {}
                }
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_import_dashboard_with_resolved_aliases() {
        let service = service();
        let saved = service
            .import_dashboard(dashboard_file(json!({"type": "entityType"})), &NonInteractiveEditor)
            .await
            .unwrap();
        assert!(saved.is_some());
        assert_eq!(service.client().dashboards.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dismissed_alias_editor_saves_nothing() {
        let service = service();
        let saved = service
            .import_dashboard(dashboard_file(json!({"type": "entityList", "entityList": []})), &NonInteractiveEditor)
            .await
            .unwrap();
        assert_eq!(saved, None);
        assert!(service.client().dashboards.lock().unwrap().is_empty());
        assert!(service.notifier().keys().is_empty());
    }

    #[tokio::test]
    async fn test_edited_aliases_are_saved() {
        let service = service();
        service
            .import_dashboard(dashboard_file(Value::Null), &FixingEditor)
            .await
            .unwrap()
            .unwrap();
        let saved = &service.client().dashboards.lock().unwrap()[0];
        assert_eq!(saved["configuration"]["entityAliases"]["a1"]["filter"]["type"], "entityType");
        assert_eq!(saved["configuration"]["entityAliases"]["a1"]["alias"], "pumps");
    }

    #[tokio::test]
    async fn test_import_widget_into_dashboard() {
        let service = service();
        let file = json!({
            "widget": {
                "type": "latest",
                "typeFullFqn": "system.cards.value",
                "config": {"datasources": [{"type": "entity"}]}
            },
            "aliasesInfo": {"datasourceAliases": {"0": {"aliasName": "pump", "deviceId": "dev-1"}}},
            "originalColumns": 24,
            "originalSize": {"sizeX": 5, "sizeY": 3}
        });
        let target = WidgetTarget {
            dashboard_id: "d1".to_string(),
            state: "default".to_string(),
            layout: "main".to_string(),
        };
        service
            .import_widget(Some(file.to_string()), &target, &FixingEditor)
            .await
            .unwrap()
            .unwrap();

        let saved = &service.client().dashboards.lock().unwrap()[0];
        let configuration = &saved["configuration"];
        let widgets = configuration["widgets"].as_object().unwrap();
        assert_eq!(widgets.len(), 2);
        let (id, widget) = widgets.iter().find(|(id, _)| id.as_str() != "w1").unwrap();
        let alias_id = widget["config"]["datasources"][0]["entityAliasId"].as_str().unwrap();
        assert_eq!(configuration["entityAliases"][alias_id]["alias"], "pump");
        assert_eq!(configuration["entityAliases"][alias_id]["filter"]["type"], "entityType");
        assert_eq!(
            configuration["states"]["default"]["layouts"]["main"]["widgets"][id.as_str()],
            json!({"sizeX": 5.0, "sizeY": 3.0})
        );
    }

    #[tokio::test]
    async fn test_dismissed_alias_editor_cancels_widget_import() {
        let service = service();
        let file = json!({
            "widget": {
                "type": "latest",
                "typeFullFqn": "system.cards.value",
                "config": {"datasources": [{"type": "entity"}]}
            },
            "aliasesInfo": {"datasourceAliases": {"0": {"aliasName": "pump", "deviceId": "gone"}}},
            "originalColumns": 24
        });
        let target = WidgetTarget {
            dashboard_id: "d1".to_string(),
            state: "default".to_string(),
            layout: "main".to_string(),
        };
        let saved = service
            .import_widget(Some(file.to_string()), &target, &NonInteractiveEditor)
            .await
            .unwrap();
        assert_eq!(saved, None);
        assert!(service.client().dashboards.lock().unwrap().is_empty());
        assert!(service.notifier().keys().is_empty());
    }

    #[tokio::test]
    async fn test_import_widget_type_into_bundle() {
        let service = service();
        service
            .import_widget_type(
                Some(r#"{"name": "Big Gauge", "descriptor": {}}"#.to_string()),
                Some("charts"),
            )
            .await
            .unwrap();
        let saved = &service.client().widget_types.lock().unwrap()[0];
        assert_eq!(saved["fqn"], "charts.big_gauge");
        assert_eq!(saved["bundleAlias"], "charts");
    }

    #[tokio::test]
    async fn test_import_widgets_bundle() {
        let service = service();
        let file = json!({
            "widgetsBundle": {"title": "Charts", "externalId": {"id": "e"}},
            "widgetTypes": [
                {"name": "Line Chart", "descriptor": {}},
                {"name": "Bars", "alias": "bars", "descriptor": {}},
                {"name": "Pie", "fqn": "system.pie", "descriptor": {}}
            ],
            "widgetTypeFqns": ["system.gauge"]
        });
        let saved = service
            .import_widgets_bundle(Some(file.to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved["id"]["id"], "b-new");
        assert!(service.client().bundles.lock().unwrap()[0].get("externalId").is_none());

        let memberships = service.client().bundle_fqns.lock().unwrap();
        assert_eq!(memberships[0].0, "b-new");
        assert_eq!(
            memberships[0].1,
            vec!["my_charts.line_chart", "my_charts.bars", "system.pie", "system.gauge"]
        );
    }

    #[test]
    fn test_upgrade_rule_chain_metadata() {
        let mut metadata = json!({
            "nodes": [
                {"name": "filter", "debugMode": true},
                {"name": "save", "debugMode": false}
            ],
            "connections": [{"fromIndex": 0, "toIndex": 1, "type": "True"}],
            "ruleChainConnections": [
                {"fromIndex": 1, "targetRuleChainId": {"id": "rc-known"}, "type": "Success", "additionalInfo": {"layoutX": 10}},
                {"fromIndex": 1, "type": "Failure"}
            ]
        });
        let inputs = upgrade_rule_chain_metadata(&mut metadata);

        assert_eq!(inputs, vec![(2, "rc-known".to_string())]);
        assert_eq!(metadata["nodes"][0]["debugSettings"], json!({"failuresEnabled": true, "allEnabled": true}));
        assert!(metadata["nodes"][0].get("debugMode").is_none());
        assert!(metadata["nodes"][1].get("debugMode").is_none());
        assert!(metadata["nodes"][1].get("debugSettings").is_none());
        assert_eq!(metadata["nodes"][2]["type"], RULE_CHAIN_INPUT_NODE);
        assert_eq!(metadata["nodes"][2]["configuration"]["ruleChainId"], "rc-known");
        assert_eq!(metadata["connections"][1], json!({"toIndex": 2, "fromIndex": 1, "type": "Success"}));
        assert!(metadata.get("ruleChainConnections").is_none());
    }

    #[tokio::test]
    async fn test_import_rule_chain() {
        let service = service();
        let file = json!({
            "ruleChain": {"name": "Imported", "root": false},
            "metadata": {
                "nodes": [{"name": "n"}],
                "connections": [],
                "ruleChainConnections": [
                    {"fromIndex": 0, "targetRuleChainId": {"id": "rc-known"}, "type": "Success"},
                    {"fromIndex": 0, "targetRuleChainId": {"id": "rc-gone"}, "type": "Failure"}
                ]
            }
        });
        let saved = service
            .import_rule_chain(Some(file.to_string()), RuleChainType::Core)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(saved["ruleChain"]["id"]["id"], "rc-new");
        assert_eq!(service.client().rule_chains.lock().unwrap()[0]["type"], "CORE");
        let metadata = &service.client().metadata.lock().unwrap()[0];
        assert_eq!(metadata["ruleChainId"], json!({"id": "rc-new"}));
        assert_eq!(metadata["nodes"][1]["name"], "Alarms");
        assert_eq!(metadata["nodes"][2]["name"], RULE_CHAIN_INPUT_NAME);
    }

    #[tokio::test]
    async fn test_rule_chain_type_mismatch() {
        let service = service();
        let file = json!({"ruleChain": {"name": "Edge", "type": "EDGE"}, "metadata": {}});
        let result = service
            .import_rule_chain(Some(file.to_string()), RuleChainType::Core)
            .await;
        assert!(matches!(result, Err(TransferError::InvalidRuleChainType { .. })));
        assert_eq!(service.notifier().keys(), vec!["rulechain.invalid-rulechain-type-error"]);
        assert!(service.client().rule_chains.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_entities() {
        let service = service();
        service.client().existing.lock().unwrap().push("d2".to_string());
        let rows: Vec<ImportEntityData> = ["d1", "d2", "d3"]
            .iter()
            .map(|name| ImportEntityData {
                name: (*name).to_string(),
                entity_type: "default".to_string(),
                ..Default::default()
            })
            .collect();

        let summary = service
            .import_entities(&rows, EntityType::Device, false, &BatchOptions::default(), || {})
            .await
            .unwrap();
        assert_eq!(summary.created(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.error_messages(), vec!["d2 already exists"]);

        let summary = service
            .import_entities(&rows, EntityType::Device, true, &BatchOptions::default(), || {})
            .await
            .unwrap();
        assert_eq!(summary.updated(), 1);
        assert_eq!(summary.failed(), 0);
    }

    #[tokio::test]
    async fn test_bulk_import_failure_is_reported() {
        let service = service();
        let request = crate::transfer::mapping::bulk_import_request("", Vec::new(), ',', true, false);
        assert!(service.bulk_import_entities(&request, EntityType::Asset).await.is_err());
        assert_eq!(service.notifier().keys(), vec!["action.operation-failed"]);
    }
}
