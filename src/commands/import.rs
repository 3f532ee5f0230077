use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use inquire::Select;
use log::info;
use serde_json::{json, Value};

use super::ServerArgs;
use crate::thingsboard::model::{EntityAlias, EntityAliases, RuleChainType};
use crate::transfer::{AliasEditor, EntityKind, NonInteractiveEditor, WidgetTarget};

const ALIAS_ENTITY_TYPES: [&str; 7] = [
    "DEVICE",
    "ASSET",
    "ENTITY_VIEW",
    "EDGE",
    "CUSTOMER",
    "DASHBOARD",
    "USER",
];

#[derive(Parser, Debug)]
pub struct ImportCommand {
    #[clap(value_enum)]
    pub kind: EntityKind,
    pub input: PathBuf,
    /// Target dashboard for a widget import.
    #[clap(long)]
    pub dashboard: Option<String>,
    #[clap(long, default_value = "default")]
    pub state: String,
    #[clap(long, default_value = "main")]
    pub layout: String,
    /// Place an imported widget type into this bundle.
    #[clap(long)]
    pub bundle_alias: Option<String>,
    #[clap(long, value_enum, ignore_case = true, default_value_t = RuleChainType::Core)]
    pub rule_chain_type: RuleChainType,
    /// Cancel instead of prompting when aliases do not resolve.
    #[clap(long)]
    pub non_interactive: bool,
    #[clap(flatten)]
    pub server: ServerArgs,
}

impl ImportCommand {
    pub async fn run(&self) -> Result<()> {
        let file = std::fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let file = Some(file);
        let editor: &dyn AliasEditor = if self.non_interactive {
            &NonInteractiveEditor
        } else {
            &InquireAliasEditor
        };
        let service = self.server.service()?;

        let saved = match self.kind {
            EntityKind::Dashboard => service.import_dashboard(file, editor).await?,
            EntityKind::Widget => {
                let Some(dashboard_id) = &self.dashboard else {
                    bail!("Importing a widget needs --dashboard");
                };
                let target = WidgetTarget {
                    dashboard_id: dashboard_id.clone(),
                    state: self.state.clone(),
                    layout: self.layout.clone(),
                };
                service.import_widget(file, &target, editor).await?
            }
            EntityKind::WidgetType => {
                service
                    .import_widget_type(file, self.bundle_alias.as_deref())
                    .await?
            }
            EntityKind::WidgetsBundle => service.import_widgets_bundle(file).await?,
            EntityKind::RuleChain => {
                service
                    .import_rule_chain(file, self.rule_chain_type)
                    .await?
            }
            EntityKind::DeviceProfile => service.import_device_profile(file).await?,
            EntityKind::AssetProfile => service.import_asset_profile(file).await?,
            EntityKind::TenantProfile => service.import_tenant_profile(file).await?,
        };

        match saved {
            Some(saved) => {
                let id = saved
                    .pointer("/id/id")
                    .or_else(|| saved.pointer("/ruleChain/id/id"))
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                println!("✅ Imported {} ({id})", self.kind);
            }
            None => println!("🚫 Import of {} cancelled", self.kind),
        }
        Ok(())
    }
}

/// Prompts for a replacement entity list per unresolved alias.
pub struct InquireAliasEditor;

#[async_trait]
impl AliasEditor for InquireAliasEditor {
    async fn edit_missing_aliases(
        &self,
        widgets: &[Value],
        title: &str,
        missing: EntityAliases,
    ) -> Result<Option<EntityAliases>> {
        tokio::task::block_in_place(|| prompt_aliases(widgets, title, missing))
    }
}

fn prompt_aliases(
    widgets: &[Value],
    title: &str,
    missing: EntityAliases,
) -> Result<Option<EntityAliases>> {
    println!("\n⚠️ {title}");
    println!("   Leave the id list empty to cancel the import.\n");

    let mut edited = EntityAliases::new();
    for (id, alias) in missing {
        let alias: EntityAlias = serde_json::from_value(alias)?;
        println!(
            "🔗 Alias '{}' is used by {} widget(s)",
            alias.alias,
            widgets_using(widgets, &id)
        );
        let entity_type = Select::new("entity type", ALIAS_ENTITY_TYPES.to_vec()).prompt()?;
        let ids = inquire::Text::new("entity ids (comma separated)").prompt()?;
        let Some(filter) = entity_list_filter(entity_type, &ids) else {
            info!("Alias editing cancelled at '{}'", alias.alias);
            return Ok(None);
        };
        let fixed = EntityAlias { filter, ..alias };
        edited.insert(id, serde_json::to_value(fixed)?);
    }
    Ok(Some(edited))
}

/// `entityList` filter over `ids`; `None` when no id was given.
fn entity_list_filter(entity_type: &str, ids: &str) -> Option<Value> {
    let ids: Vec<&str> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return None;
    }
    Some(json!({
        "type": "entityList",
        "resolveMultiple": ids.len() > 1,
        "entityType": entity_type,
        "entityList": ids,
    }))
}

fn widgets_using(widgets: &[Value], alias_id: &str) -> usize {
    widgets
        .iter()
        .filter(|widget| {
            let datasources = widget
                .pointer("/config/datasources")
                .and_then(Value::as_array)
                .into_iter()
                .flatten();
            let target_aliases = widget
                .pointer("/config/targetDeviceAliasIds")
                .and_then(Value::as_array)
                .into_iter()
                .flatten();
            datasources
                .filter_map(|ds| ds.get("entityAliasId"))
                .chain(target_aliases)
                .any(|id| id.as_str() == Some(alias_id))
        })
        .count()
}
