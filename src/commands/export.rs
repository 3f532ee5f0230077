use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use super::ServerArgs;
use crate::transfer::EntityKind;

#[derive(Parser, Debug)]
pub struct ExportCommand {
    #[clap(value_enum)]
    pub kind: EntityKind,
    /// Entity id; for widgets the id of the dashboard holding it. Several
    /// widget type ids are exported together as one ZIP archive.
    #[clap(required = true)]
    pub ids: Vec<String>,
    #[clap(short, long, default_value = ".")]
    pub output: PathBuf,
    /// Embed full widget type documents in a widgets bundle export.
    #[clap(long)]
    pub include_types: bool,
    #[clap(long)]
    pub state: Option<String>,
    #[clap(long)]
    pub layout: Option<String>,
    #[clap(long)]
    pub widget: Option<String>,
    #[clap(flatten)]
    pub server: ServerArgs,
}

impl ExportCommand {
    pub async fn run(&self) -> Result<()> {
        if self.ids.len() > 1 && self.kind != EntityKind::WidgetType {
            bail!("Only widget types can be exported several at a time");
        }
        let service = self.server.service()?;
        let id = self.ids[0].as_str();

        let file = match self.kind {
            EntityKind::Dashboard => service.export_dashboard(id).await?,
            EntityKind::Widget => {
                let (Some(state), Some(layout), Some(widget)) =
                    (&self.state, &self.layout, &self.widget)
                else {
                    bail!("Exporting a widget needs --state, --layout and --widget");
                };
                service.export_widget(id, state, layout, widget).await?
            }
            EntityKind::WidgetType if self.ids.len() > 1 => {
                service.export_widget_types(&self.ids).await?
            }
            EntityKind::WidgetType => service.export_widget_type(id).await?,
            EntityKind::WidgetsBundle => {
                service
                    .export_widgets_bundle(id, self.include_types)
                    .await?
            }
            EntityKind::RuleChain => service.export_rule_chain(id).await?,
            EntityKind::DeviceProfile => service.export_device_profile(id).await?,
            EntityKind::AssetProfile => service.export_asset_profile(id).await?,
            EntityKind::TenantProfile => service.export_tenant_profile(id).await?,
        };

        let path = file.write_to(&self.output)?;
        println!("✅ Exported {} to {}", self.kind, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_widget_export() {
        let cmd = ExportCommand::try_parse_from([
            "export", "widget", "dash-1", "--state", "default", "--layout", "main", "--widget",
            "w-1", "-o", "out", "-s", "prod",
        ])
        .unwrap();
        assert_eq!(cmd.kind, EntityKind::Widget);
        assert_eq!(cmd.ids, vec!["dash-1"]);
        assert_eq!(cmd.output, PathBuf::from("out"));
        assert_eq!(cmd.server.server.as_deref(), Some("prod"));
        assert_eq!(cmd.widget.as_deref(), Some("w-1"));
    }

    #[test]
    fn test_kind_names() {
        let cmd = ExportCommand::try_parse_from(["export", "widgets-bundle", "b-1", "--include-types"])
            .unwrap();
        assert_eq!(cmd.kind, EntityKind::WidgetsBundle);
        assert!(cmd.include_types);
        assert_eq!(cmd.output, PathBuf::from("."));

        assert!(ExportCommand::try_parse_from(["export", "dashboard"]).is_err());
    }

    #[tokio::test]
    async fn test_several_ids_only_for_widget_types() {
        let cmd = ExportCommand::try_parse_from(["export", "dashboard", "a", "b"]).unwrap();
        let err = cmd.run().await.unwrap_err();
        assert!(err.to_string().contains("widget types"));
    }
}
