use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::{json, Map, Value};

use super::ServerArgs;
use crate::thingsboard::model::{
    BulkImportResult, ColumnMapping, EntityType, ImportEntitiesResultInfo,
};
use crate::transfer::files::export_csv;
use crate::transfer::mapping::{
    bulk_import_request, default_mappings, rows_to_entities, validate_column_mappings,
};
use crate::transfer::{
    parse_csv, BatchOptions, CsvParseConfig, Notification, Notifier, TransferError,
};

#[derive(Parser, Debug)]
pub struct BulkImportCommand {
    #[clap(value_enum)]
    pub entity_type: EntityType,
    pub input: PathBuf,
    #[clap(short, long, default_value_t = ',')]
    pub delimiter: char,
    /// The first line is data, not column names.
    #[clap(long)]
    pub no_header: bool,
    /// Update entities that already exist instead of failing on them.
    #[clap(long)]
    pub update: bool,
    /// One mapping per column, e.g. `NAME,TYPE,SERVER_ATTRIBUTE:temp`.
    /// Guessed from the header row when omitted.
    #[clap(long, value_delimiter = ',')]
    pub columns: Option<Vec<ColumnMapping>>,
    /// Create entities row by row instead of using the server-side importer.
    #[clap(long)]
    pub client_side: bool,
    /// Give up when one batch takes longer than this many seconds.
    #[clap(long)]
    pub batch_timeout: Option<u64>,
    /// Write a `;`-separated summary of the import to this file.
    #[clap(long)]
    pub report: Option<PathBuf>,
    #[clap(flatten)]
    pub server: ServerArgs,
}

/// Counts shared by both import paths.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl From<&ImportEntitiesResultInfo> for ImportSummary {
    fn from(info: &ImportEntitiesResultInfo) -> Self {
        Self {
            created: info.created(),
            updated: info.updated(),
            failed: info.failed(),
            errors: info.error_messages().into_iter().map(str::to_string).collect(),
        }
    }
}

impl From<&BulkImportResult> for ImportSummary {
    fn from(result: &BulkImportResult) -> Self {
        Self {
            created: result.created,
            updated: result.updated,
            failed: result.errors,
            errors: result.errors_list.clone(),
        }
    }
}

impl ImportSummary {
    fn report_rows(&self, entity_type: EntityType) -> Vec<Map<String, Value>> {
        let mut row = Map::new();
        row.insert("entityType".to_string(), json!(entity_type.to_string()));
        row.insert("created".to_string(), json!(self.created));
        row.insert("updated".to_string(), json!(self.updated));
        row.insert("errors".to_string(), json!(self.failed));
        row.insert("errorsList".to_string(), json!(self.errors.join("\n")));
        vec![row]
    }
}

impl BulkImportCommand {
    fn parse_config(&self) -> CsvParseConfig {
        CsvParseConfig {
            delimiter: self.delimiter,
            has_header_row: !self.no_header,
        }
    }

    /// Explicit mappings when given, otherwise one guess per header.
    fn mappings(&self, headers: &[String]) -> Vec<ColumnMapping> {
        self.columns
            .clone()
            .unwrap_or_else(|| default_mappings(headers))
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            timeout: self.batch_timeout.map(Duration::from_secs),
            ..BatchOptions::default()
        }
    }

    pub async fn run(&self) -> Result<()> {
        let text = std::fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let service = self.server.service()?;

        let prepared = parse_csv(&text, &self.parse_config()).and_then(|table| {
            let mappings = self.mappings(&table.headers);
            validate_column_mappings(&mappings, table.headers.len())?;
            Ok::<_, TransferError>((table, mappings))
        });
        let (table, mappings) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                service.notifier().notify(Notification::from(&e));
                return Err(e.into());
            }
        };
        info!(
            "📄 {} rows, columns: {}",
            table.rows.len(),
            mappings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let summary = if self.client_side {
            let entities = match rows_to_entities(&table, &mappings, self.entity_type) {
                Ok(entities) => entities,
                Err(e) => {
                    service.notifier().notify(Notification::from(&e));
                    return Err(e.into());
                }
            };
            let total = entities.len();
            let done = AtomicUsize::new(0);
            let info = service
                .import_entities(
                    &entities,
                    self.entity_type,
                    self.update,
                    &self.batch_options(),
                    || {
                        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                        eprint!("\r⏳ {finished}/{total}");
                    },
                )
                .await?;
            eprintln!();
            ImportSummary::from(&info)
        } else {
            let request = bulk_import_request(
                &text,
                mappings,
                self.delimiter,
                !self.no_header,
                self.update,
            );
            let result = service
                .bulk_import_entities(&request, self.entity_type)
                .await?;
            ImportSummary::from(&result)
        };

        println!(
            "✅ {}: {} created, {} updated, {} failed",
            self.entity_type, summary.created, summary.updated, summary.failed
        );
        for error in &summary.errors {
            println!("   ❌ {error}");
        }

        if let Some(path) = &self.report {
            let report = export_csv(&summary.report_rows(self.entity_type), "report")?;
            std::fs::write(path, &report.content)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            info!("💾 Wrote report {}", path.display());
        }
        Ok(())
    }
}
