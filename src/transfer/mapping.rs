use std::collections::HashSet;

use serde_json::Value;

use super::csv::{CellValue, CsvParseResult};
use super::error::{TransferError, TransferResult};
use crate::thingsboard::model::{
    BulkImportColumnType, BulkImportMapping, BulkImportRequest, ColumnMapping, EntityType,
    ImportEntityData, KeyValue,
};

const DEFAULT_ENTITY_TYPE: &str = "default";

/// Column roles the per-row import can express; credentials and protocol
/// settings need the server-side bulk importer.
fn supported_client_side(column_type: BulkImportColumnType) -> bool {
    matches!(
        column_type,
        BulkImportColumnType::Name
            | BulkImportColumnType::Type
            | BulkImportColumnType::Label
            | BulkImportColumnType::Description
            | BulkImportColumnType::IsGateway
            | BulkImportColumnType::AccessToken
            | BulkImportColumnType::ServerAttribute
            | BulkImportColumnType::SharedAttribute
            | BulkImportColumnType::Timeseries
    )
}

/// Guessed mapping for every header, see [`ColumnMapping::guess`].
pub fn default_mappings(headers: &[String]) -> Vec<ColumnMapping> {
    headers.iter().map(|h| ColumnMapping::guess(h)).collect()
}

pub fn validate_column_mappings(
    mappings: &[ColumnMapping],
    header_count: usize,
) -> TransferResult<()> {
    if mappings.len() != header_count {
        return Err(TransferError::InvalidColumnMapping(format!(
            "{} column mappings for {header_count} columns",
            mappings.len()
        )));
    }

    let names = mappings
        .iter()
        .filter(|m| m.column_type == BulkImportColumnType::Name)
        .count();
    if names != 1 {
        return Err(TransferError::InvalidColumnMapping(format!(
            "exactly one NAME column is required, found {names}"
        )));
    }

    let mut seen = HashSet::new();
    for mapping in mappings {
        let key = mapping.key.as_deref().filter(|k| !k.trim().is_empty());
        if mapping.column_type.requires_key() && key.is_none() {
            return Err(TransferError::InvalidColumnMapping(format!(
                "{} column needs a key",
                mapping.column_type
            )));
        }
        let identity = if mapping.column_type.requires_key() {
            (mapping.column_type, key.map(str::to_string))
        } else {
            (mapping.column_type, None)
        };
        if !seen.insert(identity) {
            return Err(TransferError::InvalidColumnMapping(format!(
                "duplicate {mapping} column"
            )));
        }
    }
    Ok(())
}

/// Rejects mappings the per-row import cannot honour.
pub fn check_client_side(mappings: &[ColumnMapping], entity_type: EntityType) -> TransferResult<()> {
    for mapping in mappings {
        if !supported_client_side(mapping.column_type) {
            return Err(TransferError::InvalidColumnMapping(format!(
                "{} columns require server-side bulk import",
                mapping.column_type
            )));
        }
        let device_only = matches!(
            mapping.column_type,
            BulkImportColumnType::SharedAttribute | BulkImportColumnType::AccessToken
        );
        if device_only && !entity_type.supports_shared_attributes() {
            return Err(TransferError::InvalidColumnMapping(format!(
                "{} columns are only valid for devices",
                mapping.column_type
            )));
        }
    }
    Ok(())
}

fn cell_text(cell: &CellValue) -> String {
    cell.to_string()
}

fn key_value(mapping: &ColumnMapping, cell: &CellValue) -> KeyValue {
    KeyValue {
        key: mapping.key.clone().unwrap_or_default(),
        value: Value::from(cell.clone()),
    }
}

/// Convert one parsed row into the entity fields it describes.
pub fn row_to_entity(row: &[CellValue], mappings: &[ColumnMapping]) -> ImportEntityData {
    let mut data = ImportEntityData {
        entity_type: DEFAULT_ENTITY_TYPE.to_string(),
        ..Default::default()
    };
    for (mapping, cell) in mappings.iter().zip(row) {
        match mapping.column_type {
            BulkImportColumnType::Name => data.name = cell_text(cell),
            BulkImportColumnType::Type => {
                if *cell != CellValue::Null {
                    data.entity_type = cell_text(cell);
                }
            }
            BulkImportColumnType::Label => data.label = cell_text(cell),
            BulkImportColumnType::Description => data.description = cell_text(cell),
            BulkImportColumnType::IsGateway => {
                data.gateway = match cell {
                    CellValue::Boolean(flag) => Some(*flag),
                    CellValue::Null => None,
                    other => Some(cell_text(other).eq_ignore_ascii_case("true")),
                }
            }
            BulkImportColumnType::AccessToken => {
                data.access_token = Some(cell_text(cell)).filter(|t| !t.is_empty());
            }
            BulkImportColumnType::ServerAttribute if *cell != CellValue::Null => {
                data.attributes.server.push(key_value(mapping, cell));
            }
            BulkImportColumnType::SharedAttribute if *cell != CellValue::Null => {
                data.attributes.shared.push(key_value(mapping, cell));
            }
            BulkImportColumnType::Timeseries if *cell != CellValue::Null => {
                data.timeseries.push(key_value(mapping, cell));
            }
            _ => {}
        }
    }
    data
}

/// Validate `mappings` against the parsed table and convert every row.
pub fn rows_to_entities(
    table: &CsvParseResult,
    mappings: &[ColumnMapping],
    entity_type: EntityType,
) -> TransferResult<Vec<ImportEntityData>> {
    validate_column_mappings(mappings, table.headers.len())?;
    check_client_side(mappings, entity_type)?;
    Ok(table
        .rows
        .iter()
        .map(|row| row_to_entity(row, mappings))
        .collect())
}

/// Server-side bulk import request for the raw file.
pub fn bulk_import_request(
    file: &str,
    mappings: Vec<ColumnMapping>,
    delimiter: char,
    header: bool,
    update: bool,
) -> BulkImportRequest {
    BulkImportRequest {
        file: file.to_string(),
        mapping: BulkImportMapping {
            columns: mappings,
            delimiter,
            header,
            update,
        },
    }
}
