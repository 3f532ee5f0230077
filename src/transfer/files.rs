//! Export file rendering: pretty JSON, ZIP archives and `;`-separated CSV.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::info;
use csv::{Terminator, WriterBuilder};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::TransferResult;

static NOT_FILE_SAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("file-safe pattern is valid"));

const CSV_SEPARATOR: u8 = b';';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    Zip,
    Csv,
}

impl FileType {
    pub fn mime_type(self) -> &'static str {
        match self {
            FileType::Json => "text/json",
            FileType::Zip => "application/zip",
            FileType::Csv => "text/csv",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileType::Json => "json",
            FileType::Zip => "zip",
            FileType::Csv => "csv",
        }
    }
}

/// A rendered export, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Normalized name without extension.
    pub name: String,
    pub file_type: FileType,
    pub content: Vec<u8>,
}

impl ExportFile {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.file_type.extension())
    }

    /// Write into `dir`, creating it when needed, and return the file path.
    pub fn write_to(&self, dir: &Path) -> TransferResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.content)?;
        info!(
            "💾 Wrote {} ({}, {} bytes)",
            path.display(),
            self.file_type.mime_type(),
            self.content.len()
        );
        Ok(path)
    }
}

/// Lower-case `name` with every non-word character replaced by `_`.
pub fn normalize_file_name(name: &str) -> String {
    let normalized = NOT_FILE_SAFE.replace_all(&name.to_lowercase(), "_").into_owned();
    if normalized.is_empty() {
        "download".to_string()
    } else {
        normalized
    }
}

pub fn export_json<T: Serialize>(data: &T, name: &str) -> TransferResult<ExportFile> {
    Ok(ExportFile {
        name: normalize_file_name(name),
        file_type: FileType::Json,
        content: serde_json::to_vec_pretty(data)?,
    })
}

/// One deflated entry per `(entry name, content)` pair, in the given order.
pub fn export_zip(entries: &[(String, String)], name: &str) -> TransferResult<ExportFile> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (entry, content) in entries {
        writer.start_file(entry.as_str(), options)?;
        writer.write_all(content.as_bytes())?;
    }
    let content = writer.finish()?.into_inner();
    Ok(ExportFile {
        name: normalize_file_name(name),
        file_type: FileType::Zip,
        content,
    })
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Columns come from the first row's keys; later rows are read by those keys.
pub fn export_csv(rows: &[Map<String, Value>], name: &str) -> TransferResult<ExportFile> {
    let mut writer = WriterBuilder::new()
        .delimiter(CSV_SEPARATOR)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    if let Some(first) = rows.first() {
        let columns: Vec<&String> = first.keys().collect();
        writer.write_record(&columns)?;
        for row in rows {
            writer.write_record(
                columns
                    .iter()
                    .map(|c| row.get(c.as_str()).map(csv_cell).unwrap_or_default()),
            )?;
        }
    }
    let content = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(ExportFile {
        name: normalize_file_name(name),
        file_type: FileType::Csv,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(normalize_file_name("Plant Overview #2"), "plant_overview__2");
        assert_eq!(normalize_file_name("charts.bars"), "charts_bars");
        assert_eq!(normalize_file_name(""), "download");
        assert_eq!(normalize_file_name("Café"), "caf_");
        assert_eq!(normalize_file_name("Насос"), "_____");
    }

    #[test]
    fn test_json_is_pretty_printed() {
        let file = export_json(&json!({"title": "Plant", "configuration": {}}), "Plant").unwrap();
        assert_eq!(file.file_name(), "plant.json");
        assert_eq!(
            String::from_utf8(file.content).unwrap(),
            "{\n  \"title\": \"Plant\",\n  \"configuration\": {}\n}"
        );
    }

    #[test]
    fn test_zip_entries() {
        let file = export_zip(
            &[
                ("gauge.json".to_string(), "{}".to_string()),
                ("bars.json".to_string(), "[1]".to_string()),
            ],
            "widget_types",
        )
        .unwrap();
        assert_eq!(file.file_name(), "widget_types.zip");

        let mut archive = zip::ZipArchive::new(Cursor::new(file.content)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("bars.json")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "[1]");
    }

    #[test]
    fn test_csv_quoting() {
        let rows: Vec<Map<String, Value>> = vec![
            json!({"name": "d1", "errors": "a;b", "count": 2}),
            json!({"name": "say \"hi\"", "errors": null, "count": 0}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();
        let file = export_csv(&rows, "report").unwrap();
        assert_eq!(file.file_type.mime_type(), "text/csv");
        assert_eq!(
            String::from_utf8(file.content).unwrap(),
            "name;errors;count\nd1;\"a;b\";2\n\"say \"\"hi\"\"\";;0\n"
        );
    }

    #[test]
    fn test_csv_line_breaks_stay_in_one_cell() {
        let rows = vec![json!({"name": "d1", "errors": "a\rb\nc"})
            .as_object()
            .unwrap()
            .clone()];
        let file = export_csv(&rows, "report").unwrap();
        assert_eq!(
            String::from_utf8(file.content).unwrap(),
            "name;errors\nd1;\"a\rb\nc\"\n"
        );
    }

    #[test]
    fn test_write_to_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let file = export_json(&json!({"name": "p"}), "Pump Profile").unwrap();
        let path = file.write_to(&target).unwrap();
        assert_eq!(path, target.join("pump_profile.json"));
        assert_eq!(std::fs::read(path).unwrap(), file.content);
    }
}
