pub mod aliases;
pub mod batch;
pub mod csv;
pub mod error;
pub mod files;
pub mod mapping;
pub mod notify;
pub mod sanitize;
pub mod service;
pub mod summary;
pub mod validate;
pub mod widget;

pub use aliases::{AliasEditor, NonInteractiveEditor};
pub use batch::BatchOptions;
pub use csv::{parse_csv, CellValue, CsvParseConfig, CsvParseResult};
pub use error::{TransferError, TransferResult};
pub use files::ExportFile;
pub use notify::{ConsoleNotifier, Notification, Notifier};
pub use service::{ImportExportService, WidgetTarget};
pub use validate::EntityKind;
