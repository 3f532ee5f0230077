use thiserror::Error;

use super::validate::EntityKind;

/// Everything that can abort an import or export.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("CSV file must have at least two columns")]
    TooFewColumns,
    #[error("Invalid CSV format at line {line}: field count does not match the header")]
    RowShapeMismatch { line: usize },
    #[error("Invalid {0} file")]
    ValidationFailed(EntityKind),
    #[error("Invalid rule chain type: expected {expected}, got {actual}")]
    InvalidRuleChainType { expected: String, actual: String },
    #[error("Import cancelled: entity aliases were left unresolved")]
    UnresolvedAliases,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Invalid column mapping: {0}")]
    InvalidColumnMapping(String),
    #[error("Import batch {batch} timed out")]
    BatchTimedOut { batch: usize },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{0:#}")]
    Backend(#[from] anyhow::Error),
}

impl TransferError {
    /// Translation key of the user-facing notification for this error.
    pub fn message_key(&self) -> &'static str {
        match self {
            TransferError::TooFewColumns => "import.import-csv-number-columns-error",
            TransferError::RowShapeMismatch { .. } => "import.import-csv-invalid-format-error",
            TransferError::ValidationFailed(kind) => kind.invalid_file_key(),
            TransferError::InvalidRuleChainType { .. } => "rulechain.invalid-rulechain-type-error",
            TransferError::UnresolvedAliases => "entity.unresolved-aliases",
            TransferError::NoFileSelected => "import.no-file",
            TransferError::InvalidColumnMapping(_) => "import.column-type.invalid-mapping",
            TransferError::BatchTimedOut { .. } => "import.batch-timeout",
            TransferError::Json(_) => "import.invalid-json",
            TransferError::Io(_) | TransferError::Zip(_) | TransferError::Csv(_) => {
                "export.write-failed"
            }
            TransferError::Backend(_) => "action.operation-failed",
        }
    }

    /// Cancellations end an import quietly instead of being reported as failures.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            TransferError::NoFileSelected | TransferError::UnresolvedAliases
        )
    }
}

pub type TransferResult<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keys() {
        assert_eq!(
            TransferError::RowShapeMismatch { line: 3 }.message_key(),
            "import.import-csv-invalid-format-error"
        );
        assert_eq!(
            TransferError::ValidationFailed(EntityKind::Dashboard).message_key(),
            "dashboard.invalid-dashboard-file-error"
        );
        assert_eq!(
            TransferError::RowShapeMismatch { line: 3 }.to_string(),
            "Invalid CSV format at line 3: field count does not match the header"
        );
    }

    #[test]
    fn test_cancellations() {
        assert!(TransferError::NoFileSelected.is_cancellation());
        assert!(TransferError::UnresolvedAliases.is_cancellation());
        assert!(!TransferError::TooFewColumns.is_cancellation());
        assert!(!TransferError::Backend(anyhow::anyhow!("boom")).is_cancellation());
    }

    #[test]
    fn test_backend_error_keeps_context() {
        let err = anyhow::anyhow!("404 Not Found").context("Fetching dashboard");
        let rendered = TransferError::from(err).to_string();
        assert_eq!(rendered, "Fetching dashboard: 404 Not Found");
    }
}
