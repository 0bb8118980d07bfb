//! Import report - everything an import run hands back to the caller

use serde::Serialize;

use super::transaction::NormalizedTransaction;

/// Non-fatal conditions observed during an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    /// The header row index points past the end of the file (or at a blank line)
    HeaderRowOutOfRange { header_row: usize, line_count: usize },
    /// A mapped column is not present in the file's headers
    MissingColumn { column: String },
    /// A raw account string has no assigned target; its rows used the default account
    UnresolvedAccountMapping { raw_value: String, rows: usize },
}

/// A data row that produced no transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line number in the source file
    pub line: usize,
    pub reason: String,
}

/// Result of normalizing one CSV file with one profile
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub profile: String,
    pub headers: Vec<String>,
    /// Transactions in source row order
    pub transactions: Vec<NormalizedTransaction>,
    pub skipped: Vec<SkippedRow>,
    pub warnings: Vec<ImportWarning>,
    /// Account strings seen in the file that the profile has no key for yet
    pub discovered_accounts: Vec<String>,
}

impl ImportReport {
    pub fn header_row_out_of_range(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ImportWarning::HeaderRowOutOfRange { .. }))
    }

    /// Raw account strings that fell back to the default account
    pub fn unresolved_accounts(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ImportWarning::UnresolvedAccountMapping { raw_value, .. } => Some(raw_value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Keep only the first `limit` transactions
    pub fn truncate(&mut self, limit: usize) {
        self.transactions.truncate(limit);
    }
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportWarning::HeaderRowOutOfRange { header_row, line_count } => write!(
                f,
                "header row {} is out of range (file has {} lines)",
                header_row, line_count
            ),
            ImportWarning::MissingColumn { column } => {
                write!(f, "column '{}' not found in headers", column)
            }
            ImportWarning::UnresolvedAccountMapping { raw_value, rows } => write!(
                f,
                "account '{}' has no target ({} rows used the default account)",
                raw_value, rows
            ),
        }
    }
}
