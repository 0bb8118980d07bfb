//! Import service - CSV normalization against saved profiles

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use super::profile::ProfileService;
use crate::domain::{Delimiter, ImportReport, MapperProfile};
use crate::pipeline::{self, InferredColumns, RawRow};
use crate::ports::ConfigStore;

/// Sample rows returned by [`ImportService::detect`]
const DETECT_SAMPLE_ROWS: usize = 5;

/// Options for inspecting an unknown file
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Sniffed from the header line when `None`
    pub delimiter: Option<Delimiter>,
    pub header_row: usize,
    /// Column whose distinct values should be listed
    pub account_column: Option<String>,
}

/// What the pipeline can tell about a file before a profile exists
#[derive(Debug, Clone, Serialize)]
pub struct DetectResult {
    pub delimiter: Delimiter,
    pub header_row: usize,
    pub line_count: usize,
    pub headers: Vec<String>,
    pub inferred: InferredColumns,
    pub sample_rows: Vec<RawRow>,
    pub account_values: Vec<String>,
}

/// Import service for CSV imports
pub struct ImportService {
    store: Arc<dyn ConfigStore>,
    profiles: ProfileService,
}

impl ImportService {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            profiles: ProfileService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Normalize `text` with `profile`
    ///
    /// Pure: nothing is read from or written to the store.
    pub fn run(&self, profile: &MapperProfile, text: &str, default_account: &str) -> Result<ImportReport> {
        Ok(pipeline::run(profile, text, default_account)?)
    }

    /// Inspect `text` and guess a mapping for it
    pub fn detect(&self, text: &str, options: &DetectOptions) -> DetectResult {
        let delimiter = options
            .delimiter
            .unwrap_or_else(|| pipeline::sniff_delimiter(text, options.header_row));
        let parsed = pipeline::parse(text, delimiter, options.header_row);
        let inferred = pipeline::infer_columns(&parsed.headers, &parsed.rows);
        let account_values = options
            .account_column
            .as_deref()
            .map(|column| pipeline::discover_account_values(&parsed, column))
            .unwrap_or_default();

        DetectResult {
            delimiter,
            header_row: options.header_row,
            line_count: parsed.line_count,
            headers: parsed.headers,
            inferred,
            sample_rows: parsed.rows.into_iter().take(DETECT_SAMPLE_ROWS).collect(),
            account_values,
        }
    }

    /// Import `path` with the stored profile `profile_name`
    ///
    /// `default_account` falls back to the configured default. With
    /// `persist_accounts`, newly seen account strings are merged into the
    /// stored profile as unassigned keys.
    pub fn import_file(
        &self,
        path: &Path,
        profile_name: &str,
        default_account: Option<&str>,
        persist_accounts: bool,
    ) -> Result<ImportReport> {
        let (profile, default_account) = self.resolve(profile_name, default_account)?;
        let text = read_text(path)?;

        let report = self
            .run(&profile, &text, &default_account)
            .with_context(|| format!("Import with profile '{}' failed", profile_name))?;

        if persist_accounts && !report.discovered_accounts.is_empty() {
            let added = self
                .profiles
                .merge_account_keys(profile_name, &report.discovered_accounts)?;
            tracing::info!(profile = %profile_name, added = added.len(), "Persisted account keys");
        }

        tracing::info!(
            profile = %profile_name,
            transactions = report.transactions.len(),
            skipped = report.skipped.len(),
            warnings = report.warnings.len(),
            "Import complete"
        );
        Ok(report)
    }

    /// Like [`import_file`](Self::import_file) but keeps only the first
    /// `limit` transactions and never writes to the store
    pub fn preview(
        &self,
        path: &Path,
        profile_name: &str,
        default_account: Option<&str>,
        limit: usize,
    ) -> Result<ImportReport> {
        let mut report = self.import_file(path, profile_name, default_account, false)?;
        report.truncate(limit);
        Ok(report)
    }

    fn resolve(&self, profile_name: &str, default_account: Option<&str>) -> Result<(MapperProfile, String)> {
        let config = self.store.load()?;
        let profile = self.profiles.get(profile_name)?;
        let default_account = default_account
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| config.effective_default_account());
        Ok((profile, default_account))
    }
}

/// Read a CSV file as text; invalid UTF-8 is replaced rather than rejected
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), "File is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}
