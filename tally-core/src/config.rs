//! Configuration management
//!
//! Everything lives in one settings.json inside the tally directory:
//! ```json
//! {
//!   "profiles": { "Checking": { "name": "Checking", "column_mapping": { ... } } },
//!   "rules": [ { "pattern": "coffee", "priority": 0, "target": { ... } } ],
//!   "categories": [ { "id": 1, "name": "Food", "parent_id": null } ],
//!   "defaultAccount": "checking"
//! }
//! ```
//! Keys this crate does not manage are kept as-is when saving.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{Category, Error, MapperProfile, Result, Rule};

pub const SETTINGS_FILE: &str = "settings.json";

/// Account used when neither settings nor the environment name one
pub const FALLBACK_ACCOUNT: &str = "default";

/// Overrides `defaultAccount` from settings.json
pub const DEFAULT_ACCOUNT_ENV: &str = "TALLY_DEFAULT_ACCOUNT";

/// Tally configuration (settings.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub profiles: BTreeMap<String, MapperProfile>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account: Option<String>,
    // settings owned by other tools
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

impl Config {
    pub fn settings_path(tally_dir: &Path) -> PathBuf {
        tally_dir.join(SETTINGS_FILE)
    }

    /// Load config from the tally directory
    ///
    /// A missing file gives the defaults. So does a file that does not parse;
    /// the problem is logged, and saving stays blocked until it is fixed
    /// (see [`load_strict`](Self::load_strict)).
    pub fn load(tally_dir: &Path) -> Result<Self> {
        match Self::load_strict(tally_dir) {
            Err(Error::Config(message)) => {
                tracing::warn!(error = %message, "Unreadable settings, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Load config for a read-modify-write
    ///
    /// Unlike [`load`](Self::load), a settings.json that exists but does not
    /// parse is an `Error::Config`, so nothing gets saved over it.
    pub fn load_strict(tally_dir: &Path) -> Result<Self> {
        let path = Self::settings_path(tally_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str::<Config>(&content).map_err(|e| {
            Error::config(format!(
                "{} is unreadable ({}); fix or move it before saving",
                path.display(),
                e
            ))
        })
    }

    /// Save config to the tally directory
    ///
    /// Writes to a temporary file first so a crash never leaves a
    /// truncated settings.json behind.
    pub fn save(&self, tally_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(tally_dir)?;
        let path = Self::settings_path(tally_dir);
        let tmp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Default account for rows without a resolved account
    ///
    /// `TALLY_DEFAULT_ACCOUNT` wins over settings.json.
    pub fn effective_default_account(&self) -> String {
        std::env::var(DEFAULT_ACCOUNT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.default_account.clone().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| FALLBACK_ACCOUNT.to_string())
    }

    /// Unmanaged top-level keys, preserved on save
    pub fn other(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.other
    }
}
