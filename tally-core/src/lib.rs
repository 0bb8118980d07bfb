//! Tally Core - CSV mapping and amount normalization for bank exports
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Core entities (ColumnMapping, MapperProfile, Rule, etc.)
//! - **pipeline**: Pure CSV parsing, column inference and normalization
//! - **ports**: Trait definitions for external dependencies (ConfigStore)
//! - **services**: Use-case orchestration
//! - **adapters**: Concrete implementations (settings.json, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod export;
pub mod pipeline;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::FileConfigStore;
use ports::ConfigStore;
use services::{ImportService, ProfileService, RuleService};

// Re-export commonly used types at crate root
pub use config::Config;
pub use domain::{
    ColumnMapping, Delimiter, Error, ImportReport, ImportWarning, MapperProfile,
    NormalizedTransaction, Result, Rule, RuleSet, RuleTarget, ValidationErrors,
};
pub use services::{EntryPoint, LogEntry, LogEvent, LoggingService};

/// Main context for Tally operations
///
/// Holds the config store and every service built on it.
pub struct TallyContext {
    pub store: Arc<dyn ConfigStore>,
    pub import_service: ImportService,
    pub profile_service: ProfileService,
    pub rule_service: RuleService,
}

impl TallyContext {
    /// Context backed by `<tally_dir>/settings.json`
    pub fn new(tally_dir: &Path) -> Self {
        Self::with_store(Arc::new(FileConfigStore::new(tally_dir)))
    }

    pub fn with_store(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            import_service: ImportService::new(Arc::clone(&store)),
            profile_service: ProfileService::new(Arc::clone(&store)),
            rule_service: RuleService::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn config(&self) -> Result<Config> {
        self.store.load()
    }
}
