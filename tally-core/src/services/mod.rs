//! Service layer - business logic orchestration
//!
//! Services coordinate the pipeline and the config store. Each service
//! focuses on a specific use case or feature area.

pub mod import;
pub mod logging;
mod profile;
mod rules;

pub use import::{DetectOptions, DetectResult, ImportService};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use profile::{ProfileImportSummary, ProfileService};
pub use rules::{CategorizeResult, CategorizedTransaction, RuleService};
