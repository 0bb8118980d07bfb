//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod category;
mod mapping;
mod profile;
mod report;
mod rule;
mod transaction;
pub mod result;

pub use category::{Category, CategoryTree};
pub use mapping::{
    AmountStrategy, ColumnMapping, ColumnMappingBuilder, DEFAULT_CREDIT_INDICATORS,
    DEFAULT_DEBIT_INDICATORS,
};
pub use result::{Error, FieldError, Result, ValidationErrors};
pub use profile::{Delimiter, MapperProfile, DEFAULT_DATE_FORMAT};
pub use report::{ImportReport, ImportWarning, SkippedRow};
pub use rule::{Categorization, FailedRule, MatchKind, MatchSource, Rule, RuleSet, RuleTarget};
pub use transaction::NormalizedTransaction;
