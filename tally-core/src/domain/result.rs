//! Result and error types for the core library

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid mapping configuration: {0}")]
    InvalidMappingConfiguration(ValidationErrors),

    #[error("Invalid rule pattern '{pattern}': {message}")]
    InvalidRule { pattern: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Field-level validation failures, if this is a mapping configuration error
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::InvalidMappingConfiguration(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected field of a mapper profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field-level problem found while validating a mapper profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// True if any error is reported against `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was reported, otherwise the matching error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidMappingConfiguration(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_errors_display_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push("name", "must not be empty");
        errors.push("date", "must not be empty");

        let err = errors.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid mapping configuration"));
        assert!(msg.contains("name: must not be empty"));
        assert!(msg.contains("date: must not be empty"));

        let fields = err.validation_errors().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.has_field("date"));
        assert!(!fields.has_field("amount"));
    }
}
