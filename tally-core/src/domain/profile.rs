//! Mapper profile - a saved description of one bank's CSV export format

use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use super::mapping::ColumnMapping;
use super::result::{Error, Result, ValidationErrors};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Field separator of a CSV export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
            Delimiter::Tab => "tab",
            Delimiter::Pipe => "pipe",
        }
    }
}

impl FromStr for Delimiter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "," | "comma" => Ok(Delimiter::Comma),
            ";" | "semicolon" => Ok(Delimiter::Semicolon),
            "\t" | "\\t" | "tab" => Ok(Delimiter::Tab),
            "|" | "pipe" => Ok(Delimiter::Pipe),
            other => Err(Error::config(format!(
                "unsupported delimiter '{}' (expected , ; tab or |)",
                other.escape_debug()
            ))),
        }
    }
}

impl TryFrom<String> for Delimiter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Delimiter> for String {
    fn from(value: Delimiter) -> Self {
        value.as_char().to_string()
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, persisted CSV mapping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperProfile {
    pub name: String,
    #[serde(default)]
    pub column_mapping: ColumnMapping,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub delimiter: Delimiter,
    /// Zero-based line index of the header row
    #[serde(default)]
    pub header_row: usize,
}

impl MapperProfile {
    pub fn new(name: impl Into<String>, column_mapping: ColumnMapping) -> Self {
        Self {
            name: name.into(),
            column_mapping,
            date_format: default_date_format(),
            delimiter: Delimiter::default(),
            header_row: 0,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    /// Date format to parse with, falling back to ISO when unset
    pub fn effective_date_format(&self) -> &str {
        let fmt = self.date_format.trim();
        if fmt.is_empty() {
            DEFAULT_DATE_FORMAT
        } else {
            fmt
        }
    }

    /// Check every invariant required before the profile may be saved or
    /// used for an import
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.push("name", "a mapper name is required");
        }

        self.column_mapping.validate_into(&mut errors);

        if StrftimeItems::new(self.effective_date_format()).any(|item| matches!(item, Item::Error)) {
            errors.push(
                "date_format",
                format!("'{}' is not a valid date format", self.date_format),
            );
        }

        errors.into_result()
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}
