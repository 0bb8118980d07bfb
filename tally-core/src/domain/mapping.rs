//! Column mapping - how CSV headers map onto the canonical transaction

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::result::ValidationErrors;

pub const DEFAULT_CREDIT_INDICATORS: &str = "C,CR,CREDIT";
pub const DEFAULT_DEBIT_INDICATORS: &str = "D,DR,DEBIT";

/// Column mapping for CSV import
///
/// Values are header names from the file the mapping was built for. The
/// mapping is never edited in place during an import; use
/// [`ColumnMapping::to_builder`] to derive an edited copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default)]
    pub date: String,
    /// Columns concatenated into the transaction description
    #[serde(default, deserialize_with = "one_or_many")]
    pub description: Vec<String>,
    /// Single signed amount column
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Credit column (split mode)
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
    /// Debit column (split mode)
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub debit: Option<String>,
    /// Indicator column whose value overrides the amount sign
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub amount_type: Option<String>,
    #[serde(default = "default_credit_indicators", deserialize_with = "token_list")]
    pub credit_indicators: String,
    #[serde(default = "default_debit_indicators", deserialize_with = "token_list")]
    pub debit_indicators: String,
    #[serde(default)]
    pub invert_amount: bool,
    /// Column whose raw value selects the target account
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Raw account string -> target account id (empty = unassigned)
    #[serde(default)]
    pub account_mapping: BTreeMap<String, String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: String::new(),
            description: Vec::new(),
            amount: None,
            credit: None,
            debit: None,
            amount_type: None,
            credit_indicators: default_credit_indicators(),
            debit_indicators: default_debit_indicators(),
            invert_amount: false,
            account: None,
            account_mapping: BTreeMap::new(),
        }
    }
}

/// How a row's amount is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountStrategy<'a> {
    /// One signed column, optionally sign-corrected by an indicator column
    Single {
        column: &'a str,
        indicator: Option<&'a str>,
    },
    /// Separate credit and debit columns
    Split {
        credit: Option<&'a str>,
        debit: Option<&'a str>,
    },
}

impl ColumnMapping {
    pub fn builder() -> ColumnMappingBuilder {
        ColumnMappingBuilder::default()
    }

    /// Start an edit session from this mapping
    pub fn to_builder(&self) -> ColumnMappingBuilder {
        ColumnMappingBuilder {
            mapping: self.clone(),
        }
    }

    /// The configured amount strategy, single-amount taking precedence
    pub fn amount_strategy(&self) -> Option<AmountStrategy<'_>> {
        if let Some(column) = self.amount.as_deref() {
            return Some(AmountStrategy::Single {
                column,
                indicator: self.amount_type.as_deref(),
            });
        }
        if self.credit.is_some() || self.debit.is_some() {
            return Some(AmountStrategy::Split {
                credit: self.credit.as_deref(),
                debit: self.debit.as_deref(),
            });
        }
        None
    }

    pub fn is_split(&self) -> bool {
        matches!(self.amount_strategy(), Some(AmountStrategy::Split { .. }))
    }

    /// Description columns with blanks dropped
    pub fn description_columns(&self) -> impl Iterator<Item = &str> {
        self.description
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    pub fn credit_tokens(&self) -> Vec<String> {
        parse_tokens(&self.credit_indicators)
    }

    pub fn debit_tokens(&self) -> Vec<String> {
        parse_tokens(&self.debit_indicators)
    }

    /// Every header name this mapping reads from
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        if !self.date.trim().is_empty() {
            columns.push(self.date.as_str());
        }
        columns.extend(self.description_columns());
        for col in [&self.amount, &self.credit, &self.debit, &self.amount_type, &self.account]
            .into_iter()
            .flatten()
        {
            columns.push(col.as_str());
        }
        columns
    }

    /// Assigned target for a raw account string, if any
    pub fn resolve_account(&self, raw: &str) -> Option<&str> {
        self.account_mapping
            .get(raw)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    /// Raw account strings still waiting for a target
    pub fn pending_accounts(&self) -> Vec<&str> {
        self.account_mapping
            .iter()
            .filter(|(_, target)| target.trim().is_empty())
            .map(|(raw, _)| raw.as_str())
            .collect()
    }

    /// Copy of this mapping with `values` added as unassigned keys
    ///
    /// Existing keys keep their targets. Returns the keys that were new.
    pub fn with_pending_accounts<S: AsRef<str>>(&self, values: &[S]) -> (Self, Vec<String>) {
        let mut merged = self.clone();
        let mut added = Vec::new();
        for value in values {
            let value = value.as_ref();
            if value.is_empty() || merged.account_mapping.contains_key(value) {
                continue;
            }
            merged.account_mapping.insert(value.to_string(), String::new());
            added.push(value.to_string());
        }
        (merged, added)
    }

    /// Check the mapping invariants, reporting into `errors`
    pub fn validate_into(&self, errors: &mut ValidationErrors) {
        if self.date.trim().is_empty() {
            errors.push("date", "a date column is required");
        }

        if self.description_columns().next().is_none() {
            errors.push("description", "at least one description column is required");
        }

        let has_amount = self.amount.as_deref().is_some_and(|a| !a.trim().is_empty());
        let has_split = [&self.credit, &self.debit]
            .into_iter()
            .flatten()
            .any(|c| !c.trim().is_empty());

        match (has_amount, has_split) {
            (true, true) => errors.push(
                "amount",
                "use either a single amount column or credit/debit columns, not both",
            ),
            (false, false) => errors.push(
                "amount",
                "select an amount column or at least one of credit/debit",
            ),
            _ => {}
        }
    }
}

/// Incremental editor for [`ColumnMapping`]
///
/// Every setter consumes and returns the builder, so an interactive session
/// threads one value through its edits and calls [`build`](Self::build) at
/// the end.
#[derive(Debug, Clone, Default)]
pub struct ColumnMappingBuilder {
    mapping: ColumnMapping,
}

impl ColumnMappingBuilder {
    pub fn date(mut self, column: impl Into<String>) -> Self {
        self.mapping.date = column.into();
        self
    }

    /// Append a description column
    pub fn description(mut self, column: impl Into<String>) -> Self {
        self.mapping.description.push(column.into());
        self
    }

    /// Replace all description columns
    pub fn descriptions<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mapping.description = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Use a single amount column, clearing any credit/debit columns
    pub fn amount(mut self, column: impl Into<String>) -> Self {
        self.mapping.amount = Some(column.into());
        self.mapping.credit = None;
        self.mapping.debit = None;
        self
    }

    /// Use credit/debit columns, clearing any single amount column
    pub fn split(mut self, credit: Option<&str>, debit: Option<&str>) -> Self {
        self.mapping.amount = None;
        self.mapping.amount_type = None;
        self.mapping.credit = credit.map(str::to_string);
        self.mapping.debit = debit.map(str::to_string);
        self
    }

    pub fn amount_type(mut self, column: impl Into<String>) -> Self {
        self.mapping.amount_type = Some(column.into());
        self
    }

    pub fn indicators(mut self, credit: impl Into<String>, debit: impl Into<String>) -> Self {
        self.mapping.credit_indicators = credit.into();
        self.mapping.debit_indicators = debit.into();
        self
    }

    pub fn invert_amount(mut self, invert: bool) -> Self {
        self.mapping.invert_amount = invert;
        self
    }

    pub fn account(mut self, column: impl Into<String>) -> Self {
        self.mapping.account = Some(column.into());
        self
    }

    /// Route a raw account string to a target account
    pub fn assign_account(mut self, raw: impl Into<String>, target: impl Into<String>) -> Self {
        self.mapping.account_mapping.insert(raw.into(), target.into());
        self
    }

    pub fn build(self) -> ColumnMapping {
        self.mapping
    }
}

fn parse_tokens(list: &str) -> Vec<String> {
    list.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn default_credit_indicators() -> String {
    DEFAULT_CREDIT_INDICATORS.to_string()
}

fn default_debit_indicators() -> String {
    DEFAULT_DEBIT_INDICATORS.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Older profiles store a single description column as a plain string
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(OneOrMany::One(s)) if s.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Indicator lists may be stored as "C,CR" or ["C", "CR"]
fn token_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: OneOrMany = OneOrMany::deserialize(deserializer)?;
    Ok(match value {
        OneOrMany::One(s) => s,
        OneOrMany::Many(v) => v.join(","),
    })
}

/// Unselected columns are persisted as ""
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_switches_amount_strategy() {
        let single = ColumnMapping::builder()
            .date("Date")
            .description("Memo")
            .amount("Amount")
            .amount_type("Type")
            .build();
        assert_eq!(
            single.amount_strategy(),
            Some(AmountStrategy::Single {
                column: "Amount",
                indicator: Some("Type")
            })
        );

        let split = single.to_builder().split(Some("Credit"), Some("Debit")).build();
        assert!(split.amount.is_none());
        assert!(split.amount_type.is_none());
        assert_eq!(
            split.amount_strategy(),
            Some(AmountStrategy::Split {
                credit: Some("Credit"),
                debit: Some("Debit")
            })
        );
        // the original value is untouched
        assert_eq!(single.amount.as_deref(), Some("Amount"));
    }

    #[test]
    fn test_indicator_tokens_are_normalized() {
        let mapping = ColumnMapping::builder()
            .indicators(" c , Haben,,", "S, soll ")
            .build();
        assert_eq!(mapping.credit_tokens(), vec!["C", "HABEN"]);
        assert_eq!(mapping.debit_tokens(), vec!["S", "SOLL"]);
    }

    #[test]
    fn test_pending_accounts_merge_keeps_assignments() {
        let mapping = ColumnMapping::builder()
            .account("IBAN")
            .assign_account("DE01", "checking")
            .build();

        let (merged, added) = mapping.with_pending_accounts(&["DE01", "DE02", "DE02", ""]);
        assert_eq!(added, vec!["DE02"]);
        assert_eq!(merged.resolve_account("DE01"), Some("checking"));
        assert_eq!(merged.resolve_account("DE02"), None);
        assert_eq!(merged.pending_accounts(), vec!["DE02"]);
    }

    #[test]
    fn test_validation_rejects_both_strategies() {
        let mut mapping = ColumnMapping::builder()
            .date("Date")
            .description("Memo")
            .amount("Amount")
            .build();
        mapping.credit = Some("Credit".to_string());

        let mut errors = ValidationErrors::new();
        mapping.validate_into(&mut errors);
        assert!(errors.has_field("amount"));
    }

    #[test]
    fn test_validation_requires_description_and_amount() {
        let mapping = ColumnMapping::builder().date("Date").description("  ").build();

        let mut errors = ValidationErrors::new();
        mapping.validate_into(&mut errors);
        assert!(errors.has_field("description"));
        assert!(errors.has_field("amount"));
        assert!(!errors.has_field("date"));
    }

    #[test]
    fn test_deserialize_ui_shape() {
        let json = r#"{
            "date": "Buchungstag",
            "amount": "",
            "credit": "Haben",
            "debit": "Soll",
            "description": "Verwendungszweck",
            "amount_type": "",
            "credit_indicators": ["H"],
            "invert_amount": false,
            "account": "",
            "account_mapping": {}
        }"#;
        let mapping: ColumnMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.description, vec!["Verwendungszweck"]);
        assert!(mapping.amount.is_none());
        assert!(mapping.account.is_none());
        assert_eq!(mapping.credit_indicators, "H");
        assert_eq!(mapping.debit_indicators, DEFAULT_DEBIT_INDICATORS);
        assert!(mapping.is_split());
    }
}
