//! Column inference
//!
//! Guesses which headers hold the date, amount and description of a bank
//! export so a new mapping can be pre-filled. Inference never fails; an
//! unresolved column is simply `None`.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::amount::clean_amount;
use super::parser::{ParsedCsv, RawRow};
use crate::domain::ColumnMapping;

const DESCRIPTION_KEYWORDS: &[&str] = &["description", "text", "comment", "memo"];
const AMOUNT_SYNONYMS: &[&str] = &["betrag", "buchung", "value"];
const MAX_AMOUNT_LEN: usize = 15;

fn date_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{1,4}[./-]\d{1,2}[./-]\d{1,4}(?:\s+\d{1,2}:\d{2}(?::\d{2})?)?$")
            .expect("valid date regex")
    })
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").expect("valid integer regex"))
}

fn amount_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(?:[.,]\d{1,2})?$").expect("valid amount regex"))
}

/// Best-effort column guesses for one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InferredColumns {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub description: Vec<String>,
}

impl InferredColumns {
    pub fn is_complete(&self) -> bool {
        self.date.is_some() && self.amount.is_some() && !self.description.is_empty()
    }

    /// Fill the unset fields of `mapping` with the guesses
    ///
    /// Columns the user already chose are left alone, and a guessed amount
    /// column is not applied over a credit/debit split.
    pub fn apply_to(&self, mapping: &ColumnMapping) -> ColumnMapping {
        let mut builder = mapping.to_builder();

        if mapping.date.trim().is_empty() {
            if let Some(date) = &self.date {
                builder = builder.date(date.clone());
            }
        }
        if mapping.description_columns().next().is_none() && !self.description.is_empty() {
            builder = builder.descriptions(self.description.iter().cloned());
        }
        if mapping.amount_strategy().is_none() {
            if let Some(amount) = &self.amount {
                builder = builder.amount(amount.clone());
            }
        }

        builder.build()
    }

    pub fn into_mapping(self) -> ColumnMapping {
        self.apply_to(&ColumnMapping::default())
    }
}

/// Guess date, amount and description columns
///
/// Header names are tried first. If date or amount is still unknown the
/// first sample row is inspected cell by cell.
pub fn infer_columns(headers: &[String], sample_rows: &[RawRow]) -> InferredColumns {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let mut date = lowered
        .iter()
        .position(|h| h.contains("date"))
        .map(|idx| headers[idx].clone());

    let description: Vec<String> = lowered
        .iter()
        .zip(headers)
        .filter(|(h, _)| DESCRIPTION_KEYWORDS.iter().any(|k| h.contains(k)))
        .map(|(_, original)| original.clone())
        .collect();

    let mut amount = lowered
        .iter()
        .position(|h| h.contains("amount") || AMOUNT_SYNONYMS.contains(&h.as_str()))
        .map(|idx| headers[idx].clone());

    if date.is_none() || amount.is_none() {
        if let Some(first) = sample_rows.first() {
            for (idx, cell) in first.cells.iter().enumerate().take(headers.len()) {
                let cell = cell.trim();
                if date.is_none() && looks_like_date(cell) {
                    date = Some(headers[idx].clone());
                } else if amount.is_none() && looks_like_amount(cell) {
                    amount = Some(headers[idx].clone());
                }
            }
        }
    }

    let inferred = InferredColumns {
        date,
        amount,
        description,
    };
    tracing::debug!(
        date = ?inferred.date,
        amount = ?inferred.amount,
        description = ?inferred.description,
        "Inferred columns"
    );
    inferred
}

/// Distinct non-empty values of `column` in first-seen order
pub fn discover_account_values(parsed: &ParsedCsv, column: &str) -> Vec<String> {
    let Some(idx) = parsed.column_index(column) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in &parsed.rows {
        let value = row.get(idx);
        if !value.is_empty() && seen.insert(value) {
            values.push(value.to_string());
        }
    }
    values
}

fn looks_like_date(cell: &str) -> bool {
    date_value_re().is_match(cell) && !integer_re().is_match(cell)
}

fn looks_like_amount(cell: &str) -> bool {
    cell.len() <= MAX_AMOUNT_LEN && amount_value_re().is_match(cell) && !clean_amount(cell).is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Delimiter;
    use crate::pipeline::parser::parse;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(cells: &[&str]) -> RawRow {
        RawRow {
            line: 2,
            cells: cells.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_infer_from_headers() {
        let h = headers(&["Date", "Amount", "Memo"]);
        let inferred = infer_columns(&h, &[row(&["2024-01-15", "-42.50", "COFFEE SHOP"])]);
        assert_eq!(inferred.date.as_deref(), Some("Date"));
        assert_eq!(inferred.amount.as_deref(), Some("Amount"));
        assert_eq!(inferred.description, vec!["Memo"]);
        assert!(inferred.is_complete());
    }

    #[test]
    fn test_locale_synonyms_and_multiple_descriptions() {
        let h = headers(&["Booking Date", "Betrag", "Buchungstext", "Kommentar", "Comment"]);
        let inferred = infer_columns(&h, &[]);
        assert_eq!(inferred.date.as_deref(), Some("Booking Date"));
        assert_eq!(inferred.amount.as_deref(), Some("Betrag"));
        assert_eq!(inferred.description, vec!["Buchungstext", "Comment"]);
    }

    #[test]
    fn test_fallback_uses_first_row() {
        let h = headers(&["Col1", "Col2", "Col3", "Col4"]);
        let rows = [
            row(&["12345", "15.01.2024 10:30", "0,00", "-4,50"]),
            row(&["1", "16.01.2024", "7", "8"]),
        ];
        let inferred = infer_columns(&h, &rows);
        assert_eq!(inferred.date.as_deref(), Some("Col2"));
        // zero is never an amount candidate, and a pure integer is no date
        assert_eq!(inferred.amount.as_deref(), Some("Col1"));
    }

    #[test]
    fn test_fallback_ignores_cells_past_headers() {
        let h = headers(&["Name"]);
        let inferred = infer_columns(&h, &[row(&["shop", "2024-01-01", "12.00"])]);
        assert!(inferred.date.is_none());
        assert!(inferred.amount.is_none());
        assert!(!inferred.is_complete());
    }

    #[test]
    fn test_empty_input_never_fails() {
        let inferred = infer_columns(&[], &[]);
        assert_eq!(inferred, InferredColumns::default());
        assert_eq!(inferred.into_mapping(), ColumnMapping::default());
    }

    #[test]
    fn test_inference_is_deterministic() {
        let h = headers(&["x", "y", "Text"]);
        let rows = [row(&["2024/01/02", "12,34", "a"])];
        let first = infer_columns(&h, &rows);
        assert_eq!(infer_columns(&h, &rows), first);
    }

    #[test]
    fn test_apply_keeps_user_choices() {
        let inferred = InferredColumns {
            date: Some("Date".to_string()),
            amount: Some("Amount".to_string()),
            description: vec!["Memo".to_string()],
        };
        let split = ColumnMapping::builder()
            .date("Valuta")
            .split(Some("Haben"), Some("Soll"))
            .build();

        let applied = inferred.apply_to(&split);
        assert_eq!(applied.date, "Valuta");
        assert_eq!(applied.description, vec!["Memo"]);
        assert!(applied.amount.is_none());
        assert!(applied.is_split());

        let fresh = inferred.into_mapping();
        assert_eq!(fresh.amount.as_deref(), Some("Amount"));
    }

    #[test]
    fn test_discover_account_values() {
        let text = "Date,Account,Amount\n\
                    2024-01-01, \"DE01\" ,1\n\
                    2024-01-02,DE02,2\n\
                    2024-01-03,,3\n\
                    2024-01-04,DE01,4\n";
        let parsed = parse(text, Delimiter::Comma, 0);
        assert_eq!(discover_account_values(&parsed, "Account"), vec!["DE01", "DE02"]);
        assert!(discover_account_values(&parsed, "Missing").is_empty());
    }
}
