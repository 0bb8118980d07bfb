//! Row normalization
//!
//! Applies a validated profile to every data row of a file and produces the
//! import report. This is a pure function of (profile, text, default
//! account): the profile is never edited, discovered account strings are
//! only reported.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::amount::{column_value, row_amount};
use super::inference::discover_account_values;
use super::parser::{self, RawRow};
use crate::domain::{
    ImportReport, ImportWarning, MapperProfile, NormalizedTransaction, Result, SkippedRow,
};

/// Tried in order when the profile's own format does not match
///
/// Two-digit-year variants come before their `%Y` twins, which would
/// otherwise read "24" as the year 24.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d.%m.%y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%Y.%m.%d",
    "%Y%m%d",
];

/// Parses landing before this year came from a short year token
const MIN_YEAR: i32 = 1000;

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DESCRIPTION_SEPARATOR: &str = " | ";

/// Parse a date cell with `format`, then with the common fallbacks
///
/// A trailing time part is tolerated: when the whole cell does not parse,
/// its first whitespace-separated token is tried as well.
pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let first_token = raw.split_whitespace().next().unwrap_or(raw);
    let mut candidates = vec![raw];
    if first_token != raw {
        candidates.push(first_token);
    }

    for value in &candidates {
        if let Some(date) = parse_with(value, format) {
            return Some(date);
        }
    }

    for value in &candidates {
        for fmt in FALLBACK_DATE_FORMATS.iter().chain(FALLBACK_DATETIME_FORMATS) {
            if let Some(date) = parse_with(value, fmt) {
                return Some(date);
            }
        }
    }

    None
}

/// `value` as a date or date-time in `format`, rejecting implausible years
fn parse_with(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(|dt| dt.date())
        })
        .filter(|date| date.year() >= MIN_YEAR)
}

/// Non-empty description cells joined with " | "
pub fn join_description<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(DESCRIPTION_SEPARATOR)
}

/// Normalize `text` with `profile`
///
/// Fails only when the profile is invalid; every data problem ends up as a
/// warning or a skipped row in the report.
pub fn run(profile: &MapperProfile, text: &str, default_account: &str) -> Result<ImportReport> {
    profile.validate()?;

    let mapping = &profile.column_mapping;
    let parsed = parser::parse(text, profile.delimiter, profile.header_row);

    let mut report = ImportReport {
        profile: profile.name.clone(),
        headers: parsed.headers.clone(),
        ..ImportReport::default()
    };

    if !parsed.has_headers() {
        tracing::warn!(
            profile = %profile.name,
            header_row = profile.header_row,
            line_count = parsed.line_count,
            "Header row out of range"
        );
        report.warnings.push(ImportWarning::HeaderRowOutOfRange {
            header_row: profile.header_row,
            line_count: parsed.line_count,
        });
        return Ok(report);
    }

    let mut reported = HashSet::new();
    for column in mapping.referenced_columns() {
        if parsed.column_index(column).is_none() && reported.insert(column) {
            report.warnings.push(ImportWarning::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    let date_format = profile.effective_date_format();
    let description_columns: Vec<&str> = mapping.description_columns().collect();
    let mut unresolved: BTreeMap<String, usize> = BTreeMap::new();

    for row in &parsed.rows {
        let raw_date = column_value(row, &parsed.headers, Some(mapping.date.as_str()));
        let Some(date) = parse_date(raw_date, date_format) else {
            let reason = if raw_date.is_empty() {
                "missing date".to_string()
            } else {
                format!("unparseable date '{}'", raw_date)
            };
            report.skipped.push(SkippedRow {
                line: row.line,
                reason,
            });
            continue;
        };

        let description = join_description(
            description_columns
                .iter()
                .map(|c| column_value(row, &parsed.headers, Some(*c))),
        );
        let amount = row_amount(row, &parsed.headers, mapping);
        let (account_id, raw_account) =
            resolve_account(row, &parsed.headers, profile, default_account, &mut unresolved);

        report.transactions.push(
            NormalizedTransaction::new(date, description, amount, account_id, row.line)
                .with_raw_account(raw_account),
        );
    }

    for (raw_value, rows) in unresolved {
        report
            .warnings
            .push(ImportWarning::UnresolvedAccountMapping { raw_value, rows });
    }

    if let Some(column) = mapping.account.as_deref() {
        let values = discover_account_values(&parsed, column);
        let (_, added) = mapping.with_pending_accounts(&values);
        report.discovered_accounts = added;
    }

    if !report.skipped.is_empty() {
        tracing::warn!(
            profile = %profile.name,
            skipped = report.skipped.len(),
            "Rows skipped during import"
        );
    }
    tracing::debug!(
        profile = %profile.name,
        transactions = report.transactions.len(),
        warnings = report.warnings.len(),
        discovered = report.discovered_accounts.len(),
        "Normalized CSV"
    );

    Ok(report)
}

fn resolve_account(
    row: &RawRow,
    headers: &[String],
    profile: &MapperProfile,
    default_account: &str,
    unresolved: &mut BTreeMap<String, usize>,
) -> (String, Option<String>) {
    let mapping = &profile.column_mapping;
    let Some(column) = mapping.account.as_deref() else {
        return (default_account.to_string(), None);
    };

    let raw = column_value(row, headers, Some(column));
    if raw.is_empty() {
        return (default_account.to_string(), None);
    }

    match mapping.resolve_account(raw) {
        Some(target) => (target.to_string(), Some(raw.to_string())),
        None => {
            *unresolved.entry(raw.to_string()).or_default() += 1;
            (default_account.to_string(), Some(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnMapping, Delimiter};
    use rust_decimal::Decimal;

    fn simple_profile() -> MapperProfile {
        MapperProfile::new(
            "simple",
            ColumnMapping::builder()
                .date("Date")
                .description("Memo")
                .amount("Amount")
                .build(),
        )
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("15.01.2024", "%d.%m.%Y"), expected);
        assert_eq!(parse_date("2024-01-15", "%d.%m.%Y"), expected);
        assert_eq!(parse_date("15.01.2024 10:30", "%d.%m.%Y"), expected);
        assert_eq!(parse_date("2024-01-15 08:00:00", "%Y-%m-%d %H:%M:%S"), expected);
        assert_eq!(parse_date("2024-01-15T08:00:00", "%Y-%m-%d"), expected);
        assert_eq!(parse_date("not a date", "%Y-%m-%d"), None);
        assert_eq!(parse_date("", "%Y-%m-%d"), None);
    }

    #[test]
    fn test_two_digit_years() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("15.01.24", "%Y-%m-%d"), expected);
        assert_eq!(parse_date("15/01/24", "%Y-%m-%d"), expected);
        assert_eq!(parse_date("15-01-24", "%Y-%m-%d"), expected);
        // a four-digit format on a short year falls through to the fallbacks
        assert_eq!(parse_date("15.01.24", "%d.%m.%Y"), expected);
        assert_eq!(parse_date("15.01.24 10:30", "%d.%m.%Y"), expected);
        // four-digit years still take the %Y variant
        assert_eq!(parse_date("15.01.2024", "%Y-%m-%d"), expected);
    }

    #[test]
    fn test_configured_format_wins_over_fallbacks() {
        // 02/03 is ambiguous; the profile decides
        assert_eq!(
            parse_date("02/03/2024", "%m/%d/%Y"),
            NaiveDate::from_ymd_opt(2024, 2, 3)
        );
        assert_eq!(
            parse_date("02/03/2024", "%d/%m/%Y"),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[test]
    fn test_join_description() {
        assert_eq!(join_description(["A ", "", " B"]), "A | B");
        assert_eq!(join_description(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_run_basic() {
        let text = "Date,Amount,Memo\n2024-01-15,-42.50,COFFEE SHOP\n";
        let report = run(&simple_profile(), text, "checking").unwrap();
        assert_eq!(report.transactions.len(), 1);
        let tx = &report.transactions[0];
        assert_eq!(tx.amount, Decimal::new(-4250, 2));
        assert_eq!(tx.description, "COFFEE SHOP");
        assert_eq!(tx.account_id, "checking");
        assert_eq!(tx.source_line, 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_invalid_profile_is_rejected_before_processing() {
        let profile = MapperProfile::new("", ColumnMapping::default());
        let err = run(&profile, "Date\n2024-01-01\n", "x").unwrap_err();
        let fields = err.validation_errors().unwrap();
        assert!(fields.has_field("name"));
        assert!(fields.has_field("date"));
        assert!(fields.has_field("amount"));
    }

    #[test]
    fn test_bad_dates_are_skipped_with_line_numbers() {
        let text = "Date,Amount,Memo\n2024-01-15,1,a\nyesterday,2,b\n,3,c\n2024-01-16,4,d\n";
        let report = run(&simple_profile(), text, "x").unwrap();
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].line, 3);
        assert!(report.skipped[0].reason.contains("yesterday"));
        assert_eq!(report.skipped[1].reason, "missing date");
        // source order preserved
        assert_eq!(report.transactions[1].source_line, 5);
    }

    #[test]
    fn test_header_row_out_of_range_warns() {
        let profile = simple_profile().with_header_row(10);
        let report = run(&profile, "Date,Amount,Memo\n2024-01-15,1,a\n", "x").unwrap();
        assert!(report.header_row_out_of_range());
        assert!(report.headers.is_empty());
        assert!(report.transactions.is_empty());
    }

    #[test]
    fn test_missing_columns_are_reported() {
        let mapping = ColumnMapping::builder()
            .date("Date")
            .descriptions(["Memo", "Note"])
            .amount("Amount")
            .build();
        let profile = MapperProfile::new("p", mapping);
        let report = run(&profile, "Date,Amount,Memo\n2024-01-15,1,a\n", "x").unwrap();
        assert_eq!(
            report.warnings,
            vec![ImportWarning::MissingColumn {
                column: "Note".to_string()
            }]
        );
        assert_eq!(report.transactions[0].description, "a");
    }

    #[test]
    fn test_account_routing_and_discovery() {
        let mapping = ColumnMapping::builder()
            .date("Datum")
            .description("Text")
            .amount("Betrag")
            .account("Konto")
            .assign_account("DE01", "giro")
            .assign_account("DE02", "")
            .build();
        let profile = MapperProfile::new("multi", mapping)
            .with_delimiter(Delimiter::Semicolon)
            .with_date_format("%d.%m.%Y");
        let text = "Datum;Konto;Betrag;Text\n\
                    01.02.2024;DE01;-1,00;a\n\
                    02.02.2024;DE02;-2,00;b\n\
                    03.02.2024;DE03;-3,00;c\n\
                    04.02.2024;DE03;-4,00;d\n\
                    05.02.2024;;-5,00;e\n";

        let report = run(&profile, text, "fallback").unwrap();
        let accounts: Vec<&str> = report
            .transactions
            .iter()
            .map(|t| t.account_id.as_str())
            .collect();
        assert_eq!(accounts, vec!["giro", "fallback", "fallback", "fallback", "fallback"]);
        assert_eq!(report.transactions[2].raw_account.as_deref(), Some("DE03"));
        assert_eq!(report.transactions[4].raw_account, None);
        assert_eq!(report.discovered_accounts, vec!["DE03"]);
        assert_eq!(report.unresolved_accounts(), vec!["DE02", "DE03"]);
        assert!(report.warnings.contains(&ImportWarning::UnresolvedAccountMapping {
            raw_value: "DE03".to_string(),
            rows: 2
        }));
        // the profile itself is untouched
        assert!(!profile.column_mapping.account_mapping.contains_key("DE03"));
    }

    #[test]
    fn test_run_is_deterministic() {
        let text = "Date,Amount,Memo\n2024-01-15,1.234.567,x\n2024-01-16,(3.00),y\n";
        let first = run(&simple_profile(), text, "a").unwrap();
        let second = run(&simple_profile(), text, "a").unwrap();
        assert_eq!(first.transactions, second.transactions);
        assert_eq!(first.transactions[0].amount, Decimal::new(1234567, 0));
        assert_eq!(first.transactions[1].amount, Decimal::new(-300, 2));
    }
}
