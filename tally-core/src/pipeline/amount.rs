//! Amount normalizer
//!
//! Bank exports disagree on separators, negative notation and sign
//! conventions. Everything here is lenient: a value that cannot be read is
//! zero, never an error.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::parser::{column_index, RawRow};
use crate::domain::{AmountStrategy, ColumnMapping};

/// Parse a raw amount string into a signed decimal
///
/// Handles `1.234,56`, `1,234.56`, `(42.50)`, currency symbols and stray
/// whitespace. Anything unreadable is zero.
pub fn clean_amount(raw: &str) -> Decimal {
    let mut s: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '(' | ')' | '+'))
        .collect();

    if s.is_empty() {
        return Decimal::ZERO;
    }

    // (100.00) -> -100.00
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        s = format!("-{}", &s[1..s.len() - 1]);
    }

    let has_comma = s.contains(',');
    let has_dot = s.contains('.');

    if has_comma && has_dot {
        // the later separator is the decimal point
        if s.rfind(',') > s.rfind('.') {
            s = s.replace('.', "").replace(',', ".");
        } else {
            s = s.replace(',', "");
        }
    } else if has_comma {
        let mut parts = s.split(',');
        let single_comma = s.matches(',').count() == 1;
        let cents = parts.nth(1).map(str::len) == Some(2);
        if single_comma && cents {
            s = s.replace(',', ".");
        } else {
            s = s.replace(',', "");
        }
    } else if has_dot && s.matches('.').count() > 1 {
        // 1.000.000
        s = s.replace('.', "");
    }

    parse_decimal(&s)
        .or_else(|| {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '.'))
                .collect();
            parse_decimal(&digits)
        })
        .map(normalize_zero)
        .unwrap_or(Decimal::ZERO)
}

/// Signed amount of one row under `mapping`
pub fn row_amount(row: &RawRow, headers: &[String], mapping: &ColumnMapping) -> Decimal {
    let amount = match mapping.amount_strategy() {
        Some(AmountStrategy::Single { column, indicator }) => {
            let amount = clean_amount(column_value(row, headers, Some(column)));
            match indicator {
                Some(indicator) => apply_indicator(
                    amount,
                    column_value(row, headers, Some(indicator)),
                    mapping,
                ),
                None => amount,
            }
        }
        Some(AmountStrategy::Split { credit, debit }) => {
            let credit = clean_amount(column_value(row, headers, credit)).abs();
            let debit = clean_amount(column_value(row, headers, debit)).abs();
            credit - debit
        }
        None => Decimal::ZERO,
    };

    let amount = if mapping.invert_amount { -amount } else { amount };
    normalize_zero(amount)
}

/// Force the sign of `amount` from an indicator cell such as "C" or "DR"
pub fn apply_indicator(amount: Decimal, indicator: &str, mapping: &ColumnMapping) -> Decimal {
    let indicator = indicator.trim().to_uppercase();
    if indicator.is_empty() {
        return amount;
    }
    if mapping.debit_tokens().contains(&indicator) {
        -amount.abs()
    } else if mapping.credit_tokens().contains(&indicator) {
        amount.abs()
    } else {
        amount
    }
}

/// Value of the first header named `column`, or "" when unmapped or absent
pub fn column_value<'a>(row: &'a RawRow, headers: &[String], column: Option<&str>) -> &'a str {
    column
        .and_then(|c| column_index(headers, c))
        .map(|idx| row.get(idx))
        .unwrap_or("")
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.strip_prefix('+').unwrap_or(s)),
    };
    let digits = digits.strip_suffix('.').unwrap_or(digits);
    if digits.is_empty() || !digits.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = if digits.starts_with('.') {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };
    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    Decimal::from_str(&format!("{}{}", sign, digits)).ok()
}

fn normalize_zero(amount: Decimal) -> Decimal {
    if amount.is_zero() {
        Decimal::ZERO
    } else {
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

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
    fn test_clean_amount_separators() {
        assert_eq!(clean_amount("1.234,56"), dec(123456, 2));
        assert_eq!(clean_amount("1,234.56"), dec(123456, 2));
        assert_eq!(clean_amount("42,50"), dec(4250, 2));
        assert_eq!(clean_amount("1,234"), dec(1234, 0));
        assert_eq!(clean_amount("1,234,567"), dec(1234567, 0));
        assert_eq!(clean_amount("1.000.000"), dec(1000000, 0));
        assert_eq!(clean_amount("12.5"), dec(125, 1));
    }

    #[test]
    fn test_clean_amount_signs_and_symbols() {
        assert_eq!(clean_amount("(42.50)"), dec(-4250, 2));
        assert_eq!(clean_amount("-€ 1.234,56"), dec(-123456, 2));
        assert_eq!(clean_amount("$1,000.00"), dec(100000, 2));
        assert_eq!(clean_amount("+15.00"), dec(1500, 2));
        assert_eq!(clean_amount(" -.5 "), dec(-5, 1));
    }

    #[test]
    fn test_clean_amount_never_fails() {
        assert_eq!(clean_amount(""), Decimal::ZERO);
        assert_eq!(clean_amount("abc"), Decimal::ZERO);
        assert_eq!(clean_amount("-"), Decimal::ZERO);
        assert_eq!(clean_amount("()"), Decimal::ZERO);
        assert_eq!(clean_amount("-0.00"), Decimal::ZERO);
        assert!(!clean_amount("-0.00").is_sign_negative());
        // retried with only digits, '-' and '.'
        assert_eq!(clean_amount("(12"), dec(12, 0));
    }

    #[test]
    fn test_split_mode() {
        let h = headers(&["Date", "Credit", "Debit"]);
        let mapping = ColumnMapping::builder()
            .date("Date")
            .description("Date")
            .split(Some("Credit"), Some("Debit"))
            .build();

        assert_eq!(row_amount(&row(&["x", "100.00", ""]), &h, &mapping), dec(10000, 2));
        assert_eq!(row_amount(&row(&["x", "", "25.00"]), &h, &mapping), dec(-2500, 2));
        // signs in the source are ignored
        assert_eq!(row_amount(&row(&["x", "-10", "-4"]), &h, &mapping), dec(6, 0));
        // short row
        assert_eq!(row_amount(&row(&["x", "7"]), &h, &mapping), dec(7, 0));

        let inverted = mapping.to_builder().invert_amount(true).build();
        assert_eq!(row_amount(&row(&["x", "", "25.00"]), &h, &inverted), dec(2500, 2));
    }

    #[test]
    fn test_debit_only_split_mapping() {
        let h = headers(&["Date", "Withdrawal"]);
        let mapping = ColumnMapping::builder().split(None, Some("Withdrawal")).build();
        assert_eq!(row_amount(&row(&["x", "9.99"]), &h, &mapping), dec(-999, 2));
    }

    #[test]
    fn test_indicator_overrides_sign() {
        let h = headers(&["Amount", "DC"]);
        let mapping = ColumnMapping::builder()
            .amount("Amount")
            .amount_type("DC")
            .build();

        assert_eq!(row_amount(&row(&["42.50", "D"]), &h, &mapping), dec(-4250, 2));
        assert_eq!(row_amount(&row(&["-42.50", " dr "]), &h, &mapping), dec(-4250, 2));
        assert_eq!(row_amount(&row(&["-42.50", "credit"]), &h, &mapping), dec(4250, 2));
        assert_eq!(row_amount(&row(&["-42.50", "X"]), &h, &mapping), dec(-4250, 2));
        assert_eq!(row_amount(&row(&["-42.50", ""]), &h, &mapping), dec(-4250, 2));
    }

    #[test]
    fn test_debit_indicator_is_never_positive() {
        let h = headers(&["Amount", "DC"]);
        let mapping = ColumnMapping::builder()
            .amount("Amount")
            .amount_type("DC")
            .build();
        for raw in ["10", "-10", "(10)", "0", "abc", "1.234,56"] {
            let amount = row_amount(&row(&[raw, "D"]), &h, &mapping);
            assert!(amount <= Decimal::ZERO, "{} gave {}", raw, amount);
        }
    }

    #[test]
    fn test_missing_amount_column_is_zero() {
        let h = headers(&["Date"]);
        let mapping = ColumnMapping::builder().amount("Amount").build();
        assert_eq!(row_amount(&row(&["2024-01-01"]), &h, &mapping), Decimal::ZERO);
    }

    #[test]
    fn test_row_amount_is_repeatable() {
        let h = headers(&["Amount"]);
        let mapping = ColumnMapping::builder().amount("Amount").invert_amount(true).build();
        let r = row(&["1.234,56"]);
        let first = row_amount(&r, &h, &mapping);
        for _ in 0..3 {
            assert_eq!(row_amount(&r, &h, &mapping), first);
        }
        assert_eq!(first, dec(-123456, 2));
    }
}
