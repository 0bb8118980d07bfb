//! Transaction export for the external transaction store

use std::io::Write;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{NormalizedTransaction, Result};

/// Flat CSV record of one transaction
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    date: String,
    description: &'a str,
    amount: Decimal,
    account_id: &'a str,
    raw_account: Option<&'a str>,
    source_line: usize,
    fingerprint: &'a str,
}

impl<'a> From<&'a NormalizedTransaction> for ExportRecord<'a> {
    fn from(tx: &'a NormalizedTransaction) -> Self {
        Self {
            date: tx.date.format("%Y-%m-%d").to_string(),
            description: &tx.description,
            amount: tx.amount,
            account_id: &tx.account_id,
            raw_account: tx.raw_account.as_deref(),
            source_line: tx.source_line,
            fingerprint: &tx.fingerprint,
        }
    }
}

/// Write `transactions` as CSV with a header row
pub fn write_csv<W: Write>(transactions: &[NormalizedTransaction], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for tx in transactions {
        csv_writer.serialize(ExportRecord::from(tx))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_json(transactions: &[NormalizedTransaction]) -> Result<String> {
    Ok(serde_json::to_string_pretty(transactions)?)
}
