//! Canonical transaction produced by a CSV import

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A normalized transaction ready for the transaction store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount: expenses negative, income positive
    pub amount: Decimal,
    pub account_id: String,
    /// Raw value of the account column, when one is mapped
    pub raw_account: Option<String>,
    /// 1-based line number in the source file
    pub source_line: usize,
    /// Hash for re-import protection
    pub fingerprint: String,
}

impl NormalizedTransaction {
    pub fn new(
        date: NaiveDate,
        description: String,
        amount: Decimal,
        account_id: String,
        source_line: usize,
    ) -> Self {
        let mut tx = Self {
            date,
            description,
            amount,
            account_id,
            raw_account: None,
            source_line,
            fingerprint: String::new(),
        };
        tx.fingerprint = tx.calculate_fingerprint();
        tx
    }

    pub fn with_raw_account(mut self, raw: Option<String>) -> Self {
        self.raw_account = raw;
        self
    }

    pub fn is_expense(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Calculate fingerprint hash for deduplication
    ///
    /// Uses: date, amount (with sign, two decimals), description and account id.
    pub fn calculate_fingerprint(&self) -> String {
        // treat -0 as 0
        let amount = if self.amount.is_zero() {
            Decimal::ZERO
        } else {
            self.amount
        };

        let fingerprint_str = format!(
            "{}|{:.2}|{}|{}",
            self.date.format("%Y-%m-%d"),
            amount,
            self.description,
            self.account_id
        );

        let mut hasher = Sha256::new();
        hasher.update(fingerprint_str.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}
