//! CSV import pipeline
//!
//! Pure functions from raw text and a profile to normalized transactions:
//! parse, infer, compute amounts, normalize rows. Nothing here touches the
//! file system or the settings store.

pub mod amount;
pub mod inference;
pub mod normalize;
pub mod parser;

pub use amount::{clean_amount, row_amount};
pub use inference::{discover_account_values, infer_columns, InferredColumns};
pub use normalize::{join_description, parse_date, run};
pub use parser::{parse, sniff_delimiter, ParsedCsv, RawRow};
