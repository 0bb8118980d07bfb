//! Delimiter/header parser
//!
//! Splits raw CSV text into a header row and data rows. Fields are split on
//! the literal delimiter; quotes are only stripped from field boundaries and
//! never protect a delimiter inside a field.

use serde::Serialize;

use crate::domain::Delimiter;

/// One data line, cells positionally aligned to the headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// 1-based line number in the source text
    pub line: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    /// Cell at `index`, or "" when the row is short
    pub fn get(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Headers and rows of one CSV text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Physical lines in the text, blank ones included
    pub line_count: usize,
}

impl ParsedCsv {
    /// Index of the first header named exactly `column`
    pub fn column_index(&self, column: &str) -> Option<usize> {
        column_index(&self.headers, column)
    }

    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }
}

pub fn column_index(headers: &[String], column: &str) -> Option<usize> {
    headers.iter().position(|h| h == column)
}

/// Parse `text` with headers on line `header_row` (zero-based)
///
/// When `header_row` is past the end of the text, or points at a blank
/// line, both headers and rows come back empty.
pub fn parse(text: &str, delimiter: Delimiter, header_row: usize) -> ParsedCsv {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines = split_lines(text);
    let line_count = lines.len();

    let header_line = match lines.get(header_row) {
        Some(line) if !line.trim().is_empty() => *line,
        _ => {
            tracing::debug!(header_row, line_count, "Header row not found");
            return ParsedCsv {
                line_count,
                ..ParsedCsv::default()
            };
        }
    };

    let headers = split_fields(header_line, delimiter);
    let rows: Vec<RawRow> = lines
        .iter()
        .enumerate()
        .skip(header_row + 1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| RawRow {
            line: idx + 1,
            cells: split_fields(line, delimiter),
        })
        .collect();

    tracing::debug!(
        columns = headers.len(),
        rows = rows.len(),
        line_count,
        "Parsed CSV text"
    );

    ParsedCsv {
        headers,
        rows,
        line_count,
    }
}

/// Split on `\r\n`, `\r` and `\n`; a trailing terminator adds no empty line
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                i += 1;
                if bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }

    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Guess the delimiter from the header line
///
/// Picks the candidate occurring most often on line `header_row`; ties go
/// to the earlier entry of [`Delimiter::ALL`], and a line with none of them
/// gives the default comma.
pub fn sniff_delimiter(text: &str, header_row: usize) -> Delimiter {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(line) = split_lines(text).into_iter().nth(header_row) else {
        return Delimiter::default();
    };

    let mut best = Delimiter::default();
    let mut best_count = 0;
    for delimiter in Delimiter::ALL {
        let count = line.matches(delimiter.as_char()).count();
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }
    best
}

pub fn split_fields(line: &str, delimiter: Delimiter) -> Vec<String> {
    line.split(delimiter.as_char()).map(clean_cell).collect()
}

/// Trim and drop one surrounding quote on each side
pub fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    let cell = cell.strip_prefix('"').unwrap_or(cell);
    let cell = cell.strip_suffix('"').unwrap_or(cell);
    cell.trim().to_string()
}
