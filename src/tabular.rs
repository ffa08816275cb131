//! Tabular parser - delimited property table to keyed records
//!
//! Header row + data rows. Double quotes toggle "inside quoted field" so a
//! delimiter inside quotes stays part of the field.

use std::collections::HashMap;
use thiserror::Error;

/// Column holding the account identifier in the property table
pub const ACCOUNT_COLUMN: &str = "ACCOUNTNO";

/// A parsed row: header name -> trimmed field value
pub type Row = HashMap<String, String>;

/// A data row whose field count differs from the header's
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: expected {expected} fields, found {found}")]
pub struct RowMismatch {
    pub line: usize,
    pub expected: usize,
    pub found: usize,
}

/// Parse result: rows keyed by account plus what was left out
#[derive(Debug, Default)]
pub struct ParseReport {
    pub rows: HashMap<String, Row>,
    pub skipped: Vec<RowMismatch>,
    /// Rows without an account value
    pub dropped: usize,
}

/// Split a single line into trimmed fields, honoring double quotes
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            // "" inside a quoted field is a literal quote
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Parse delimited text into rows keyed by `ACCOUNTNO`
///
/// Mismatched rows are skipped and reported; rows without an account are
/// dropped. A repeated account overwrites the earlier row.
pub fn parse(text: &str, delimiter: char) -> ParseReport {
    let mut report = ParseReport::default();
    // Excel/Access exports lead with a byte-order mark
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    // Keep 1-based line numbers for reporting, skip blank lines
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    let header = match lines.next() {
        Some((_, line)) => split_fields(line, delimiter),
        None => {
            tracing::warn!("Tabular source is empty");
            return report;
        }
    };
    tracing::debug!("Tabular header: {} columns", header.len());

    if !header.iter().any(|h| h == ACCOUNT_COLUMN) {
        tracing::warn!("Tabular header has no {} column, no records will be keyed", ACCOUNT_COLUMN);
    }

    for (line_no, line) in lines {
        let fields = split_fields(line, delimiter);
        if fields.len() != header.len() {
            let mismatch = RowMismatch {
                line: line_no,
                expected: header.len(),
                found: fields.len(),
            };
            tracing::warn!("Skipping row: {}", mismatch);
            report.skipped.push(mismatch);
            continue;
        }

        let row: Row = header.iter().cloned().zip(fields).collect();
        let account = row.get(ACCOUNT_COLUMN).cloned().unwrap_or_default();
        if account.is_empty() {
            report.dropped += 1;
            continue;
        }
        report.rows.insert(account, row);
    }

    tracing::info!(
        "Parsed {} tabular records ({} skipped, {} without account)",
        report.rows.len(),
        report.skipped.len(),
        report.dropped
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_quoted() {
        let fields = split_fields(r#"1, "SMITH, JOHN" ,x"#, ',');
        assert_eq!(fields, vec!["1", "SMITH, JOHN", "x"]);
    }

    #[test]
    fn test_split_escaped_quote() {
        let fields = split_fields(r#""a ""b"" c",d"#, ',');
        assert_eq!(fields, vec![r#"a "b" c"#, "d"]);
    }

    #[test]
    fn test_split_trailing_empty() {
        assert_eq!(split_fields("a,b,", ','), vec!["a", "b", ""]);
    }

    #[test]
    fn test_parse_keyed() {
        let text = "ACCOUNTNO,SITUS,AYB\r\n123,\"1 MAIN ST, UNIT 2\",1999\r\n\r\n456,2 OAK AVE,2005\r\n";
        let report = parse(text, ',');
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows["123"]["SITUS"], "1 MAIN ST, UNIT 2");
        assert_eq!(report.rows["456"]["AYB"], "2005");
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_mismatched_row_skipped() {
        let text = "ACCOUNTNO,EXT CONDITION,SumOfACTUALVALUE\n\
                    1,Good,100\n\
                    2,Fair,200,extra\n\
                    3,Poor,300\n";
        let report = parse(text, ',');
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.contains_key("1"));
        assert!(report.rows.contains_key("3"));
        assert!(!report.rows.contains_key("2"));
        assert_eq!(
            report.skipped,
            vec![RowMismatch { line: 3, expected: 3, found: 4 }]
        );
        for row in report.rows.values() {
            assert_eq!(row.len(), 3);
        }
    }

    #[test]
    fn test_missing_account_dropped() {
        let text = "ACCOUNTNO,SITUS\n,1 MAIN ST\n  ,2 MAIN ST\n7,3 MAIN ST\n";
        let report = parse(text, ',');
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.dropped, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let text = "ACCOUNTNO,SITUS\n9,OLD\n9,NEW\n";
        let report = parse(text, ',');
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows["9"]["SITUS"], "NEW");
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let text = "\u{feff}ACCOUNTNO,EXT CONDITION,SumOfACTUALVALUE\n123,Good,350000\n";
        let report = parse(text, ',');
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows["123"]["EXT CONDITION"], "Good");
        assert!(report.rows["123"].contains_key(ACCOUNT_COLUMN));
    }

    #[test]
    fn test_empty_and_custom_delimiter() {
        assert!(parse("", ',').rows.is_empty());
        let report = parse("ACCOUNTNO|SITUS\n5|\"A|B\"\n", '|');
        assert_eq!(report.rows["5"]["SITUS"], "A|B");
    }
}
