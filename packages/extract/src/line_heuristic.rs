//! Delimiter-based table extraction from PDF text.
//!
//! The PDF's text is extracted as plain lines. The first non-blank line is
//! the header, every line is split on a delimiter, and only rows with as
//! many cells as the header are kept. With [`Delimiter::Auto`] lines are
//! split on runs of two or more whitespace characters, which matches how
//! most space-aligned tables come out of text extraction.

use pdf2xlsx_table_models::{Delimiter, RawTable, StrategyKind};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{ExtractError, ExtractedTable, Extraction, TableMetadata, guard_pdf};

/// Pattern used by [`Delimiter::Auto`].
const WHITESPACE_RUN: &str = r"\s{2,}";

/// Settings for the line-heuristic strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineHeuristicConfig {
    /// How to split each line into cells.
    pub delimiter: Delimiter,
}

/// Splits lines into untrimmed cells for a given [`Delimiter`].
#[derive(Debug, Clone)]
pub enum Splitter {
    /// Split on a regex (auto-detect).
    Pattern(Regex),
    /// Split on a literal separator.
    Literal(&'static str),
}

impl Splitter {
    /// Builds the splitter for `delimiter`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Regex`] if the auto-detect pattern fails to
    /// compile.
    pub fn new(delimiter: Delimiter) -> Result<Self, ExtractError> {
        Ok(match delimiter.separator() {
            Some(separator) => Self::Literal(separator),
            None => Self::Pattern(Regex::new(WHITESPACE_RUN)?),
        })
    }

    /// Splits `line` into untrimmed cells.
    #[must_use]
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Self::Pattern(re) => re.split(line).collect(),
            Self::Literal(separator) => line.split(*separator).collect(),
        }
    }
}

/// Parses a table out of extracted text.
///
/// Blank header cells are discarded, every cell is trimmed, and rows whose
/// width differs from the header's are excluded. Data rows identical to
/// the header (a header repeated at the top of each page) are skipped.
///
/// # Errors
///
/// Returns [`ExtractError::NoTableFound`] if there are fewer than two
/// non-blank lines or no row matches the header width.
pub fn parse_text(text: &str, delimiter: Delimiter) -> Result<ExtractedTable, ExtractError> {
    let splitter = Splitter::new(delimiter)?;
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(ExtractError::no_table(format!(
            "found {} non-blank line(s); need a header and at least one row",
            lines.len()
        )));
    }

    let header: Vec<String> = splitter
        .split(lines[0])
        .into_iter()
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    let mut dropped_rows = 0;

    for line in &lines[1..] {
        let cells: Vec<String> = splitter
            .split(line)
            .into_iter()
            .map(|cell| cell.trim().to_owned())
            .collect();

        if cells.len() != header.len() {
            dropped_rows += 1;
            continue;
        }
        if cells == header {
            log::debug!("Skipping repeated header line");
            continue;
        }
        rows.push(cells);
    }

    if rows.is_empty() {
        return Err(ExtractError::no_table(format!(
            "no row has {} cell(s) like the header when split with {} delimiter",
            header.len(),
            delimiter.label()
        )));
    }

    log::debug!(
        "Parsed {} row(s) x {} column(s) ({dropped_rows} row(s) did not match the header)",
        rows.len(),
        header.len()
    );

    Ok(ExtractedTable {
        table: RawTable::new(header, rows),
        metadata: TableMetadata {
            strategy: StrategyKind::LineHeuristic,
            page: None,
            dropped_rows,
        },
    })
}

/// Extracts the text of a PDF and parses it with [`parse_text`].
///
/// # Errors
///
/// Returns [`ExtractError::Extraction`] if the PDF cannot be read or
/// contains no text, and [`ExtractError::NoTableFound`] if no table
/// structure is found.
pub fn extract(bytes: &[u8], config: &LineHeuristicConfig) -> Result<Extraction, ExtractError> {
    let text = guard_pdf("failed to extract text from PDF", || {
        pdf_extract::extract_text_from_mem(bytes)
    })?;

    log::debug!("Extracted {} characters of text", text.len());

    if text.trim().is_empty() {
        return Err(ExtractError::Extraction(
            "no text could be extracted; the PDF might be image-based or encrypted".to_owned(),
        ));
    }

    let table = parse_text(&text, config.delimiter)?;
    let mut warnings = Vec::new();
    if table.metadata.dropped_rows > 0 {
        warnings.push(format!(
            "Excluded {} line(s) that did not match the header width",
            table.metadata.dropped_rows
        ));
    }

    Ok(Extraction {
        tables: vec![table],
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_detect_splits_on_whitespace_runs() {
        let text = "Name  Age  City\nAlice  30  Paris\nBob  25  Rome\n";
        let extracted = parse_text(text, Delimiter::Auto).unwrap();

        assert_eq!(extracted.table.columns, vec!["Name", "Age", "City"]);
        assert_eq!(
            extracted.table.rows,
            vec![vec!["Alice", "30", "Paris"], vec!["Bob", "25", "Rome"]]
        );
        assert_eq!(extracted.metadata.strategy, StrategyKind::LineHeuristic);
    }

    #[test]
    fn auto_detect_keeps_single_spaces_inside_cells() {
        let text = "City      Country\nNew York  United States\n";
        let extracted = parse_text(text, Delimiter::Auto).unwrap();
        assert_eq!(extracted.table.rows, vec![vec!["New York", "United States"]]);
    }

    #[test]
    fn mismatched_rows_are_excluded() {
        let text = "date|type|address\n01/15/2024|THEFT|100 Main St\nPage 1 of 2\n02/20/2024|ASSAULT\n";
        let extracted = parse_text(text, Delimiter::Pipe).unwrap();

        assert_eq!(extracted.table.len(), 1);
        assert_eq!(extracted.table.rows[0], vec!["01/15/2024", "THEFT", "100 Main St"]);
        assert_eq!(extracted.metadata.dropped_rows, 2);
    }

    #[test]
    fn repeated_page_headers_are_skipped() {
        let text = "A;B\n1;2\nA;B\n3;4\n";
        let extracted = parse_text(text, Delimiter::Semicolon).unwrap();
        assert_eq!(extracted.table.rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn blank_header_cells_are_discarded() {
        let text = "Name,,Age\nAlice,30\n";
        let extracted = parse_text(text, Delimiter::Comma).unwrap();
        assert_eq!(extracted.table.columns, vec!["Name", "Age"]);
        assert_eq!(extracted.table.rows, vec![vec!["Alice", "30"]]);
    }

    #[test]
    fn too_few_lines_is_no_table() {
        let err = parse_text("\n   \nJust a title\n", Delimiter::Auto).unwrap_err();
        assert!(matches!(err, ExtractError::NoTableFound { .. }), "{err}");
    }

    #[test]
    fn no_matching_row_is_no_table() {
        let err = parse_text("A,B,C\n1,2\n3\n", Delimiter::Comma).unwrap_err();
        assert!(matches!(err, ExtractError::NoTableFound { .. }), "{err}");
    }

    #[test]
    fn explicit_delimiters_split_and_rejoin_to_the_original_line() {
        let line = "alpha, beta ;gamma|delta\tepsilon  zeta";
        for delimiter in Delimiter::ALL {
            let Some(separator) = delimiter.separator() else {
                continue;
            };
            let cells = Splitter::new(*delimiter).unwrap().split(line);
            assert_eq!(cells.join(separator), line, "{delimiter}");
        }
    }
}
